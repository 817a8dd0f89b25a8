//! Trading calendars used to drop holidays from the date grid.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Answers whether a date is a business day.
pub trait TradingCalendar: Send + Sync {
    fn name(&self) -> &str;

    fn is_business_day(&self, date: NaiveDate) -> bool;

    fn is_holiday(&self, date: NaiveDate) -> bool {
        !self.is_business_day(date)
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Every weekday is a business day.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekendCalendar;

impl TradingCalendar for WeekendCalendar {
    fn name(&self) -> &str {
        "weekends-only"
    }

    fn is_business_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date)
    }
}

/// TARGET (Trans-European Automated Real-time Gross settlement Express
/// Transfer) calendar.
///
/// Holidays: weekends, New Year's Day, Christmas, and 31 December in 1998,
/// 1999 and 2001. From 2000 on also Good Friday, Easter Monday, Labour Day
/// (1 May) and 26 December.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetCalendar;

impl TradingCalendar for TargetCalendar {
    fn name(&self) -> &str {
        "TARGET"
    }

    fn is_business_day(&self, date: NaiveDate) -> bool {
        if is_weekend(date) {
            return false;
        }
        let (y, m, d) = (date.year(), date.month(), date.day());
        let fixed = matches!((m, d), (1, 1) | (12, 25))
            || (m == 12 && d == 31 && matches!(y, 1998 | 1999 | 2001));
        if fixed {
            return false;
        }
        if y < 2000 {
            return true;
        }
        if matches!((m, d), (5, 1) | (12, 26)) {
            return false;
        }
        match easter_sunday(y) {
            Some(easter) => {
                let offset = (date - easter).num_days();
                offset != -2 && offset != 1
            }
            None => true,
        }
    }
}

/// Named calendar choice, as it appears in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarKind {
    #[default]
    Target,
    Weekends,
}

impl CalendarKind {
    pub fn build(self) -> Box<dyn TradingCalendar> {
        match self {
            CalendarKind::Target => Box::new(TargetCalendar),
            CalendarKind::Weekends => Box::new(WeekendCalendar),
        }
    }
}

/// Gregorian Easter Sunday (anonymous Gregorian algorithm).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn easter_dates() {
        assert_eq!(easter_sunday(2024), Some(d(2024, 3, 31)));
        assert_eq!(easter_sunday(2019), Some(d(2019, 4, 21)));
        assert_eq!(easter_sunday(2000), Some(d(2000, 4, 23)));
    }

    #[test]
    fn target_holidays_2024() {
        let cal = TargetCalendar;
        assert!(cal.is_holiday(d(2024, 1, 1)));
        assert!(cal.is_holiday(d(2024, 3, 29))); // Good Friday
        assert!(cal.is_holiday(d(2024, 4, 1))); // Easter Monday
        assert!(cal.is_holiday(d(2024, 5, 1)));
        assert!(cal.is_holiday(d(2024, 12, 25)));
        assert!(cal.is_holiday(d(2024, 12, 26)));
        assert!(cal.is_holiday(d(2024, 1, 6))); // Saturday
        assert!(cal.is_business_day(d(2024, 1, 2)));
        assert!(cal.is_business_day(d(2024, 12, 31)));
    }

    #[test]
    fn target_new_years_eve_closures() {
        let cal = TargetCalendar;
        assert!(cal.is_holiday(d(1999, 12, 31)));
        assert!(cal.is_holiday(d(2001, 12, 31)));
        assert!(cal.is_business_day(d(2002, 12, 31)));
    }

    #[test]
    fn target_easter_labour_day_and_boxing_day_start_in_2000() {
        let cal = TargetCalendar;
        // 1999: Good Friday 2 Apr, Easter Monday 5 Apr
        assert!(cal.is_business_day(d(1999, 4, 2)));
        assert!(cal.is_business_day(d(1999, 4, 5)));
        assert!(cal.is_business_day(d(1998, 5, 1)));
        assert!(cal.is_business_day(d(1997, 12, 26)));
        assert!(cal.is_holiday(d(1998, 12, 25)));
        assert!(cal.is_holiday(d(1999, 1, 1)));

        // 2000: Good Friday 21 Apr, Easter Monday 24 Apr
        assert!(cal.is_holiday(d(2000, 4, 21)));
        assert!(cal.is_holiday(d(2000, 4, 24)));
        assert!(cal.is_holiday(d(2000, 5, 1)));
        assert!(cal.is_holiday(d(2000, 12, 26)));
    }

    #[test]
    fn weekend_calendar() {
        let cal = WeekendCalendar;
        assert!(cal.is_business_day(d(2024, 1, 1)));
        assert!(cal.is_holiday(d(2024, 1, 7)));
    }

    #[test]
    fn calendar_kind_builds_named_calendar() {
        assert_eq!(CalendarKind::default().build().name(), "TARGET");
        assert_eq!(CalendarKind::Weekends.build().name(), "weekends-only");
    }
}
