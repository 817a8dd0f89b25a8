//! The calendar of valid trading dates for a run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::TradingCalendar;
use crate::domain::MarketData;

/// Why a business day was left out of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DataUnavailable {
    #[error("no market snapshot")]
    MissingSnapshot,

    #[error("no usable close price for {symbol}")]
    MissingPrice { symbol: String },

    #[error("no volatility surface for {symbol}")]
    MissingSurface { symbol: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnprocessedDate {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub reason: DataUnavailable,
}

/// Valid, holiday and unprocessed dates of `[start, end]`.
///
/// The three sets are disjoint and each is in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateGrid {
    valid_dates: Vec<NaiveDate>,
    holidays: Vec<NaiveDate>,
    unprocessed: Vec<UnprocessedDate>,
}

impl DateGrid {
    pub fn build(
        start: NaiveDate,
        end: NaiveDate,
        calendar: &dyn TradingCalendar,
        market: &MarketData,
        universe: &[String],
        vol_universe: &[String],
    ) -> Self {
        let mut grid = DateGrid::default();
        for date in start.iter_days().take_while(|d| *d <= end) {
            if calendar.is_holiday(date) {
                grid.holidays.push(date);
                continue;
            }
            match check_availability(market, date, universe, vol_universe) {
                Ok(()) => grid.valid_dates.push(date),
                Err(reason) => grid.unprocessed.push(UnprocessedDate { date, reason }),
            }
        }
        grid
    }

    pub fn valid_dates(&self) -> &[NaiveDate] {
        &self.valid_dates
    }

    pub fn holidays(&self) -> &[NaiveDate] {
        &self.holidays
    }

    pub fn unprocessed_dates(&self) -> &[UnprocessedDate] {
        &self.unprocessed
    }

    pub fn is_empty(&self) -> bool {
        self.valid_dates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.valid_dates.len()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.valid_dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.valid_dates.last().copied()
    }

    pub fn is_valid(&self, date: NaiveDate) -> bool {
        self.valid_dates.binary_search(&date).is_ok()
    }
}

fn check_availability(
    market: &MarketData,
    date: NaiveDate,
    universe: &[String],
    vol_universe: &[String],
) -> Result<(), DataUnavailable> {
    let snapshot = market.get(date).ok_or(DataUnavailable::MissingSnapshot)?;
    if let Some(symbol) = universe.iter().find(|s| snapshot.close(s).is_none()) {
        return Err(DataUnavailable::MissingPrice { symbol: symbol.clone() });
    }
    if let Some(symbol) = vol_universe.iter().find(|s| snapshot.surface(s).is_none()) {
        return Err(DataUnavailable::MissingSurface { symbol: symbol.clone() });
    }
    Ok(())
}
