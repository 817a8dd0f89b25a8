//! Engine configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ConfigurationError;
use crate::calendar::CalendarKind;

fn default_leverage() -> f64 {
    1.0
}

fn default_short_haircut() -> f64 {
    0.2
}

/// Everything a run needs besides market data and a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Symbols whose close price must be present on every valid date.
    pub universe: Vec<String>,
    /// Symbols whose volatility surface must be present on every valid date.
    /// Options may only be traded on these.
    #[serde(default)]
    pub vol_universe: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub starting_balance: f64,
    /// Multiplier on the margin balance when checking a trade.
    #[serde(default = "default_leverage")]
    pub leverage: f64,
    /// Fraction of entry notional committed for short positions.
    #[serde(default = "default_short_haircut")]
    pub short_haircut: f64,
    #[serde(default)]
    pub calendar: CalendarKind,
}

impl EngineConfig {
    pub fn new<S: Into<String>>(
        universe: impl IntoIterator<Item = S>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        starting_balance: f64,
    ) -> Self {
        Self {
            universe: universe.into_iter().map(Into::into).collect(),
            vol_universe: Vec::new(),
            start_date,
            end_date,
            starting_balance,
            leverage: default_leverage(),
            short_haircut: default_short_haircut(),
            calendar: CalendarKind::default(),
        }
    }

    pub fn with_vol_universe<S: Into<String>>(mut self, symbols: impl IntoIterator<Item = S>) -> Self {
        self.vol_universe = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_leverage(mut self, leverage: f64) -> Self {
        self.leverage = leverage;
        self
    }

    pub fn with_short_haircut(mut self, haircut: f64) -> Self {
        self.short_haircut = haircut;
        self
    }

    pub fn with_calendar(mut self, calendar: CalendarKind) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn in_universe(&self, symbol: &str) -> bool {
        self.universe.iter().any(|s| s == symbol)
    }

    pub fn in_vol_universe(&self, symbol: &str) -> bool {
        self.vol_universe.iter().any(|s| s == symbol)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.start_date > self.end_date {
            return Err(ConfigurationError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.universe.is_empty() {
            return Err(ConfigurationError::EmptyUniverse);
        }
        for (field, value) in [
            ("starting balance", self.starting_balance),
            ("leverage", self.leverage),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigurationError::NotPositive { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.short_haircut) {
            return Err(ConfigurationError::InvalidHaircut(self.short_haircut));
        }
        if let Some(symbol) = self.vol_universe.iter().find(|s| !self.in_universe(s)) {
            return Err(ConfigurationError::UnknownSymbol {
                symbol: symbol.clone(),
                universe: "universe",
            });
        }
        Ok(())
    }
}
