//! Engine error taxonomy.
//!
//! Only [`ConfigurationError`] aborts a run. Data gaps, valuation failures and
//! margin rejections are recorded in the report and the date loop goes on.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{AssetKind, IdError, TradeId, ValuationError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("no valid dates between {start} and {end}")]
    NoValidDates { start: NaiveDate, end: NaiveDate },

    #[error("universe is empty")]
    EmptyUniverse,

    #[error("{field} must be positive and finite, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("short haircut must lie in [0, 1], got {0}")]
    InvalidHaircut(f64),

    #[error("unsupported asset kind: {0}")]
    UnsupportedAssetKind(AssetKind),

    #[error("option trade on {symbol} is missing its {field}")]
    MissingOptionTerms { symbol: String, field: &'static str },

    #[error("{symbol} is not in the {universe}")]
    UnknownSymbol { symbol: String, universe: &'static str },

    #[error("option on {symbol} expires {expiry}, not after trade date {date}")]
    ExpiryNotAfterTrade {
        symbol: String,
        expiry: NaiveDate,
        date: NaiveDate,
    },

    #[error(transparent)]
    Ids(#[from] IdError),
}

/// Error type of the engine and of strategy callbacks.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("valuation failed: {0}")]
    Valuation(#[from] ValuationError),

    #[error("no market snapshot for {0}")]
    MissingSnapshot(NaiveDate),

    #[error("unknown trade id {0}")]
    UnknownTrade(TradeId),

    #[error("strategy error: {0}")]
    Strategy(String),
}

impl EngineError {
    /// Whether the error must abort the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Configuration(_))
    }
}
