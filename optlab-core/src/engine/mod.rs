//! Backtesting engine: date grid, margin ledger, trade admission and the
//! per-date loop that drives a [`Strategy`].

pub mod backtester;
pub mod config;
pub mod date_grid;
pub mod error;
pub mod margin;
pub mod report;
pub mod state;
pub mod strategy;

pub use backtester::Backtester;
pub use config::EngineConfig;
pub use date_grid::{DataUnavailable, DateGrid, UnprocessedDate};
pub use error::{ConfigurationError, EngineError};
pub use margin::{required_commitment, MarginLedger, MarginShortfall};
pub use report::{
    period_pnl, trade_log, BacktestReport, DateFailure, Diagnostics, LiquidationFallback,
    PeriodPnl, RejectedTrade,
};
pub use state::{Admission, EngineState, TradeRequest};
pub use strategy::{Strategy, TradingContext};
