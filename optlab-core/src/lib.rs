//! optlab core: daily backtesting of equity and European option strategies.
//!
//! This crate contains:
//! - Domain types (market snapshots, instruments, positions, portfolio)
//! - Option valuation (volatility surface interpolation, Black-Scholes-Merton)
//! - Trading calendars
//! - The date-driven engine with margin-constrained trade admission

pub mod calendar;
pub mod domain;
pub mod engine;
pub mod pricing;

pub use engine::{Backtester, BacktestReport, EngineConfig, EngineError, Strategy, TradingContext};
