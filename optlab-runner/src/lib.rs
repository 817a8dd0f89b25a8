//! OptLab Runner: backtest orchestration on top of `optlab-core`.
//!
//! This crate provides:
//! - TOML run configuration with a content-addressed run id
//! - Market JSON loading
//! - Built-in strategies (buy-and-hold, option selling)
//! - Performance metrics
//! - JSON / CSV / Markdown export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod strategies;

pub use config::{BacktestConfig, ConfigError, MarketConfig, RunId, StrategyConfig};
pub use data_loader::{load_market, parse_market, LoadError, LoadedMarket};
pub use metrics::PerformanceMetrics;
pub use runner::{run_single_backtest, run_with_market, RunError, RunResult, SCHEMA_VERSION};
pub use strategies::{build_strategy, BuyAndHold, SellOption};
