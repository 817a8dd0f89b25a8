//! Backtest runner: wires config, market loading, strategy and engine
//! together and derives the metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads the market file named by the config (or an override). Used by the CLI.
//! - `run_with_market()`: takes pre-loaded market data, no I/O.

use std::path::Path;

use optlab_core::domain::MarketData;
use optlab_core::engine::{Backtester, BacktestReport, ConfigurationError, EngineError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_market, LoadError};
use crate::metrics::PerformanceMetrics;
use crate::strategies::build_strategy;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("backtest failed: {0}")]
    Engine(#[from] EngineError),
    #[error("no market file given: set [market] path in the config or pass one explicitly")]
    NoMarketFile,
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub strategy: String,
    pub config: BacktestConfig,
    /// BLAKE3 of the market file, when the data came from disk.
    #[serde(default)]
    pub dataset_hash: Option<String>,
    pub metrics: PerformanceMetrics,
    pub report: BacktestReport,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load the market file and run. `market_path` overrides `[market] path`.
pub fn run_single_backtest(
    config: &BacktestConfig,
    market_path: Option<&Path>,
) -> Result<RunResult, RunError> {
    let path = market_path
        .or(config.market.path.as_deref())
        .ok_or(RunError::NoMarketFile)?;
    let range = (config.backtest.start_date, config.backtest.end_date);
    let loaded = load_market(path, Some(range))?;
    run_with_market(config, loaded.market, Some(loaded.dataset_hash))
}

/// Run a backtest on pre-loaded market data.
pub fn run_with_market(
    config: &BacktestConfig,
    market: MarketData,
    dataset_hash: Option<String>,
) -> Result<RunResult, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let mut strategy = build_strategy(&config.strategy);
    let strategy_name = strategy.name().to_string();

    info!(run_id = %run_id, strategy = %strategy_name, "starting run");
    let mut backtester = Backtester::new(config.backtest.clone(), market)?;
    let report = backtester.backtest(strategy.as_mut())?;
    let metrics = PerformanceMetrics::from_report(&report);
    info!(
        run_id = %run_id,
        trades = metrics.trade_count,
        final_value = report.final_value().unwrap_or(report.starting_balance),
        "run complete"
    );

    Ok(RunResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        strategy: strategy_name,
        config: config.clone(),
        dataset_hash,
        metrics,
        report,
    })
}
