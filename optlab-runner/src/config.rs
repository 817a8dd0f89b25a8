//! Serializable backtest configuration, loaded from TOML.
//!
//! ```toml
//! [backtest]
//! universe = ["XYZ"]
//! vol_universe = ["XYZ"]
//! start_date = "2024-01-02"
//! end_date = "2024-03-28"
//! starting_balance = 100000.0
//!
//! [market]
//! path = "market.json"
//!
//! [strategy]
//! type = "sell_option"
//! symbol = "XYZ"
//! quantity = 10.0
//! strike = 95.0
//! expiry = "2024-02-16"
//! kind = "put"
//! ```

use chrono::NaiveDate;
use optlab_core::domain::OptionKind;
use optlab_core::engine::{ConfigurationError, EngineConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid engine settings: {0}")]
    Engine(#[from] ConfigurationError),

    #[error("invalid strategy settings: {0}")]
    Strategy(String),

    #[error("failed to fingerprint config: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Where the market JSON lives. Relative paths resolve against the config
/// file's directory when loaded through [`BacktestConfig::from_file`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Built-in strategy selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Buy once on the first date, optionally close on `exit_date`.
    BuyAndHold {
        symbol: String,
        quantity: f64,
        #[serde(default)]
        exit_date: Option<NaiveDate>,
    },

    /// Write one option on the first date and hold it to expiry.
    SellOption {
        symbol: String,
        quantity: f64,
        strike: f64,
        expiry: NaiveDate,
        kind: OptionKind,
    },
}

impl StrategyConfig {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyConfig::BuyAndHold { .. } => "buy_and_hold",
            StrategyConfig::SellOption { .. } => "sell_option",
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            StrategyConfig::BuyAndHold { symbol, .. } | StrategyConfig::SellOption { symbol, .. } => {
                symbol
            }
        }
    }

    fn validate(&self, engine: &EngineConfig) -> Result<(), ConfigError> {
        let symbol = self.symbol();
        if !engine.in_universe(symbol) {
            return Err(ConfigError::Strategy(format!(
                "{} trades {symbol}, which is not in the universe",
                self.name()
            )));
        }
        match self {
            StrategyConfig::BuyAndHold { quantity, exit_date, .. } => {
                check_quantity(*quantity)?;
                if let Some(exit) = exit_date {
                    if *exit < engine.start_date {
                        return Err(ConfigError::Strategy(format!(
                            "exit_date {exit} is before start_date {}",
                            engine.start_date
                        )));
                    }
                }
            }
            StrategyConfig::SellOption { quantity, strike, .. } => {
                check_quantity(*quantity)?;
                if !engine.in_vol_universe(symbol) {
                    return Err(ConfigError::Strategy(format!(
                        "sell_option on {symbol} needs it in vol_universe"
                    )));
                }
                if !(strike.is_finite() && *strike > 0.0) {
                    return Err(ConfigError::Strategy(format!("strike must be positive, got {strike}")));
                }
            }
        }
        Ok(())
    }
}

fn check_quantity(quantity: f64) -> Result<(), ConfigError> {
    if quantity.is_finite() && quantity > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Strategy(format!("quantity must be positive, got {quantity}")))
    }
}

/// Everything needed to reproduce one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: EngineConfig,
    #[serde(default)]
    pub market: MarketConfig,
    pub strategy: StrategyConfig,
}

impl BacktestConfig {
    /// Read, parse and validate a TOML config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if let (Some(market), Some(dir)) = (config.market.path.as_mut(), path.parent()) {
            if market.is_relative() {
                *market = dir.join(&*market);
            }
        }
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backtest.validate()?;
        self.strategy.validate(&self.backtest)
    }

    /// Deterministic fingerprint of the engine and strategy settings.
    ///
    /// The market path is left out: moving the data file does not change the run.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(&(&self.backtest, &self.strategy))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
