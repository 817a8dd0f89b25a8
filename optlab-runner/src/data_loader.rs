//! Market data loading for the runner.
//!
//! The market file is one JSON object keyed by ISO date. Each value carries
//! the snapshot sections (`equity`, `rate`, `volatility`) either under an
//! `EOD` frequency level, as the data pipeline writes them, or directly next
//! to `ref_date`, as `MarketData` serializes. Unknown fields are ignored.
//! A snapshot whose `ref_date` disagrees with its key is rejected: the engine
//! looks snapshots up by date, so a mismatch would silently move data to
//! another day.

use chrono::NaiveDate;
use optlab_core::domain::{
    EquityQuote, MarketData, MarketSnapshot, RateQuote, VolSurfaceData,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read market file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed market JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot keyed {key} carries ref_date {ref_date}")]
    DateMismatch { key: NaiveDate, ref_date: NaiveDate },

    #[error("snapshot keyed {key} has both an EOD level and top-level market fields")]
    AmbiguousLayout { key: NaiveDate },

    #[error("no market snapshots between {start} and {end}")]
    Empty { start: NaiveDate, end: NaiveDate },
}

/// Loaded market data plus its provenance hash.
#[derive(Debug, Clone)]
pub struct LoadedMarket {
    pub market: MarketData,
    /// BLAKE3 over the raw file contents.
    pub dataset_hash: String,
}

/// One date of the market file, in either layout.
#[derive(Debug, Deserialize)]
struct DateEntry {
    ref_date: NaiveDate,
    #[serde(rename = "EOD", default)]
    eod: Option<MarketSnapshot>,
    #[serde(default)]
    equity: Option<BTreeMap<String, EquityQuote>>,
    #[serde(default)]
    rate: Option<RateQuote>,
    #[serde(default)]
    volatility: Option<BTreeMap<String, VolSurfaceData>>,
}

impl DateEntry {
    fn into_snapshot(self, key: NaiveDate) -> Result<MarketSnapshot, LoadError> {
        let has_flat = self.equity.is_some() || self.rate.is_some() || self.volatility.is_some();
        let snapshot = match self.eod {
            Some(_) if has_flat => return Err(LoadError::AmbiguousLayout { key }),
            Some(eod) => {
                if eod.ref_date != self.ref_date {
                    return Err(LoadError::DateMismatch { key, ref_date: eod.ref_date });
                }
                eod
            }
            None => MarketSnapshot {
                ref_date: self.ref_date,
                equity: self.equity.unwrap_or_default(),
                rate: self.rate.unwrap_or_default(),
                volatility: self.volatility.unwrap_or_default(),
            },
        };
        if snapshot.ref_date != key {
            return Err(LoadError::DateMismatch { key, ref_date: snapshot.ref_date });
        }
        Ok(snapshot)
    }
}

/// Parse a market JSON document.
pub fn parse_market(json: &str) -> Result<MarketData, LoadError> {
    let raw: BTreeMap<NaiveDate, DateEntry> = serde_json::from_str(json)?;
    raw.into_iter()
        .map(|(key, entry)| entry.into_snapshot(key))
        .collect::<Result<MarketData, _>>()
}

/// Load a market file. With a range, snapshots outside `[start, end]` are
/// dropped and an empty result is an error.
pub fn load_market(
    path: &Path,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Result<LoadedMarket, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset_hash = blake3::hash(content.as_bytes()).to_hex().to_string();
    let mut market = parse_market(&content)?;

    if let Some((start, end)) = range {
        market.restrict_to(start, end);
        if market.is_empty() {
            return Err(LoadError::Empty { start, end });
        }
    }
    debug!(path = %path.display(), snapshots = market.len(), "market data loaded");

    Ok(LoadedMarket { market, dataset_hash })
}
