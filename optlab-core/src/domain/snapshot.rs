//! Market snapshots: the complete market state for one reference date.
//!
//! Snapshots are produced by the ingestion layer and are read-only to the
//! engine. The serde layout matches the on-disk market JSON: one object per
//! ISO date with `equity`, `rate` and `volatility` sections.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Daily quote for a single equity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityQuote {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Continuous dividend yield used for option valuation.
    #[serde(rename = "div_yield", alias = "dividend_yield", default)]
    pub dividend_yield: f64,
}

impl EquityQuote {
    /// A quote is usable when its close is a finite, strictly positive price.
    pub fn has_usable_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// Rates section of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    /// Flat risk-free rate (annualized, continuous compounding).
    pub riskfree: Option<f64>,
}

/// Raw implied-volatility grid for one symbol on one date.
///
/// `volatility[i][j]` is the implied vol at `moneyness[i]` and `tenor[j]` days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolSurfaceData {
    pub moneyness: Vec<f64>,
    pub tenor: Vec<u32>,
    pub volatility: Vec<Vec<f64>>,
}

/// Market state for a single reference date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub ref_date: NaiveDate,
    #[serde(default)]
    pub equity: BTreeMap<String, EquityQuote>,
    #[serde(default)]
    pub rate: RateQuote,
    #[serde(default)]
    pub volatility: BTreeMap<String, VolSurfaceData>,
}

impl MarketSnapshot {
    pub fn new(ref_date: NaiveDate) -> Self {
        Self {
            ref_date,
            equity: BTreeMap::new(),
            rate: RateQuote::default(),
            volatility: BTreeMap::new(),
        }
    }

    pub fn quote(&self, symbol: &str) -> Option<&EquityQuote> {
        self.equity.get(symbol)
    }

    /// Close price for `symbol`, if present and usable.
    pub fn close(&self, symbol: &str) -> Option<f64> {
        self.equity
            .get(symbol)
            .filter(|q| q.has_usable_close())
            .map(|q| q.close)
    }

    pub fn surface(&self, symbol: &str) -> Option<&VolSurfaceData> {
        self.volatility.get(symbol)
    }

    pub fn risk_free_rate(&self) -> Option<f64> {
        self.rate.riskfree.filter(|r| r.is_finite())
    }
}

/// All snapshots available to a run, keyed by reference date.
///
/// Serializes as a JSON object keyed by ISO date strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketData {
    snapshots: BTreeMap<NaiveDate, MarketSnapshot>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a snapshot under its own `ref_date`, replacing any previous one.
    pub fn insert(&mut self, snapshot: MarketSnapshot) {
        self.snapshots.insert(snapshot.ref_date, snapshot);
    }

    /// Exact-date lookup.
    pub fn get(&self, date: NaiveDate) -> Option<&MarketSnapshot> {
        self.snapshots.get(&date)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.snapshots.keys().copied()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.snapshots.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.snapshots.keys().next_back().copied()
    }

    /// Keep only snapshots inside `[start, end]`.
    pub fn restrict_to(&mut self, start: NaiveDate, end: NaiveDate) {
        self.snapshots.retain(|d, _| *d >= start && *d <= end);
    }
}

impl FromIterator<MarketSnapshot> for MarketData {
    fn from_iter<I: IntoIterator<Item = MarketSnapshot>>(iter: I) -> Self {
        let mut data = MarketData::new();
        for snapshot in iter {
            data.insert(snapshot);
        }
        data
    }
}
