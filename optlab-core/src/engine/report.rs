//! Run output: summary table, period P&L series and diagnostics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::date_grid::UnprocessedDate;
use crate::domain::{AssetKind, PositionSummary, Side, TradeId};

/// A valid date whose processing failed and produced no summary rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateFailure {
    pub date: NaiveDate,
    pub reason: String,
}

/// A trade turned away for lack of margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedTrade {
    pub date: NaiveDate,
    pub symbol: String,
    pub asset_kind: AssetKind,
    pub side: Side,
    pub quantity: f64,
    pub required: f64,
    pub available: f64,
}

/// A position closed at a fallback price during terminal liquidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationFallback {
    pub date: NaiveDate,
    pub trade_id: TradeId,
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub failed_dates: Vec<DateFailure>,
    pub rejected_trades: Vec<RejectedTrade>,
    pub liquidation_fallbacks: Vec<LiquidationFallback>,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.failed_dates.is_empty()
            && self.rejected_trades.is_empty()
            && self.liquidation_fallbacks.is_empty()
    }
}

/// Portfolio value on one date: starting balance plus global P&L.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodPnl {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub starting_balance: f64,
    pub valid_dates: Vec<NaiveDate>,
    pub holidays: Vec<NaiveDate>,
    pub unprocessed_dates: Vec<UnprocessedDate>,
    /// Per-date, per-position rows in date order.
    pub summaries: Vec<PositionSummary>,
    pub period_pnl: Vec<PeriodPnl>,
    pub margin: BTreeMap<NaiveDate, f64>,
    pub diagnostics: Diagnostics,
}

impl BacktestReport {
    /// First alive row and first closed row of every trade.
    pub fn trade_log(&self) -> Vec<PositionSummary> {
        trade_log(&self.summaries)
    }

    pub fn final_value(&self) -> Option<f64> {
        self.period_pnl.last().map(|p| p.value)
    }

    pub fn rows_for(&self, trade_id: TradeId) -> impl Iterator<Item = &PositionSummary> {
        self.summaries.iter().filter(move |r| r.trade_id == trade_id)
    }
}

/// Sum global P&L per date, offset by `starting_balance`. Dates without rows
/// are absent.
pub fn period_pnl(rows: &[PositionSummary], starting_balance: f64) -> Vec<PeriodPnl> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in rows {
        *by_date.entry(row.date).or_default() += row.global_pnl;
    }
    by_date
        .into_iter()
        .map(|(date, pnl)| PeriodPnl { date, value: pnl + starting_balance })
        .collect()
}

/// Reduce the summary table to at most two rows per trade: the first date it
/// is seen alive and the first date it is seen closed.
pub fn trade_log(rows: &[PositionSummary]) -> Vec<PositionSummary> {
    let mut seen_open: HashSet<TradeId> = HashSet::new();
    let mut seen_closed: HashSet<TradeId> = HashSet::new();
    rows.iter()
        .filter(|r| {
            if r.is_alive {
                seen_open.insert(r.trade_id)
            } else {
                seen_closed.insert(r.trade_id)
            }
        })
        .cloned()
        .collect()
}
