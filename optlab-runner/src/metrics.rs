//! Performance metrics: pure functions over the period P&L series and the
//! closed rows of the trade log.
//!
//! Returns are daily (per valid date) and the Sharpe ratio uses a zero
//! risk-free rate without annualization.

use optlab_core::domain::PositionSummary;
use optlab_core::engine::{BacktestReport, PeriodPnl};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub expected_return: f64,
    pub std_deviation: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub trade_count: usize,
    pub win_rate: f64,
    pub average_pnl: f64,
    pub average_win: f64,
    pub average_loss: f64,
    pub max_profit: f64,
    pub max_loss: f64,
    pub profit_factor: f64,
}

impl PerformanceMetrics {
    pub fn compute(period_pnl: &[PeriodPnl], trade_log: &[PositionSummary]) -> Self {
        let values: Vec<f64> = period_pnl.iter().map(|p| p.value).collect();
        let returns = daily_returns(&values);
        let closed = closed_pnls(trade_log);
        Self {
            expected_return: mean_f64(&returns),
            std_deviation: std_dev(&returns),
            sharpe: sharpe_ratio(&returns),
            max_drawdown: max_drawdown(&values),
            trade_count: trade_count(trade_log),
            win_rate: win_rate(&closed),
            average_pnl: mean_f64(&closed),
            average_win: mean_f64(&winners(&closed)),
            average_loss: mean_f64(&losers(&closed)),
            max_profit: extreme(&closed, f64::max),
            max_loss: extreme(&closed, f64::min),
            profit_factor: profit_factor(&closed),
        }
    }

    pub fn from_report(report: &BacktestReport) -> Self {
        Self::compute(&report.period_pnl, &report.trade_log())
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Simple returns between consecutive values. Pairs starting from a
/// non-positive value are skipped.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Mean over standard deviation of daily returns; 0.0 when flat.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / std
}

/// Largest peak-to-trough decline as a (non-positive) fraction of the peak.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &v in values {
        peak = peak.max(v);
        if peak > 0.0 {
            max_dd = max_dd.min((v - peak) / peak);
        }
    }
    max_dd
}

/// Distinct trades seen in the log, including ones opened and closed on the
/// same date.
pub fn trade_count(trade_log: &[PositionSummary]) -> usize {
    trade_log.iter().map(|r| r.trade_id).collect::<HashSet<_>>().len()
}

/// Realized P&L of every closed row in the log.
pub fn closed_pnls(trade_log: &[PositionSummary]) -> Vec<f64> {
    trade_log.iter().filter(|r| !r.is_alive).map(|r| r.closed_pnl).collect()
}

pub fn win_rate(closed: &[f64]) -> f64 {
    if closed.is_empty() {
        return 0.0;
    }
    winners(closed).len() as f64 / closed.len() as f64
}

/// Gross profits over gross losses, capped at 100.0 when there are no losses.
pub fn profit_factor(closed: &[f64]) -> f64 {
    let gross_profit: f64 = winners(closed).iter().sum();
    let gross_loss: f64 = losers(closed).iter().map(|l| l.abs()).sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

// ─── Helpers ────────────────────────────────────────────────────────

fn winners(closed: &[f64]) -> Vec<f64> {
    closed.iter().copied().filter(|p| *p > 0.0).collect()
}

fn losers(closed: &[f64]) -> Vec<f64> {
    closed.iter().copied().filter(|p| *p < 0.0).collect()
}

/// Fold with `pick`; 0.0 for an empty slice.
fn extreme(values: &[f64], pick: fn(f64, f64) -> f64) -> f64 {
    values.iter().copied().reduce(pick).unwrap_or(0.0)
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
