//! Reporting and export: JSON, CSV and Markdown artifacts for a run.
//!
//! - **JSON**: the full `RunResult` with schema versioning
//! - **CSV**: summary table, period P&L, trade log and margin balances
//! - **Markdown**: human-readable metric summary
//!
//! Unknown (newer) schema versions are rejected on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use optlab_core::domain::PositionSummary;
use optlab_core::engine::PeriodPnl;

use crate::runner::{RunResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &RunResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize RunResult to JSON")
}

/// Deserialize a `RunResult`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunResult> {
    let result: RunResult =
        serde_json::from_str(json).context("failed to deserialize RunResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Summary rows as CSV, one column per `PositionSummary` field.
pub fn export_summary_csv(rows: &[PositionSummary]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("failed to write summary row for trade {}", row.trade_id))?;
    }
    finish(wtr)
}

pub fn export_period_pnl_csv(series: &[PeriodPnl]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "value"])?;
    for point in series {
        wtr.write_record([point.date.to_string(), format!("{:.2}", point.value)])?;
    }
    finish(wtr)
}

pub fn export_margin_csv<'a>(
    balances: impl IntoIterator<Item = (&'a chrono::NaiveDate, &'a f64)>,
) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "margin"])?;
    for (date, balance) in balances {
        wtr.write_record([date.to_string(), format!("{balance:.2}")])?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a run.
///
/// Creates `{strategy}_{run_id prefix}/` under `output_dir` containing
/// `manifest.json`, `summary.csv`, `trade_log.csv`, `period_pnl.csv` and
/// `margin.csv`. Returns the created directory.
pub fn save_artifacts(result: &RunResult, output_dir: &Path) -> Result<PathBuf> {
    let prefix: String = result.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("{}_{prefix}", result.strategy));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let report = &result.report;
    let files = [
        ("manifest.json", export_json(result)?),
        ("summary.csv", export_summary_csv(&report.summaries)?),
        ("trade_log.csv", export_summary_csv(&report.trade_log())?),
        ("period_pnl.csv", export_period_pnl_csv(&report.period_pnl)?),
        ("margin.csv", export_margin_csv(&report.margin)?),
    ];
    for (name, content) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(run_dir)
}

pub fn load_artifacts(dir: &Path) -> Result<RunResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

pub fn generate_report(result: &RunResult) -> String {
    let m = &result.metrics;
    let r = &result.report;
    let mut out = String::new();

    let _ = writeln!(out, "# Backtest: {}\n", result.strategy);
    let _ = writeln!(out, "- Run ID: `{}`", result.run_id);
    let _ = writeln!(out, "- Period: {} to {}", r.start_date, r.end_date);
    let _ = writeln!(
        out,
        "- Dates: {} valid, {} holidays, {} unprocessed",
        r.valid_dates.len(),
        r.holidays.len(),
        r.unprocessed_dates.len()
    );
    let _ = writeln!(out, "- Starting balance: {:.2}", r.starting_balance);
    let _ = writeln!(
        out,
        "- Final value: {:.2}\n",
        r.final_value().unwrap_or(r.starting_balance)
    );

    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    let rows = [
        ("Expected daily return", format!("{:.4}%", m.expected_return * 100.0)),
        ("Std deviation", format!("{:.4}%", m.std_deviation * 100.0)),
        ("Sharpe (daily)", format!("{:.3}", m.sharpe)),
        ("Max drawdown", format!("{:.2}%", m.max_drawdown * 100.0)),
        ("Trades", m.trade_count.to_string()),
        ("Win rate", format!("{:.1}%", m.win_rate * 100.0)),
        ("Average P&L", format!("{:.2}", m.average_pnl)),
        ("Average win", format!("{:.2}", m.average_win)),
        ("Average loss", format!("{:.2}", m.average_loss)),
        ("Max profit", format!("{:.2}", m.max_profit)),
        ("Max loss", format!("{:.2}", m.max_loss)),
        ("Profit factor", format!("{:.2}", m.profit_factor)),
    ];
    for (name, value) in rows {
        let _ = writeln!(out, "| {name} | {value} |");
    }

    let d = &r.diagnostics;
    if !d.is_clean() {
        let _ = writeln!(out, "\n## Diagnostics\n");
        for f in &d.failed_dates {
            let _ = writeln!(out, "- {} failed: {}", f.date, f.reason);
        }
        for t in &d.rejected_trades {
            let _ = writeln!(
                out,
                "- {} rejected {} {} {}: required {:.2}, available {:.2}",
                t.date, t.quantity, t.symbol, t.asset_kind, t.required, t.available
            );
        }
        for l in &d.liquidation_fallbacks {
            let _ = writeln!(out, "- {} trade {} ({}): {}", l.date, l.trade_id, l.symbol, l.reason);
        }
    }
    out
}
