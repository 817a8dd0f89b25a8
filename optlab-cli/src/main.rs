//! OptLab CLI: run backtests and inspect date grids.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file and save artifacts
//! - `grid`: show which dates of a market file a run would process

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;

use optlab_core::calendar::CalendarKind;
use optlab_core::engine::DateGrid;
use optlab_runner::export::{generate_report, save_artifacts};
use optlab_runner::{load_market, run_single_backtest, BacktestConfig};

#[derive(Parser)]
#[command(name = "optlab", about = "OptLab CLI: daily equity and option backtesting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Market JSON file; overrides `[market] path` in the config.
        #[arg(long)]
        market: Option<PathBuf>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Print the valid, holiday and unprocessed dates for a market file.
    Grid {
        /// Market JSON file.
        #[arg(long)]
        market: PathBuf,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD).
        #[arg(long)]
        end: NaiveDate,

        /// Symbols that need a close price on every valid date.
        #[arg(long, required = true, num_args = 1..)]
        symbols: Vec<String>,

        /// Symbols that need a volatility surface on every valid date.
        #[arg(long, num_args = 1..)]
        vol_symbols: Vec<String>,

        /// Business-day calendar: `target` or `weekends`.
        #[arg(long, default_value = "target", value_parser = parse_calendar)]
        calendar: CalendarKind,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("optlab=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, market, output_dir } => {
            run_backtest_cmd(&config, market.as_deref(), &output_dir)
        }
        Commands::Grid { market, start, end, symbols, vol_symbols, calendar } => {
            run_grid(&market, start, end, &symbols, &vol_symbols, calendar)
        }
    }
}

fn parse_calendar(s: &str) -> Result<CalendarKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "target" => Ok(CalendarKind::Target),
        "weekends" => Ok(CalendarKind::Weekends),
        other => Err(format!("unknown calendar '{other}' (expected target or weekends)")),
    }
}

fn run_backtest_cmd(config_path: &Path, market: Option<&Path>, output_dir: &Path) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;

    let result = run_single_backtest(&config, market)?;
    for failure in &result.report.diagnostics.failed_dates {
        warn!(date = %failure.date, reason = %failure.reason, "date failed");
    }

    println!("{}", generate_report(&result));

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_grid(
    market_path: &Path,
    start: NaiveDate,
    end: NaiveDate,
    symbols: &[String],
    vol_symbols: &[String],
    calendar: CalendarKind,
) -> Result<()> {
    let loaded = load_market(market_path, None)?;
    let calendar = calendar.build();
    let grid = DateGrid::build(start, end, calendar.as_ref(), &loaded.market, symbols, vol_symbols);

    println!("Calendar:    {}", calendar.name());
    println!("Valid dates: {}", grid.len());
    for date in grid.valid_dates() {
        println!("  {date}");
    }
    println!("Holidays:    {}", grid.holidays().len());
    println!("Unprocessed: {}", grid.unprocessed_dates().len());
    for skipped in grid.unprocessed_dates() {
        println!("  {}  {}", skipped.date, skipped.reason);
    }
    Ok(())
}
