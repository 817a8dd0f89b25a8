//! Config file to artifacts, through the public runner API.

use std::path::Path;

use chrono::NaiveDate;
use optlab_core::domain::{EquityQuote, MarketData, MarketSnapshot, VolSurfaceData};
use optlab_runner::export::{generate_report, import_json, load_artifacts, save_artifacts};
use optlab_runner::{
    run_single_backtest, run_with_market, BacktestConfig, RunError, StrategyConfig,
    SCHEMA_VERSION,
};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn market() -> MarketData {
    (1..=12)
        .map(|day| {
            let close = 100.0 + day as f64;
            let mut snap = MarketSnapshot::new(d(day));
            snap.equity.insert(
                "XYZ".into(),
                EquityQuote { open: close, high: close, low: close, close, dividend_yield: 0.0 },
            );
            snap.rate.riskfree = Some(0.03);
            snap.volatility.insert(
                "XYZ".into(),
                VolSurfaceData {
                    moneyness: vec![0.8, 1.0, 1.2],
                    tenor: vec![7, 30],
                    volatility: vec![vec![0.35, 0.33], vec![0.3, 0.28], vec![0.32, 0.3]],
                },
            );
            snap
        })
        .collect()
}

fn write_market(dir: &Path) {
    let json = serde_json::to_string(&market()).unwrap();
    std::fs::write(dir.join("market.json"), json).unwrap();
}

const SELL_PUT: &str = r#"
[backtest]
universe = ["XYZ"]
vol_universe = ["XYZ"]
start_date = "2024-01-01"
end_date = "2024-01-12"
starting_balance = 1000.0

[market]
path = "market.json"

[strategy]
type = "sell_option"
symbol = "XYZ"
quantity = 1.0
strike = 100.0
expiry = "2024-01-09"
kind = "put"
"#;

#[test]
fn sell_put_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    write_market(dir.path());
    let config_path = dir.path().join("run.toml");
    std::fs::write(&config_path, SELL_PUT).unwrap();

    let config = BacktestConfig::from_file(&config_path).unwrap();
    assert_eq!(config.market.path.as_deref(), Some(dir.path().join("market.json").as_path()));

    let result = run_single_backtest(&config, None).unwrap();
    assert_eq!(result.schema_version, SCHEMA_VERSION);
    assert_eq!(result.strategy, "sell_put");
    assert_eq!(result.run_id, config.run_id().unwrap());
    assert!(result.dataset_hash.is_some());

    // TARGET: Jan 1 and the weekend are holidays
    let report = &result.report;
    assert_eq!(report.holidays, vec![d(1), d(6), d(7)]);
    assert_eq!(report.valid_dates.first(), Some(&d(2)));

    // out of the money at expiry: the whole premium is kept
    let log = report.trade_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].date, d(9));
    let premium = log[0].entry_price;
    assert!(premium > 0.0);
    assert!((log[1].closed_pnl - premium).abs() < 1e-12);

    let m = &result.metrics;
    assert_eq!(m.trade_count, 1);
    assert_eq!(m.win_rate, 1.0);
    assert!((m.max_profit - premium).abs() < 1e-12);
    assert_eq!(report.final_value(), Some(1000.0 + log[1].closed_pnl));
}

#[test]
fn market_override_and_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    write_market(dir.path());
    let doc = r#"
        [backtest]
        universe = ["XYZ"]
        start_date = "2024-01-02"
        end_date = "2024-01-12"
        starting_balance = 1000.0

        [strategy]
        type = "buy_and_hold"
        symbol = "XYZ"
        quantity = 2.0
        exit_date = "2024-01-08"
    "#;
    let config = BacktestConfig::from_toml_str(doc).unwrap();

    assert!(matches!(run_single_backtest(&config, None), Err(RunError::NoMarketFile)));

    let market_path = dir.path().join("market.json");
    let result = run_single_backtest(&config, Some(&market_path)).unwrap();
    // bought at 102, sold at 108
    assert_eq!(result.metrics.trade_count, 1);
    assert_eq!(result.metrics.max_profit, 12.0);
    assert_eq!(result.report.final_value(), Some(1012.0));

    let out = dir.path().join("artifacts");
    let run_dir = save_artifacts(&result, &out).unwrap();
    for name in ["manifest.json", "summary.csv", "trade_log.csv", "period_pnl.csv", "margin.csv"] {
        assert!(run_dir.join(name).exists(), "missing {name}");
    }

    let summary = std::fs::read_to_string(run_dir.join("summary.csv")).unwrap();
    let header = summary.lines().next().unwrap();
    assert!(header.starts_with("date,trade_id,symbol,asset_kind,side,quantity"));
    let trade_log = std::fs::read_to_string(run_dir.join("trade_log.csv")).unwrap();
    assert_eq!(trade_log.lines().count(), 3);

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.run_id, result.run_id);
    assert_eq!(loaded.config, result.config);
    assert_eq!(loaded.report.summaries.len(), result.report.summaries.len());
    assert_eq!(loaded.report.valid_dates, result.report.valid_dates);
}

#[test]
fn newer_schema_versions_are_rejected() {
    let config = BacktestConfig::from_toml_str(SELL_PUT).unwrap();
    let result = run_with_market(&config, market(), None).unwrap();
    let json = optlab_runner::export::export_json(&result).unwrap();

    assert!(import_json(&json).is_ok());
    let bumped = json.replace(
        &format!("\"schema_version\": {SCHEMA_VERSION}"),
        "\"schema_version\": 99",
    );
    assert!(import_json(&bumped).is_err());
}

#[test]
fn markdown_report_lists_metrics_and_rejections() {
    let doc = SELL_PUT.replace("quantity = 1.0", "quantity = 100000.0");
    let config = BacktestConfig::from_toml_str(&doc).unwrap();
    let result = run_with_market(&config, market(), None).unwrap();

    assert_eq!(result.metrics.trade_count, 0);
    assert_eq!(result.report.diagnostics.rejected_trades.len(), 1);

    let md = generate_report(&result);
    assert!(md.contains("# Backtest: sell_put"));
    assert!(md.contains("| Trades | 0 |"));
    assert!(md.contains("## Diagnostics"));
}

#[test]
fn strategy_symbol_outside_universe_is_rejected_up_front() {
    let mut config = BacktestConfig::from_toml_str(SELL_PUT).unwrap();
    config.strategy = StrategyConfig::BuyAndHold {
        symbol: "ABC".into(),
        quantity: 1.0,
        exit_date: None,
    };
    assert!(matches!(run_with_market(&config, market(), None), Err(RunError::Config(_))));
}
