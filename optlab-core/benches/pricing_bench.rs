//! Criterion benchmarks for optlab hot paths.
//!
//! Benchmarks:
//! 1. Surface interpolation (node, interior, extrapolated queries)
//! 2. BSM pricing
//! 3. Full option valuation from a snapshot
//! 4. Date loop with a daily-marked option book

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::NaiveDate;
use optlab_core::domain::{
    EquityQuote, Instrument, MarketData, MarketSnapshot, OptionContract, OptionKind, Side,
    Valuation, VolSurfaceData,
};
use optlab_core::engine::{
    Backtester, EngineConfig, EngineError, Strategy, TradeRequest, TradingContext,
};
use optlab_core::pricing::{BlackScholesMerton, VolSurface};

// ── Helpers ──────────────────────────────────────────────────────────

fn surface_data() -> VolSurfaceData {
    let moneyness: Vec<f64> = (0..21).map(|i| 0.5 + 0.05 * i as f64).collect();
    let tenor: Vec<u32> = vec![7, 14, 30, 60, 90, 180, 365, 730];
    let volatility = moneyness
        .iter()
        .map(|m| {
            tenor
                .iter()
                .map(|&t| 0.2 + 0.3 * (m - 1.0).powi(2) + 0.01 * (t as f64 / 365.0))
                .collect()
        })
        .collect();
    VolSurfaceData { moneyness, tenor, volatility }
}

fn snapshot(date: NaiveDate, close: f64) -> MarketSnapshot {
    let mut snap = MarketSnapshot::new(date);
    snap.equity.insert(
        "XYZ".into(),
        EquityQuote { open: close, high: close, low: close, close, dividend_yield: 0.015 },
    );
    snap.rate.riskfree = Some(0.035);
    snap.volatility.insert("XYZ".into(), surface_data());
    snap
}

fn market(days: usize) -> MarketData {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    (0..days)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            snapshot(start + chrono::Duration::days(i as i64), close)
        })
        .collect()
}

struct LadderSeller;

impl Strategy for LadderSeller {
    fn on_data(&mut self, ctx: &mut TradingContext<'_>) -> Result<(), EngineError> {
        let expiry = ctx.date() + chrono::Duration::days(45);
        let spot = ctx.snapshot().close("XYZ").unwrap_or(100.0);
        let contract = OptionContract::new((spot / 5.0).round() * 5.0, expiry, OptionKind::Put);
        ctx.trade(TradeRequest::option("XYZ", 1.0, Side::Short, contract))?;
        Ok(())
    }
}

// ── 1. Surface interpolation ─────────────────────────────────────────

fn bench_surface(c: &mut Criterion) {
    let surface = VolSurface::from_data(&surface_data()).unwrap();
    let mut group = c.benchmark_group("surface");
    group.bench_function("node", |b| b.iter(|| surface.vol(black_box(1.0), black_box(30.0))));
    group.bench_function("interior", |b| {
        b.iter(|| surface.vol(black_box(0.97), black_box(45.0)))
    });
    group.bench_function("extrapolated", |b| {
        b.iter(|| surface.vol(black_box(1.8), black_box(1000.0)))
    });
    group.bench_function("from_data", |b| {
        let data = surface_data();
        b.iter(|| VolSurface::from_data(black_box(&data)))
    });
    group.finish();
}

// ── 2. BSM pricing ───────────────────────────────────────────────────

fn bench_bsm(c: &mut Criterion) {
    let bsm = BlackScholesMerton::new(0.035, 0.015);
    c.bench_function("bsm_call", |b| {
        b.iter(|| {
            bsm.price(
                black_box(100.0),
                black_box(105.0),
                black_box(0.25),
                black_box(0.22),
                OptionKind::Call,
            )
        })
    });
}

// ── 3. Option valuation ──────────────────────────────────────────────

fn bench_valuation(c: &mut Criterion) {
    let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let snap = snapshot(date, 100.0);
    let contract = Instrument::Option(OptionContract::call(
        105.0,
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
    ));
    c.bench_function("option_valuation", |b| {
        b.iter(|| contract.calculate_value(black_box("XYZ"), black_box(&snap)))
    });
}

// ── 4. Date loop ─────────────────────────────────────────────────────

fn bench_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest");
    group.sample_size(10);
    for days in [60usize, 250] {
        let data = market(days);
        let start = data.first_date().unwrap();
        let end = data.last_date().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(days), &data, |b, data| {
            b.iter(|| {
                let config = EngineConfig::new(["XYZ"], start, end, 1_000_000.0)
                    .with_vol_universe(["XYZ"]);
                let mut bt = Backtester::new(config, data.clone()).unwrap();
                bt.backtest(&mut LadderSeller).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_surface, bench_bsm, bench_valuation, bench_backtest);
criterion_main!(benches);
