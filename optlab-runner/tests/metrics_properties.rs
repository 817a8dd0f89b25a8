//! Property tests for the performance metrics.

use chrono::NaiveDate;
use optlab_core::engine::PeriodPnl;
use optlab_runner::metrics::{daily_returns, max_drawdown, profit_factor, win_rate, PerformanceMetrics};
use proptest::prelude::*;

fn series(values: &[f64]) -> Vec<PeriodPnl> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| PeriodPnl { date: start + chrono::Duration::days(i as i64), value })
        .collect()
}

proptest! {
    #[test]
    fn drawdown_is_a_fraction_of_the_peak(values in prop::collection::vec(1.0..1e6_f64, 0..60)) {
        let dd = max_drawdown(&values);
        prop_assert!((-1.0..=0.0).contains(&dd));
    }

    #[test]
    fn one_return_per_consecutive_pair(values in prop::collection::vec(1.0..1e6_f64, 1..60)) {
        prop_assert_eq!(daily_returns(&values).len(), values.len() - 1);
    }

    #[test]
    fn trade_ratios_stay_in_range(closed in prop::collection::vec(-1e4..1e4_f64, 0..40)) {
        let rate = win_rate(&closed);
        prop_assert!((0.0..=1.0).contains(&rate));
        let pf = profit_factor(&closed);
        prop_assert!((0.0..=100.0).contains(&pf));
    }

    #[test]
    fn monotone_series_has_no_drawdown(steps in prop::collection::vec(0.0..100.0_f64, 1..40)) {
        let mut value = 1000.0;
        let values: Vec<f64> = steps
            .iter()
            .map(|s| {
                value += s;
                value
            })
            .collect();
        let m = PerformanceMetrics::compute(&series(&values), &[]);
        prop_assert_eq!(m.max_drawdown, 0.0);
        prop_assert!(m.expected_return >= 0.0);
    }
}
