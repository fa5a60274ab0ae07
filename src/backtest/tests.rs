//! Tests for the backtester

use super::*;
use crate::strategy::{MaCrossover, StrategyRegistry, parse_grid};
use chrono::TimeZone;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

fn bars_with_step(closes: &[f64], step: Duration) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: start + step * i as i32,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        })
        .collect()
}

fn daily(closes: &[f64]) -> Vec<Bar> {
    bars_with_step(closes, Duration::days(1))
}

/// Always long from the first bar
struct AlwaysLong;

impl Strategy for AlwaysLong {
    fn name(&self) -> &str {
        "always_long"
    }

    fn params(&self) -> StrategyParams {
        StrategyParams::new()
    }

    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal> {
        vec![Signal::Buy; bars.len()]
    }
}

#[test]
fn test_hold_signals_keep_capital_flat() {
    let bars = daily(&[10.0, 11.0, 9.0, 12.0]);
    let signals = vec![Signal::Hold; 4];

    let perf = compute_performance(&bars, &signals, 100.0).unwrap();

    assert_eq!(perf.equity, vec![100.0; 4]);
    assert_close(perf.total_return, 0.0);
    assert_eq!(perf.sharpe_ratio, None);
    assert_close(perf.annual_volatility, 0.0);
    assert_close(perf.max_drawdown, 0.0);
}

#[test]
fn test_signal_applies_to_next_bar() {
    let bars = daily(&[100.0, 110.0, 121.0, 108.9]);
    // Long on bar 0 earns bar 1; flat on bar 1 skips bar 2; short on bar 2 earns bar 3
    let signals = vec![Signal::Buy, Signal::Hold, Signal::Sell, Signal::Hold];

    let perf = compute_performance(&bars, &signals, 1.0).unwrap();

    assert_close(perf.returns[0], 0.0);
    assert_close(perf.returns[1], 0.10);
    assert_close(perf.returns[2], 0.0);
    assert_close(perf.returns[3], 0.10);
    assert_close(perf.equity[3], 1.21);
    assert_close(perf.total_return, 0.21);
}

#[test]
fn test_metrics_for_long_only() {
    let bars = daily(&[100.0, 110.0, 99.0, 108.9]);
    let signals = vec![Signal::Buy; 4];

    let perf = compute_performance(&bars, &signals, 1.0).unwrap();

    let returns = [0.0, 0.1, -0.1, 0.1];
    let mean = returns.iter().sum::<f64>() / 4.0;
    let std = (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 3.0).sqrt();
    assert_eq!(perf.frequency, BarFrequency::Daily);
    assert_close(perf.annual_return, (1.0 + mean).powf(252.0) - 1.0);
    assert_close(perf.annual_volatility, std * 252.0_f64.sqrt());
    assert_close(perf.sharpe_ratio.unwrap(), mean / std * 252.0_f64.sqrt());
    // Peak 1.1, trough 0.99
    assert_close(perf.max_drawdown, 0.99 / 1.1 - 1.0);
    assert_close(perf.total_return, 0.089);
}

#[test]
fn test_rejects_bad_input() {
    let bars = daily(&[1.0, 2.0]);
    assert!(compute_performance(&[], &[], 1.0).is_err());
    assert!(compute_performance(&bars, &[Signal::Buy], 1.0).is_err());
    assert!(compute_performance(&bars, &[Signal::Buy; 2], 0.0).is_err());
    assert!(compute_performance(&bars, &[Signal::Buy; 2], f64::NAN).is_err());
}

#[test]
fn test_single_bar() {
    let perf = compute_performance(&daily(&[5.0]), &[Signal::Buy], 10.0).unwrap();
    assert_eq!(perf.equity, vec![10.0]);
    assert_eq!(perf.sharpe_ratio, None);
    assert_eq!(perf.frequency, BarFrequency::Unknown);
}

#[test]
fn test_multi_period_gaps_are_unknown() {
    let closes = [1.0; 5];
    let ts = |bars: Vec<Bar>| bars.iter().map(|b| b.timestamp).collect::<Vec<_>>();

    let quarter_hour = BarFrequency::infer(&ts(bars_with_step(&closes, Duration::minutes(15))));
    let two_hours = BarFrequency::infer(&ts(bars_with_step(&closes, Duration::hours(2))));

    assert_eq!(quarter_hour, BarFrequency::Unknown);
    assert_eq!(two_hours, BarFrequency::Unknown);
    assert_eq!(quarter_hour.annualization_factor(), 252.0);
}

#[test]
fn test_frequency_inference() {
    let closes = [1.0; 5];
    let ts = |bars: Vec<Bar>| bars.iter().map(|b| b.timestamp).collect::<Vec<_>>();

    assert_eq!(BarFrequency::infer(&ts(daily(&closes))), BarFrequency::Daily);
    assert_eq!(
        BarFrequency::infer(&ts(bars_with_step(&closes, Duration::hours(1)))),
        BarFrequency::Hourly
    );
    assert_eq!(
        BarFrequency::infer(&ts(bars_with_step(&closes, Duration::minutes(1)))),
        BarFrequency::Minute
    );
    assert_eq!(
        BarFrequency::infer(&ts(bars_with_step(&closes, Duration::weeks(1)))),
        BarFrequency::Weekly
    );

    // Thu, Fri, Mon, Tue
    let business: Vec<DateTime<Utc>> = [4, 5, 8, 9]
        .iter()
        .map(|d| Utc.with_ymd_and_hms(2024, 1, *d, 0, 0, 0).unwrap())
        .collect();
    assert_eq!(BarFrequency::infer(&business), BarFrequency::BusinessDaily);

    let irregular: Vec<DateTime<Utc>> = [1, 2, 5, 20]
        .iter()
        .map(|d| Utc.with_ymd_and_hms(2024, 1, *d, 0, 0, 0).unwrap())
        .collect();
    assert_eq!(BarFrequency::infer(&irregular), BarFrequency::Unknown);
}

#[test]
fn test_annualization_factors() {
    assert_eq!(BarFrequency::Daily.annualization_factor(), 252.0);
    assert_eq!(BarFrequency::BusinessDaily.annualization_factor(), 252.0);
    assert_eq!(BarFrequency::Hourly.annualization_factor(), 252.0 * 6.5);
    assert_eq!(BarFrequency::Minute.annualization_factor(), 252.0 * 6.5 * 4.0);
    assert_eq!(BarFrequency::Unknown.annualization_factor(), 252.0);
}

#[test]
fn test_hourly_bars_annualize_differently() {
    let closes = [100.0, 101.0, 100.5, 102.0, 101.0];
    let daily_perf =
        compute_performance(&daily(&closes), &[Signal::Buy; 5], 1.0).unwrap();
    let hourly_perf = compute_performance(
        &bars_with_step(&closes, Duration::hours(1)),
        &[Signal::Buy; 5],
        1.0,
    )
    .unwrap();

    assert_close(daily_perf.total_return, hourly_perf.total_return);
    assert!(hourly_perf.annual_volatility > daily_perf.annual_volatility);
}

#[test]
fn test_run_backtest_report() {
    let bars = daily(&[10.0, 11.0, 12.1]);

    let report = run_backtest(&bars, &AlwaysLong, 1000.0).unwrap();

    assert_eq!(report.strategy, "always_long");
    assert_eq!(report.bars, 3);
    assert_eq!(report.equity.len(), 3);
    assert_eq!(report.equity[2].timestamp, bars[2].timestamp);
    assert_close(report.final_equity(), 1210.0);
    assert_eq!(report.params_label(), "");
}

#[test]
fn test_report_json_omits_equity_series() {
    let bars = daily(&[10.0, 11.0, 12.0]);
    let report = run_backtest(&bars, &MaCrossover::new(1, 2), 1.0).unwrap();

    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["strategy"], "ma_crossover");
    assert_eq!(json["params"]["fast"], 1);
    assert_eq!(json["frequency"], "daily");
    assert!(json.get("equity").is_none());
    assert_eq!(report.params_label(), "fast=1 slow=2");
}

#[test]
fn test_write_equity_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("equity.csv");
    let report = run_backtest(&daily(&[1.0, 2.0]), &AlwaysLong, 1.0).unwrap();

    write_equity_csv(&report, &path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "Date,equity");
    assert_eq!(lines.len(), 3);
    assert!(lines[2].ends_with(",2"));
}

#[test]
fn test_sweep_ranks_by_sharpe() {
    // Rising, then falling, then rising again
    let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
    closes.extend((0..20).map(|i| 129.0 - 2.0 * i as f64));
    closes.extend((0..30).map(|i| 90.0 + 1.5 * i as f64));
    let bars = daily(&closes);

    let registry = StrategyRegistry::builtin();
    let grid = parse_grid(&["fast=2,3", "slow=5,8"]);
    let mut strategies = registry.instantiate_grid(&grid).unwrap();
    strategies.push(Box::new(AlwaysLong));

    let reports = sweep(&bars, &strategies, 1.0).unwrap();

    assert_eq!(reports.len(), 5);
    let sharpes: Vec<Option<f64>> = reports.iter().map(|r| r.sharpe_ratio).collect();
    let defined: Vec<f64> = sharpes.iter().flatten().copied().collect();
    assert!(defined.windows(2).all(|w| w[0] >= w[1]));
    // Undefined Sharpe ratios sort after every defined one
    let first_none = sharpes.iter().position(Option::is_none).unwrap_or(sharpes.len());
    assert!(sharpes[first_none..].iter().all(Option::is_none));
}
