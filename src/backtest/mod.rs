//! Single-strategy backtester
//!
//! Positions follow the previous bar's signal: the return of bar `t` is
//! `signal[t-1] * (close[t] / close[t-1] - 1)`. The equity curve compounds
//! those returns from the starting capital.

#[cfg(test)]
mod tests;

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, info};

use crate::data::storage::ensure_parent;
use crate::error::{Result, TradeError};
use crate::strategy::{Strategy, StrategyParams};
use crate::types::{Bar, Signal};

const TRADING_DAYS: f64 = 252.0;
const TRADING_HOURS_PER_DAY: f64 = 6.5;

/// Bar spacing inferred from timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarFrequency {
    Daily,
    BusinessDaily,
    Hourly,
    Minute,
    Weekly,
    Unknown,
}

impl BarFrequency {
    /// Infer a regular frequency; gaps that are not uniform give `Unknown`
    pub fn infer(timestamps: &[DateTime<Utc>]) -> Self {
        if timestamps.len() < 3 {
            return BarFrequency::Unknown;
        }

        let gaps: Vec<Duration> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
        let first = gaps[0];

        if gaps.iter().all(|g| *g == first) {
            let secs = first.num_seconds();
            return match secs {
                86_400 => BarFrequency::Daily,
                604_800 => BarFrequency::Weekly,
                3_600 => BarFrequency::Hourly,
                60 => BarFrequency::Minute,
                _ => BarFrequency::Unknown,
            };
        }

        if is_business_daily(timestamps) {
            return BarFrequency::BusinessDaily;
        }

        BarFrequency::Unknown
    }

    /// Periods per year used to annualize returns
    pub fn annualization_factor(self) -> f64 {
        match self {
            BarFrequency::Daily | BarFrequency::BusinessDaily => TRADING_DAYS,
            BarFrequency::Hourly => TRADING_DAYS * TRADING_HOURS_PER_DAY,
            BarFrequency::Minute => TRADING_DAYS * TRADING_HOURS_PER_DAY * 4.0,
            BarFrequency::Weekly | BarFrequency::Unknown => TRADING_DAYS,
        }
    }
}

fn is_business_daily(timestamps: &[DateTime<Utc>]) -> bool {
    let is_weekend = |ts: &DateTime<Utc>| matches!(ts.weekday(), Weekday::Sat | Weekday::Sun);
    if timestamps.iter().any(is_weekend) {
        return false;
    }

    timestamps.windows(2).all(|w| {
        let expected = if w[0].weekday() == Weekday::Fri { 3 } else { 1 };
        w[1] - w[0] == Duration::days(expected)
    })
}

/// Performance metrics and the series behind them
#[derive(Debug, Clone, Serialize)]
pub struct Performance {
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    /// `None` when returns have zero variance
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: f64,
    pub frequency: BarFrequency,
    pub equity: Vec<f64>,
    pub returns: Vec<f64>,
}

/// Compute metrics for a signal series applied to bar closes
pub fn compute_performance(bars: &[Bar], signals: &[Signal], capital: f64) -> Result<Performance> {
    if bars.is_empty() {
        return Err(TradeError::InvalidData("no bars to backtest".to_string()));
    }
    if bars.len() != signals.len() {
        return Err(TradeError::InvalidData(format!(
            "{} bars but {} signals",
            bars.len(),
            signals.len()
        )));
    }
    if !(capital > 0.0) {
        return Err(TradeError::InvalidData(format!(
            "capital must be positive, got {}",
            capital
        )));
    }

    let mut returns = Vec::with_capacity(bars.len());
    returns.push(0.0);
    for t in 1..bars.len() {
        let prev = bars[t - 1].close;
        let price_ret = if prev != 0.0 {
            bars[t].close / prev - 1.0
        } else {
            0.0
        };
        returns.push(signals[t - 1].value() * price_ret);
    }

    let mut equity = Vec::with_capacity(returns.len());
    let mut value = capital;
    for r in &returns {
        value *= 1.0 + r;
        equity.push(value);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let std = if returns.len() > 1 {
        (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };

    let timestamps: Vec<DateTime<Utc>> = bars.iter().map(|b| b.timestamp).collect();
    let frequency = BarFrequency::infer(&timestamps);
    let factor = frequency.annualization_factor();
    debug!("Inferred {:?} bars, annualization factor {}", frequency, factor);

    let mut running_max = f64::MIN;
    let mut max_drawdown = 0.0_f64;
    for &e in &equity {
        running_max = running_max.max(e);
        max_drawdown = max_drawdown.min(e / running_max - 1.0);
    }

    let last = equity.last().copied().unwrap_or(capital);

    Ok(Performance {
        total_return: last / capital - 1.0,
        annual_return: (1.0 + mean).powf(factor) - 1.0,
        annual_volatility: std * factor.sqrt(),
        sharpe_ratio: (std != 0.0).then(|| mean / std * factor.sqrt()),
        max_drawdown,
        frequency,
        equity,
        returns,
    })
}

/// One point of the equity curve
#[derive(Debug, Clone, Serialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Backtest outcome for one strategy instance
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub strategy: String,
    pub params: StrategyParams,
    pub capital: f64,
    pub bars: usize,
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: f64,
    pub frequency: BarFrequency,
    #[serde(skip)]
    pub equity: Vec<EquityPoint>,
}

impl BacktestReport {
    pub fn final_equity(&self) -> f64 {
        self.equity.last().map(|p| p.equity).unwrap_or(self.capital)
    }

    /// Human-readable `k=v` list of the strategy parameters
    pub fn params_label(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Generate signals with `strategy` and evaluate them
pub fn run_backtest(bars: &[Bar], strategy: &dyn Strategy, capital: f64) -> Result<BacktestReport> {
    let signals = strategy.generate_signals(bars);
    let perf = compute_performance(bars, &signals, capital)?;

    let equity = bars
        .iter()
        .zip(&perf.equity)
        .map(|(bar, &equity)| EquityPoint {
            timestamp: bar.timestamp,
            equity,
        })
        .collect();

    let report = BacktestReport {
        strategy: strategy.name().to_string(),
        params: strategy.params(),
        capital,
        bars: bars.len(),
        total_return: perf.total_return,
        annual_return: perf.annual_return,
        annual_volatility: perf.annual_volatility,
        sharpe_ratio: perf.sharpe_ratio,
        max_drawdown: perf.max_drawdown,
        frequency: perf.frequency,
        equity,
    };
    info!(
        "{} [{}]: total return {:.2}%",
        report.strategy,
        report.params_label(),
        report.total_return * 100.0
    );
    Ok(report)
}

/// Write the equity curve as `Date,equity`
pub fn write_equity_csv(report: &BacktestReport, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Date", "equity"])?;
    for point in &report.equity {
        writer.write_record([point.timestamp.to_rfc3339(), point.equity.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Backtest every strategy and rank by Sharpe ratio, undefined last
pub fn sweep(
    bars: &[Bar],
    strategies: &[Box<dyn Strategy>],
    capital: f64,
) -> Result<Vec<BacktestReport>> {
    let mut reports = strategies
        .iter()
        .map(|s| run_backtest(bars, s.as_ref(), capital))
        .collect::<Result<Vec<_>>>()?;

    reports.sort_by(|a, b| match (a.sharpe_ratio, b.sharpe_ratio) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    Ok(reports)
}
