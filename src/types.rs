//! Core market types shared across the pipeline

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TradeError;

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Position signal emitted by a strategy for a single bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Signal {
    Sell,
    #[default]
    Hold,
    Buy,
}

impl Signal {
    /// Numeric exposure: -1, 0 or +1
    pub fn value(self) -> f64 {
        f64::from(i8::from(self))
    }
}

impl From<Signal> for i8 {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Sell => -1,
            Signal::Hold => 0,
            Signal::Buy => 1,
        }
    }
}

impl TryFrom<i8> for Signal {
    type Error = TradeError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Signal::Sell),
            0 => Ok(Signal::Hold),
            1 => Ok(Signal::Buy),
            other => Err(TradeError::InvalidData(format!("signal out of range: {}", other))),
        }
    }
}

/// Bar interval supported by the downloader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
}

impl Interval {
    pub const ALL: [Interval; 4] = [
        Interval::FifteenMinutes,
        Interval::OneHour,
        Interval::OneDay,
        Interval::OneWeek,
    ];

    /// Key used in file names and on the command line
    pub fn key(self) -> &'static str {
        match self {
            Interval::FifteenMinutes => "15m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::OneWeek => "1wk",
        }
    }

    /// Interval code understood by the chart API
    pub fn provider_code(self) -> &'static str {
        match self {
            Interval::FifteenMinutes => "15m",
            Interval::OneHour => "60m",
            Interval::OneDay => "1d",
            Interval::OneWeek => "1wk",
        }
    }

    /// Longest range the provider serves in one request, if limited
    pub fn max_lookback(self) -> Option<Duration> {
        match self {
            Interval::FifteenMinutes => Some(Duration::days(60)),
            Interval::OneHour => Some(Duration::days(730)),
            Interval::OneDay | Interval::OneWeek => None,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Interval {
    type Err = TradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .into_iter()
            .find(|i| i.key() == s)
            .ok_or_else(|| TradeError::InvalidData(format!("unknown interval: {}", s)))
    }
}
