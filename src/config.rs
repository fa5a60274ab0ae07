//! Configuration loading
//!
//! Sources, lowest priority first: built-in defaults, an optional TOML file,
//! then `TRADE_AI__SECTION__KEY` environment variables (a `.env` file is
//! loaded into the environment beforehand).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Chart API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_data_dir")]
    pub output_dir: String,
    /// Default start date (YYYY-MM-DD)
    #[serde(default = "default_start")]
    pub start: String,
    /// Max downloads in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Rescale OHLC by the adjusted close
    #[serde(default = "default_true")]
    pub auto_adjust: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            output_dir: default_data_dir(),
            start: default_start(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            auto_adjust: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    #[serde(default = "default_features_dir")]
    pub output_dir: String,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,
    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,
    #[serde(default = "default_bollinger_period")]
    pub bollinger_period: usize,
    #[serde(default = "default_bollinger_std_factor")]
    pub bollinger_std_factor: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            output_dir: default_features_dir(),
            rsi_period: default_rsi_period(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            bollinger_period: default_bollinger_period(),
            bollinger_std_factor: default_bollinger_std_factor(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Starting capital
    #[serde(default = "default_capital")]
    pub capital: f64,
    /// Equity curve CSV path
    #[serde(default = "default_equity_output")]
    pub output: String,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            capital: default_capital(),
            output: default_equity_output(),
        }
    }
}

fn default_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}
fn default_data_dir() -> String {
    "data".to_string()
}
fn default_start() -> String {
    "2015-01-01".to_string()
}
fn default_concurrency() -> usize {
    4
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_features_dir() -> String {
    "features".to_string()
}
fn default_rsi_period() -> usize {
    14
}
fn default_macd_fast() -> usize {
    12
}
fn default_macd_slow() -> usize {
    26
}
fn default_macd_signal() -> usize {
    9
}
fn default_bollinger_period() -> usize {
    20
}
fn default_bollinger_std_factor() -> f64 {
    2.0
}
fn default_capital() -> f64 {
    1.0
}
fn default_equity_output() -> String {
    "equity.csv".to_string()
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = expand_path(path);
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("TRADE_AI")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
