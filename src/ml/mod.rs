//! Technical feature engineering
//!
//! Provides the indicator math and the file pipeline that turns raw OHLCV
//! CSVs into feature CSVs:
//! - RSI with exponential smoothing
//! - MACD line, signal and histogram
//! - Bollinger bands
//! - On-Balance Volume

pub mod features;
pub mod indicators;


pub use features::{FeatureEngineer, FeatureParams, FeatureRow};
pub use indicators::{Bollinger, Macd};
