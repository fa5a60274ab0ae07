//! Trade-AI research toolkit
//!
//! Building blocks for an AI-assisted stock trading workflow: download
//! market history, derive technical features, and evaluate strategies.
//!
//! ## Architecture
//!
//! ```text
//! Data (Yahoo chart API) → CSV → Features (RSI/MACD/Bollinger/OBV) → CSV
//!                                                                    ↓
//!                         Strategy Registry → Signals → Backtest → Report
//! ```

pub mod backtest;
pub mod config;
pub mod data;
pub mod error;
pub mod ml;
pub mod strategy;
pub mod types;

#[cfg(test)]
mod types_tests;
#[cfg(test)]
mod config_tests;
