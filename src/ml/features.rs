//! Feature engineering over OHLCV files
//!
//! Appends RSI, MACD, Bollinger and OBV columns to each bar and drops the
//! warm-up rows where any indicator is still undefined.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::indicators;
use crate::config::FeatureConfig;
use crate::data::storage::{ensure_parent, read_bars};
use crate::error::{Result, TradeError};
use crate::types::Bar;

/// Indicator parameters
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_std_factor: f64,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_std_factor: 2.0,
        }
    }
}

impl From<&FeatureConfig> for FeatureParams {
    fn from(config: &FeatureConfig) -> Self {
        Self {
            rsi_period: config.rsi_period,
            macd_fast: config.macd_fast,
            macd_slow: config.macd_slow,
            macd_signal: config.macd_signal,
            bollinger_period: config.bollinger_period,
            bollinger_std_factor: config.bollinger_std_factor,
        }
    }
}

/// A bar with every indicator defined
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub bar: Bar,
    pub rsi: f64,
    pub macd_line: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,
    pub bb_sma: f64,
    pub bb_upper: f64,
    pub bb_lower: f64,
    pub obv: f64,
}

pub struct FeatureEngineer {
    params: FeatureParams,
}

impl FeatureEngineer {
    pub fn new(params: FeatureParams) -> Self {
        Self { params }
    }

    pub fn with_defaults() -> Self {
        Self::new(FeatureParams::default())
    }

    pub fn params(&self) -> &FeatureParams {
        &self.params
    }

    /// Column names appended after `Date,Open,High,Low,Close,Volume`
    pub fn feature_columns(&self) -> Vec<String> {
        let p = &self.params;
        vec![
            format!("rsi_{}", p.rsi_period),
            "macd_line".to_string(),
            "macd_signal".to_string(),
            "macd_hist".to_string(),
            format!("bb_sma_{}", p.bollinger_period),
            format!("bb_upper_{}", p.bollinger_period),
            format!("bb_lower_{}", p.bollinger_period),
            "obv".to_string(),
        ]
    }

    /// Compute indicators and keep only fully-defined rows
    pub fn compute(&self, bars: &[Bar]) -> Vec<FeatureRow> {
        let p = &self.params;
        let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volume: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let rsi = indicators::rsi(&close, p.rsi_period);
        let macd = indicators::macd(&close, p.macd_fast, p.macd_slow, p.macd_signal);
        let bands = indicators::bollinger(&close, p.bollinger_period, p.bollinger_std_factor);
        let obv = indicators::obv(&close, &volume);

        bars.iter()
            .enumerate()
            .filter_map(|(i, bar)| {
                Some(FeatureRow {
                    bar: bar.clone(),
                    rsi: rsi[i]?,
                    macd_line: macd.line[i],
                    macd_signal: macd.signal[i],
                    macd_hist: macd.histogram[i],
                    bb_sma: bands.middle[i]?,
                    bb_upper: bands.upper[i]?,
                    bb_lower: bands.lower[i]?,
                    obv: obv[i],
                })
            })
            .collect()
    }

    /// Write feature rows as CSV
    pub fn write_rows(&self, path: &Path, rows: &[FeatureRow]) -> Result<()> {
        ensure_parent(path)?;
        let mut writer = csv::Writer::from_path(path)?;

        let mut header: Vec<String> = ["Date", "Open", "High", "Low", "Close", "Volume"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        header.extend(self.feature_columns());
        writer.write_record(&header)?;

        for row in rows {
            let b = &row.bar;
            let mut record = vec![b.timestamp.to_rfc3339()];
            record.extend(
                [
                    b.open,
                    b.high,
                    b.low,
                    b.close,
                    b.volume,
                    row.rsi,
                    row.macd_line,
                    row.macd_signal,
                    row.macd_hist,
                    row.bb_sma,
                    row.bb_upper,
                    row.bb_lower,
                    row.obv,
                ]
                .iter()
                .map(f64::to_string),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read one OHLCV file, compute features and write the result
    pub fn process_file(&self, input: &Path, output: &Path) -> Result<usize> {
        let bars = read_bars(input)?;
        if bars.is_empty() {
            return Err(TradeError::InvalidData(format!(
                "{}: no usable rows",
                input.display()
            )));
        }

        let rows = self.compute(&bars);
        self.write_rows(output, &rows)?;
        info!(
            "✔ Processed {} → {} ({} rows)",
            file_name(input),
            file_name(output),
            rows.len()
        );
        Ok(rows.len())
    }

    /// Process every `.csv` in a directory into `{stem}_features.csv`
    pub fn process_dir(&self, input_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut inputs: Vec<PathBuf> = fs::read_dir(input_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
            })
            .collect();
        inputs.sort();

        let mut written = Vec::new();
        for input in inputs {
            let Some(stem) = input.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let output = output_dir.join(format!("{}_features.csv", stem));
            match self.process_file(&input, &output) {
                Ok(_) => written.push(output),
                Err(e) => warn!("Skipping {}: {}", input.display(), e),
            }
        }
        Ok(written)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
