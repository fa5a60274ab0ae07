//! OHLCV CSV files on disk
//!
//! Files carry a `Date` column followed by `Open,High,Low,Close,Volume`.
//! The reader is lenient: columns are found by header name, extra columns
//! are ignored, and rows whose date or prices fail to parse are dropped.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, TradeError};
use crate::types::Bar;

pub const BAR_COLUMNS: [&str; 5] = ["Open", "High", "Low", "Close", "Volume"];

/// Read bars from a CSV file, sorted by timestamp
pub fn read_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut columns = [0usize; 5];
    for (slot, name) in columns.iter_mut().zip(BAR_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| {
                TradeError::InvalidData(format!("{}: missing column '{}'", path.display(), name))
            })?;
    }

    let mut bars = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record?;
        let timestamp = record.get(0).and_then(parse_timestamp);
        let values: Option<Vec<f64>> = columns
            .iter()
            .map(|&idx| record.get(idx).and_then(|v| v.trim().parse::<f64>().ok()))
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();

        match (timestamp, values) {
            (Some(timestamp), Some(v)) => bars.push(Bar {
                timestamp,
                open: v[0],
                high: v[1],
                low: v[2],
                close: v[3],
                volume: v[4],
            }),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!("{}: dropped {} unparseable rows", path.display(), dropped);
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Write bars to a CSV file, creating parent directories
pub fn write_bars(path: &Path, bars: &[Bar]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Date", "Open", "High", "Low", "Close", "Volume"])?;
    for bar in bars {
        writer.write_record([
            bar.timestamp.to_rfc3339(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Parse the date column. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
