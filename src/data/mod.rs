//! Historical market data download
//!
//! Pulls OHLCV bars for every supported interval, splitting requests into
//! windows where the provider limits lookback, and stores one CSV per
//! ticker and interval.

pub mod storage;
pub mod yahoo;


pub use storage::{read_bars, write_bars};
pub use yahoo::YahooClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::types::{Bar, Interval};

/// Source of historical bars
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch bars in `[start, end)`
    async fn fetch_bars(
        &self,
        ticker: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>>;
}

/// Result of one (ticker, interval) download job
#[derive(Debug)]
pub struct FetchOutcome {
    pub ticker: String,
    pub interval: Interval,
    /// Written file, `None` when the provider had no data
    pub result: Result<Option<PathBuf>>,
}

/// Downloads bars and saves them as CSV
pub struct DataFetcher<S> {
    source: S,
    output_dir: PathBuf,
}

impl<S: MarketDataSource> DataFetcher<S> {
    pub fn new(source: S, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Fetch a full range, chunking by the interval's lookback limit
    pub async fn fetch_interval(
        &self,
        ticker: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        let Some(max_delta) = interval.max_lookback() else {
            return self.source.fetch_bars(ticker, interval, start, end).await;
        };

        let mut chunks = Vec::new();
        let mut window_start = start;
        while window_start < end {
            let window_end = (window_start + max_delta).min(end);
            info!(
                "  Downloading {} {}: {} → {}",
                ticker,
                interval,
                window_start.date_naive(),
                window_end.date_naive()
            );
            match self
                .source
                .fetch_bars(ticker, interval, window_start, window_end)
                .await
            {
                Ok(bars) if !bars.is_empty() => chunks.push(bars),
                Ok(_) => {}
                Err(e) => warn!(
                    "   ‼ Error: {}–{}: {}",
                    window_start.date_naive(),
                    window_end.date_naive(),
                    e
                ),
            }
            window_start = window_end;
        }

        Ok(merge_chunks(chunks))
    }

    /// Fetch one ticker/interval and write `{ticker}_{interval}.csv`
    pub async fn fetch_and_save(
        &self,
        ticker: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<PathBuf>> {
        info!(
            "→ {} @ {} from {} to {}",
            ticker,
            interval,
            start.date_naive(),
            end.date_naive()
        );
        let bars = self.fetch_interval(ticker, interval, start, end).await?;
        if bars.is_empty() {
            warn!("No data for {} at {}", ticker, interval);
            return Ok(None);
        }

        let path = self
            .output_dir
            .join(format!("{}_{}.csv", ticker, interval.key()));
        write_bars(&path, &bars)?;
        info!("Saved {} bars to {}", bars.len(), path.display());
        Ok(Some(path))
    }

    /// Run every ticker × interval job with bounded concurrency
    pub async fn fetch_all(
        &self,
        tickers: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        concurrency: usize,
    ) -> Vec<FetchOutcome> {
        let jobs: Vec<(String, Interval)> = tickers
            .iter()
            .flat_map(|t| Interval::ALL.into_iter().map(move |i| (t.clone(), i)))
            .collect();

        stream::iter(jobs)
            .map(move |(ticker, interval)| async move {
                let result = self.fetch_and_save(&ticker, interval, start, end).await;
                if let Err(e) = &result {
                    error!("{} @ {} failed: {}", ticker, interval, e);
                }
                FetchOutcome {
                    ticker,
                    interval,
                    result,
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }
}

/// Concatenate chunks in order, keeping the first bar per timestamp
fn merge_chunks(chunks: Vec<Vec<Bar>>) -> Vec<Bar> {
    let mut seen = HashSet::new();
    chunks
        .into_iter()
        .flatten()
        .filter(|bar| seen.insert(bar.timestamp))
        .collect()
}
