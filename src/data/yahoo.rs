//! Yahoo Finance chart API client
//!
//! Fetches historical OHLCV bars for a ticker and interval.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::MarketDataSource;
use crate::error::{Result, TradeError};
use crate::types::{Bar, Interval};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) trade-ai/0.1";

/// Chart API client
#[derive(Clone)]
pub struct YahooClient {
    http: Client,
    base_url: String,
    auto_adjust: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

impl YahooClient {
    pub fn new(base_url: &str, timeout: Duration, auto_adjust: bool) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auto_adjust,
        })
    }
}

#[async_trait]
impl MarketDataSource for YahooClient {
    async fn fetch_bars(
        &self,
        ticker: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        debug!("GET {} [{} {} → {}]", url, interval, start, end);

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", interval.provider_code().to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        // Error payloads usually come back as chart JSON with a non-2xx status
        match serde_json::from_str::<ChartResponse>(&body) {
            Ok(parsed) if status.is_success() || parsed.chart.error.is_some() => {
                bars_from_chart(parsed, self.auto_adjust)
            }
            Ok(_) => Err(TradeError::Api(format!("{} returned {}", ticker, status))),
            Err(_) if !status.is_success() => {
                Err(TradeError::Api(format!("{} returned {}", ticker, status)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Convert a chart payload into bars, skipping incomplete rows
pub(crate) fn bars_from_chart(resp: ChartResponse, auto_adjust: bool) -> Result<Vec<Bar>> {
    if let Some(err) = resp.chart.error {
        return Err(TradeError::Api(format!(
            "{}: {}",
            err.code,
            err.description.unwrap_or_default()
        )));
    }

    let Some(result) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .unwrap_or_default()
        .adjclose;

    let cell = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let (Some(timestamp), Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            DateTime::from_timestamp(ts, 0),
            cell(&quote.open, i),
            cell(&quote.high, i),
            cell(&quote.low, i),
            cell(&quote.close, i),
            cell(&quote.volume, i),
        ) else {
            continue;
        };

        let mut bar = Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        };
        if auto_adjust {
            if let Some(adj) = cell(&adjclose, i) {
                if close != 0.0 {
                    let ratio = adj / close;
                    bar.open *= ratio;
                    bar.high *= ratio;
                    bar.low *= ratio;
                    bar.close = adj;
                }
            }
        }
        bars.push(bar);
    }

    Ok(bars)
}
