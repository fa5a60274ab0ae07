//! Technical indicators over price series
//!
//! Every function returns one value per input element. `None` marks
//! positions where the indicator is not yet defined (warm-up windows,
//! or a 0/0 ratio).

/// Rolling simple moving average
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        out.push((i + 1 >= window).then(|| sum / window as f64));
    }
    out
}

/// Rolling sample standard deviation (n - 1 denominator)
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let variance =
                slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
            Some(variance.sqrt())
        })
        .collect()
}

/// Exponential moving average seeded with the first value
///
/// `alpha = 2 / (span + 1)`, recursive form without bias adjustment.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &value in values {
        let next = match prev {
            Some(p) => alpha * value + (1.0 - alpha) * p,
            None => value,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// Bias-adjusted exponential mean with a minimum observation count
///
/// Each output is the weighted mean of all observations so far, with
/// weights `(1 - alpha)^age`.
fn adjusted_ewm(values: &[f64], alpha: f64, min_periods: usize) -> Vec<Option<f64>> {
    let decay = 1.0 - alpha;
    let mut num = 0.0;
    let mut den = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            num = value + decay * num;
            den = 1.0 + decay * den;
            (i + 1 >= min_periods).then(|| num / den)
        })
        .collect()
}

/// Relative Strength Index with Wilder-style smoothing
pub fn rsi(close: &[f64], period: usize) -> Vec<Option<f64>> {
    if close.len() < 2 || period == 0 {
        return vec![None; close.len()];
    }

    let deltas: Vec<f64> = close.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = deltas.iter().map(|d| d.max(0.0)).collect();
    let losses: Vec<f64> = deltas.iter().map(|d| (-d).max(0.0)).collect();

    let alpha = 1.0 / period as f64;
    let avg_gain = adjusted_ewm(&gains, alpha, period);
    let avg_loss = adjusted_ewm(&losses, alpha, period);

    // First bar has no delta
    let mut out = Vec::with_capacity(close.len());
    out.push(None);
    out.extend(avg_gain.into_iter().zip(avg_loss).map(|(g, l)| match (g, l) {
        (Some(g), Some(l)) => rsi_from_averages(g, l),
        _ => None,
    }));
    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        return (avg_gain > 0.0).then_some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// MACD line, signal line and histogram
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(close: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = ema(close, fast);
    let slow_ema = ema(close, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal = ema(&line, signal);
    let histogram = line.iter().zip(&signal).map(|(l, s)| l - s).collect();

    Macd {
        line,
        signal,
        histogram,
    }
}

/// Bollinger middle, upper and lower bands
#[derive(Debug, Clone, PartialEq)]
pub struct Bollinger {
    pub middle: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

pub fn bollinger(close: &[f64], period: usize, std_factor: f64) -> Bollinger {
    let middle = sma(close, period);
    let std = rolling_std(close, period);

    let band = |sign: f64| -> Vec<Option<f64>> {
        middle
            .iter()
            .zip(&std)
            .map(|(m, s)| Some((*m)? + sign * std_factor * (*s)?))
            .collect()
    };
    let upper = band(1.0);
    let lower = band(-1.0);

    Bollinger {
        middle,
        upper,
        lower,
    }
}

/// On-Balance Volume
pub fn obv(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let mut total = 0.0;
    close
        .iter()
        .zip(volume)
        .enumerate()
        .map(|(i, (&c, &v))| {
            if i > 0 {
                let delta = c - close[i - 1];
                let direction = if delta > 0.0 {
                    1.0
                } else if delta < 0.0 {
                    -1.0
                } else {
                    0.0
                };
                total += direction * v;
            }
            total
        })
        .collect()
}
