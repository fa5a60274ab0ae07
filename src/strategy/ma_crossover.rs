//! Moving-average crossover strategy

use super::{window_param, ParamValue, Strategy, StrategyDescriptor, StrategyParams};
use crate::error::Result;
use crate::ml::indicators::sma;
use crate::types::{Bar, Signal};

const NAME: &str = "ma_crossover";

/// Buy when the fast MA crosses above the slow MA, sell on the cross below
#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossover {
    pub fast: usize,
    pub slow: usize,
}

impl Default for MaCrossover {
    fn default() -> Self {
        Self { fast: 10, slow: 50 }
    }
}

impl MaCrossover {
    pub fn new(fast: usize, slow: usize) -> Self {
        Self { fast, slow }
    }

    pub fn from_params(params: &StrategyParams) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            fast: window_param(NAME, params, "fast", defaults.fast)?,
            slow: window_param(NAME, params, "slow", defaults.slow)?,
        })
    }

    pub fn descriptor() -> StrategyDescriptor {
        StrategyDescriptor::new(
            NAME,
            "Fast/slow simple moving average crossover on Close",
            &["fast", "slow"],
            build,
        )
    }
}

fn build(params: &StrategyParams) -> Result<Box<dyn Strategy>> {
    Ok(Box::new(MaCrossover::from_params(params)?))
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        NAME
    }

    fn params(&self) -> StrategyParams {
        StrategyParams::from([
            ("fast".to_string(), ParamValue::Int(self.fast as i64)),
            ("slow".to_string(), ParamValue::Int(self.slow as i64)),
        ])
    }

    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = sma(&closes, self.fast);
        let slow = sma(&closes, self.slow);

        (0..bars.len())
            .map(|i| {
                if i == 0 {
                    return Signal::Hold;
                }
                let (Some(pf), Some(ps), Some(f), Some(s)) =
                    (fast[i - 1], slow[i - 1], fast[i], slow[i])
                else {
                    return Signal::Hold;
                };

                if pf < ps && f >= s {
                    Signal::Buy
                } else if pf > ps && f <= s {
                    Signal::Sell
                } else {
                    Signal::Hold
                }
            })
            .collect()
    }
}
