//! Trading strategy interface and registry
//!
//! Strategies turn a bar series into one [`Signal`] per bar. They are
//! registered by name with their accepted parameters, so a strategy can be
//! built from `key=value` pairs on the command line or expanded over a
//! parameter grid for sweeps.

pub mod ma_crossover;


pub use ma_crossover::MaCrossover;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{Result, TradeError};
use crate::types::{Bar, Signal};

/// A single strategy parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }
}

/// Integers first, then floats, then raw text
impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        if let Ok(v) = s.parse::<i64>() {
            return ParamValue::Int(v);
        }
        if let Ok(v) = s.parse::<f64>() {
            return ParamValue::Float(v);
        }
        ParamValue::Text(s.to_string())
    }
}

impl FromStr for ParamValue {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(ParamValue::from(s))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

pub type StrategyParams = BTreeMap<String, ParamValue>;

/// Parameter name → candidate values
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

/// Parse `key=value` pairs; entries without `=` are ignored
pub fn parse_params<S: AsRef<str>>(pairs: &[S]) -> StrategyParams {
    pairs
        .iter()
        .filter_map(|kv| kv.as_ref().split_once('='))
        .map(|(k, v)| (k.trim().to_string(), ParamValue::from(v.trim())))
        .collect()
}

/// Parse `key=v1,v2,...` pairs into a grid
pub fn parse_grid<S: AsRef<str>>(pairs: &[S]) -> ParamGrid {
    let mut grid = ParamGrid::new();
    for (k, values) in pairs.iter().filter_map(|kv| kv.as_ref().split_once('=')) {
        let entry = grid.entry(k.trim().to_string()).or_default();
        entry.extend(
            values
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ParamValue::from),
        );
    }
    grid
}

/// Base interface for any trading strategy
pub trait Strategy: Send + Sync {
    /// Unique strategy key, e.g. `ma_crossover`
    fn name(&self) -> &str;

    /// Current parameters, for logging and sweeps
    fn params(&self) -> StrategyParams;

    /// One signal per input bar
    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal>;
}

type Constructor = fn(&StrategyParams) -> Result<Box<dyn Strategy>>;

/// Registration entry for a strategy
#[derive(Clone)]
pub struct StrategyDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Parameter names the constructor accepts
    pub param_names: &'static [&'static str],
    build: Constructor,
}

impl StrategyDescriptor {
    pub fn new(
        name: &'static str,
        description: &'static str,
        param_names: &'static [&'static str],
        build: Constructor,
    ) -> Self {
        Self {
            name,
            description,
            param_names,
            build,
        }
    }

    /// Build with defaults overridden by `params`
    pub fn build(&self, params: &StrategyParams) -> Result<Box<dyn Strategy>> {
        if let Some(unknown) = params.keys().find(|k| !self.param_names.contains(&k.as_str())) {
            return Err(TradeError::InvalidParam {
                strategy: self.name.to_string(),
                param: unknown.clone(),
                reason: format!("accepted parameters: {}", self.param_names.join(", ")),
            });
        }
        (self.build)(params)
    }
}

/// Known strategies by name
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    entries: Vec<StrategyDescriptor>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in strategy
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(MaCrossover::descriptor());
        registry
    }

    /// Add a strategy, replacing any existing entry with the same name
    pub fn register(&mut self, descriptor: StrategyDescriptor) {
        self.entries.retain(|d| d.name != descriptor.name);
        self.entries.push(descriptor);
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|d| d.name.to_string()).collect()
    }

    pub fn descriptors(&self) -> &[StrategyDescriptor] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Result<&StrategyDescriptor> {
        self.entries
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| TradeError::StrategyNotFound {
                name: name.to_string(),
                available: self.names(),
            })
    }

    pub fn create(&self, name: &str, params: &StrategyParams) -> Result<Box<dyn Strategy>> {
        self.get(name)?.build(params)
    }

    /// Instantiate every strategy over the cartesian product of the grid
    /// values it accepts. Grid keys a strategy does not accept are ignored.
    pub fn instantiate_grid(&self, grid: &ParamGrid) -> Result<Vec<Box<dyn Strategy>>> {
        let mut instances = Vec::new();
        for descriptor in &self.entries {
            let axes: Vec<(&String, &Vec<ParamValue>)> = grid
                .iter()
                .filter(|(k, _)| descriptor.param_names.contains(&k.as_str()))
                .collect();

            let combos = cartesian_product(&axes);
            debug!("{}: {} parameter combinations", descriptor.name, combos.len());
            for params in combos {
                instances.push(descriptor.build(&params)?);
            }
        }
        Ok(instances)
    }
}

/// All combinations of the axes; no axes yields one empty combination
fn cartesian_product(axes: &[(&String, &Vec<ParamValue>)]) -> Vec<StrategyParams> {
    axes.iter()
        .fold(vec![StrategyParams::new()], |acc, (key, values)| {
            acc.iter()
                .flat_map(|partial| {
                    values.iter().map(move |value| {
                        let mut next = partial.clone();
                        next.insert((*key).clone(), value.clone());
                        next
                    })
                })
                .collect()
        })
}

/// Read an integer window parameter, falling back to `default`
pub(crate) fn window_param(
    strategy: &str,
    params: &StrategyParams,
    key: &str,
    default: usize,
) -> Result<usize> {
    let Some(value) = params.get(key) else {
        return Ok(default);
    };
    let invalid = |reason: &str| TradeError::InvalidParam {
        strategy: strategy.to_string(),
        param: key.to_string(),
        reason: format!("{} (got {})", reason, value),
    };
    let n = value.as_int().ok_or_else(|| invalid("expected an integer"))?;
    if n < 1 {
        return Err(invalid("must be at least 1"));
    }
    usize::try_from(n).map_err(|_| invalid("out of range"))
}
