//! Error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TradeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Strategy '{name}' not found (available: {})", .available.join(", "))]
    StrategyNotFound { name: String, available: Vec<String> },

    #[error("Invalid parameter '{param}' for {strategy}: {reason}")]
    InvalidParam {
        strategy: String,
        param: String,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, TradeError>;
