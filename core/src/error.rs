use thiserror::Error;

use crate::types::SimDate;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: SimDate, end: SimDate },

    #[error("Enumeration '{name}' is empty")]
    EmptyEnumeration { name: &'static str },

    #[error("Product '{product}' has non-positive base price {price}")]
    InvalidBasePrice { product: String, price: f64 },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Detector '{detector}' failed: {reason}")]
    DetectorFailure { detector: &'static str, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type MarketResult<T> = Result<T, MarketError>;
