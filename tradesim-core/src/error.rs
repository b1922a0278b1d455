//! Engine error taxonomy.
//!
//! Every variant here is fatal to a run. Order problems a strategy can cause
//! by itself (pyramiding, selling while flat, overdrawing cash) are not errors;
//! they are `OrderRejection`s recorded in the run diagnostics.

use thiserror::Error;

/// Fatal engine errors. Each carries enough context to locate the problem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid bar data at index {index}: {reason}")]
    InvalidBarData { index: usize, reason: String },

    #[error("no data available for symbol '{symbol}'")]
    NoDataAvailable { symbol: String },

    #[error("bar index {index} out of range (series length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid fill at bar {bar_index}: price {price} outside [{low}, {high}]")]
    InvalidFill {
        bar_index: usize,
        price: f64,
        low: f64,
        high: f64,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("simulation is {state}, cannot {action}")]
    InvalidState {
        state: &'static str,
        action: &'static str,
    },
}

impl EngineError {
    /// Short machine-readable code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidBarData { .. } => "INVALID_BAR_DATA",
            EngineError::NoDataAvailable { .. } => "NO_DATA",
            EngineError::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            EngineError::InvalidFill { .. } => "INVALID_FILL",
            EngineError::InvalidParameter(_) => "INVALID_PARAMETER",
            EngineError::InvalidState { .. } => "INVALID_STATE",
        }
    }
}
