use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PairsError {
    #[error("Degenerate regression: close_b is constant over the {lookback}-bar window ending {timestamp}")]
    DegenerateRegression {
        timestamp: NaiveDateTime,
        lookback: usize,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid thresholds (entry {entry}, exit {exit}): {reason}")]
    InvalidThreshold {
        entry: Decimal,
        exit: Decimal,
        reason: String,
    },

    #[error("Misaligned series in {context}: {reason}")]
    MisalignedSeries { context: String, reason: String },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Numeric overflow in {context}")]
    NumericOverflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PairsError {
    fn from(e: serde_json::Error) -> Self {
        PairsError::SerializationError(e.to_string())
    }
}
