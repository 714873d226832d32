use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Closing prices and dollar exposures. Wraps Decimal to prevent accidental f64 usage.
pub type Price = Decimal;

/// Returns expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Spread values measured in standard deviations
pub type ZScore = Decimal;

/// Envelope returned by every top-level run: the result plus the context
/// needed to interpret it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    /// Effective parameters, echoed back after defaults and overrides
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub bars_processed: usize,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Wrap a result, timing it from `started`.
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    bars_processed: usize,
    started: Instant,
    result: T,
) -> ComputationOutput<T> {
    let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or(serde_json::Value::Null),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            bars_processed,
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
