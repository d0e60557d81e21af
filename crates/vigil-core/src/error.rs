//! # Validation Errors
//!
//! Structured errors for construction-time validation in `vigil-core`.

use thiserror::Error;

/// Errors from validating foundational values.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Score weights must sum to 1.0.
    #[error("severity and anomaly weights must sum to 1.0, got {0}")]
    WeightSum(f64),

    /// A ratio field left the unit interval.
    #[error("{field} must be within 0.0..=1.0, got {value}")]
    RatioOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A time window must be positive.
    #[error("{field} must be positive, got {value}")]
    NonPositiveWindow {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// A count field must be non-zero.
    #[error("training and forest counts must be non-zero")]
    ZeroCount,
}
