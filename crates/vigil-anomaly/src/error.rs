//! # Anomaly Errors
//!
//! Errors from model persistence. These never cross the scoring boundary —
//! the scan path is fail-open — but the persistence helpers surface them so
//! failures can be logged with their cause.

use thiserror::Error;

/// Errors from reading or writing durable model state.
#[derive(Error, Debug)]
pub enum AnomalyError {
    /// Filesystem failure under the model directory.
    #[error("model storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model file was present but not decodable.
    #[error("model serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
