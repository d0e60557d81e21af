//! Impact analysis errors.

use thiserror::Error;

use vigil_core::PolicyId;

/// Errors from policy impact analysis.
#[derive(Debug, Error)]
pub enum ImpactError {
    /// One of the compared policy versions does not exist.
    #[error("policy not found: {0}")]
    PolicyNotFound(PolicyId),
}
