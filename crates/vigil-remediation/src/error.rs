//! Remediation workflow errors.

use thiserror::Error;

use vigil_core::{CaseId, ViolationId};

use crate::case::CaseStatus;

/// Errors from case creation and lifecycle operations.
#[derive(Debug, Error)]
pub enum RemediationError {
    /// The requested case does not exist.
    #[error("case not found: {0}")]
    CaseNotFound(CaseId),

    /// A case already exists for this violation.
    #[error("violation {violation_id} already has case {existing}")]
    DuplicateCase {
        violation_id: ViolationId,
        existing: CaseId,
    },

    /// The requested status change is not a valid transition.
    #[error("invalid case transition: {from} -> {to}")]
    InvalidTransition { from: CaseStatus, to: CaseStatus },
}
