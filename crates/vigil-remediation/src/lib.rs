//! # vigil-remediation — Case Workflow
//!
//! Everything that happens after a violation is stored:
//!
//! - **Case model** ([`case`]): The remediation case aggregate with its
//!   validated status state machine and priority tiers.
//!
//! - **Store** ([`store`]): Concurrent in-memory case storage enforcing one
//!   case per violation.
//!
//! - **Directory** ([`directory`]): The assignable-user seam, with role
//!   eligibility per priority tier.
//!
//! - **Engine** ([`engine`]): Case creation with SLA due dates, checklist
//!   generation, least-loaded auto-assignment, reviewer transitions, and
//!   the idempotent overdue/escalation sweep.

pub mod case;
pub mod directory;
pub mod engine;
pub mod error;
pub mod store;

pub use case::{CaseComment, CasePriority, CaseStatus, RemediationCase};
pub use directory::{
    eligible_roles, AssigneeCandidate, DirectoryUser, StaticUserDirectory, UserDirectory, UserRole,
};
pub use engine::{CaseStatistics, EscalationSweep, RemediationEngine};
pub use error::RemediationError;
pub use store::InMemoryCaseStore;
