//! # vigil-core — Foundational Types
//!
//! Shared building blocks for the Vigil compliance core:
//!
//! - **Identity** ([`identity`]): Domain-primitive newtypes for tenant,
//!   policy, rule, violation, case, and user identifiers.
//!
//! - **Severity** ([`severity`]): The four-tier violation severity with its
//!   scoring weights and rank ordering.
//!
//! - **Record** ([`record`]): A flat field→value mapping, the unit of input
//!   for rule evaluation and anomaly scoring.
//!
//! - **Violation** ([`violation`]): The persisted violation aggregate with
//!   its review-status lifecycle.
//!
//! - **Config** ([`config`]): The named constants structure (score weights,
//!   anomaly threshold, SLA table, contamination ratio) passed into each
//!   component at construction.
//!
//! - **Alert** ([`alert`]): The outbound notification seam. Delivery is a
//!   collaborator concern; the core only emits messages.

pub mod alert;
pub mod config;
pub mod error;
pub mod identity;
pub mod record;
pub mod severity;
pub mod violation;

pub use alert::{AlertChannel, AlertMessage, AlertRef, AlertSink, NoopAlertSink};
pub use config::EngineConfig;
pub use error::ValidationError;
pub use identity::{CaseId, PolicyId, RuleId, TenantId, UserId, ViolationId};
pub use record::Record;
pub use severity::Severity;
pub use violation::{Violation, ViolationStatus};
