//! # vigil-impact — Policy Change Impact Analysis
//!
//! When a policy document is re-uploaded, its parsed rule set changes
//! under the tenant's feet. This crate measures that change before the
//! next scan runs:
//!
//! - **Signature** ([`signature`]): Version-stable rule identity for
//!   matching rules across policy versions.
//!
//! - **Change** ([`change`]): The rule-set diff (new / modified / removed)
//!   with per-parameter change records and operator-aware threshold
//!   direction.
//!
//! - **Analyzer** ([`analyzer`]): The comparison entry point, the
//!   [`PolicyStore`] seam it reads through, the heuristic volume
//!   estimates, and the per-policy change log.

pub mod analyzer;
pub mod change;
pub mod error;
pub mod signature;

pub use analyzer::{
    ImpactSummary, PolicyChangeRecord, PolicyImpactAnalyzer, PolicyImpactReport, PolicyStore,
    RiskDirection, RuleImpact,
};
pub use change::{
    detect_rule_changes, threshold_direction, ChangeType, FieldChange, RuleChange,
    ThresholdDirection,
};
pub use error::ImpactError;
pub use signature::RuleSignature;
