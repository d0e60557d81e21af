//! # Violation Aggregate
//!
//! The persisted outcome of one rule matching one record. A violation is
//! immutable once scored; only its review status moves, and the
//! one-case-per-violation invariant is enforced by the remediation store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{PolicyId, RuleId, TenantId, ViolationId};
use crate::severity::Severity;

/// Review lifecycle of a violation.
///
/// Transitions are performed by human reviewers outside this core; the core
/// only creates violations in `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationStatus {
    /// Detected, awaiting review.
    Pending,
    /// A reviewer has looked at the violation.
    Reviewed,
    /// The underlying issue was remediated.
    Resolved,
    /// The match was judged spurious.
    FalsePositive,
}

impl ViolationStatus {
    /// The canonical string label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Resolved => "resolved",
            Self::FalsePositive => "false_positive",
        }
    }
}

impl std::fmt::Display for ViolationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One detected violation: a rule, the record it flagged, and the scores
/// attached at detection time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Unique identifier.
    pub violation_id: ViolationId,
    /// The rule that produced this violation.
    pub rule_id: RuleId,
    /// The policy version the rule belongs to.
    pub policy_id: PolicyId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Severity inherited from the rule.
    pub severity: Severity,
    /// Stable identity of the flagged record, when the source supplies one.
    pub record_id: String,
    /// The field (or field pair) the rule matched on.
    pub field_name: String,
    /// String form of the offending value.
    pub field_value: String,
    /// Human-readable explanation generated at evaluation time.
    pub explanation: String,
    /// Statistical outlier score of the flagged record, in [0, 1].
    pub anomaly_score: f64,
    /// Rule-based score component (the severity tier score).
    pub rule_severity_score: f64,
    /// Weighted blend of severity and anomaly, in [0, 100].
    pub final_risk_score: f64,
    /// Review status.
    pub status: ViolationStatus,
    /// Detection timestamp.
    pub detected_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_match_wire_form() {
        assert_eq!(ViolationStatus::FalsePositive.as_str(), "false_positive");
        let json = serde_json::to_string(&ViolationStatus::FalsePositive).unwrap();
        assert_eq!(json, "\"false_positive\"");
    }

    #[test]
    fn round_trips_through_json() {
        let violation = Violation {
            violation_id: ViolationId::new(),
            rule_id: RuleId::new(),
            policy_id: PolicyId::new(),
            tenant_id: TenantId::new(),
            severity: Severity::High,
            record_id: "tx-17".to_string(),
            field_name: "amount".to_string(),
            field_value: "125000".to_string(),
            explanation: "Value 125000 violates threshold > 10000".to_string(),
            anomaly_score: 0.81,
            rule_severity_score: 75.0,
            final_risk_score: 76.8,
            status: ViolationStatus::Pending,
            detected_at: Utc::now(),
        };
        let json = serde_json::to_string(&violation).unwrap();
        let back: Violation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.violation_id, violation.violation_id);
        assert_eq!(back.final_risk_score, violation.final_risk_score);
        assert_eq!(back.status, ViolationStatus::Pending);
    }
}
