//! # Rules & Conditions
//!
//! A [`Rule`] belongs to one policy version and carries one structured
//! [`RuleCondition`]. Conditions are a tagged variant rather than a
//! free-form map, so evaluation is a single exhaustive match and the
//! unrecognized-kind fallback is an explicit, testable branch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vigil_core::{PolicyId, RuleId, Severity, TenantId};

/// Comparison operator used by threshold and comparison conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `>=`
    #[serde(rename = ">=")]
    Ge,
    /// `<=`
    #[serde(rename = "<=")]
    Le,
    /// `==`
    #[serde(rename = "==")]
    Eq,
}

impl CompareOp {
    /// The operator's source-text form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
        }
    }

    /// Apply the operator to two numeric operands.
    pub fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Gt => lhs > rhs,
            Self::Lt => lhs < rhs,
            Self::Ge => lhs >= rhs,
            Self::Le => lhs <= rhs,
            Self::Eq => lhs == rhs,
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The structured condition a rule evaluates.
///
/// `Unrecognized` is the deliberate permissive fallback: a condition kind
/// this core does not understand evaluates to zero matches, never an error,
/// so a malformed rule cannot abort a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleCondition {
    /// One field compared against a literal value.
    Threshold {
        /// Field to inspect.
        field: String,
        /// Comparison operator.
        operator: CompareOp,
        /// Literal to compare against.
        value: f64,
    },
    /// One field matched against a case-insensitive pattern.
    Pattern {
        /// Field to inspect.
        field: String,
        /// Regex (or plain substring) matched against the field's string
        /// form, case-insensitively.
        pattern: String,
    },
    /// Two fields of the same record compared against each other.
    Comparison {
        /// Left-hand field.
        field1: String,
        /// Right-hand field.
        field2: String,
        /// Comparison operator.
        operator: CompareOp,
    },
    /// Any condition kind this core does not evaluate.
    #[serde(other)]
    Unrecognized,
}

impl RuleCondition {
    /// The condition's kind, used for remediation templates and rule
    /// signatures.
    pub fn kind(&self) -> ConditionKind {
        match self {
            Self::Threshold { .. } => ConditionKind::Threshold,
            Self::Pattern { .. } => ConditionKind::Pattern,
            Self::Comparison { .. } => ConditionKind::Comparison,
            Self::Unrecognized => ConditionKind::Generic,
        }
    }

    /// The condition's primary field, when it has one.
    pub fn primary_field(&self) -> Option<&str> {
        match self {
            Self::Threshold { field, .. } | Self::Pattern { field, .. } => Some(field),
            Self::Comparison { field1, .. } => Some(field1),
            Self::Unrecognized => None,
        }
    }
}

/// The evaluation kind of a condition, detached from its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Field vs literal value.
    Threshold,
    /// Field vs pattern.
    Pattern,
    /// Field vs field.
    Comparison,
    /// Unrecognized or free-text rule.
    Generic,
}

impl ConditionKind {
    /// The canonical string label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::Pattern => "pattern",
            Self::Comparison => "comparison",
            Self::Generic => "generic",
        }
    }
}

impl std::fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One versioned compliance rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier.
    pub rule_id: RuleId,
    /// The policy version this rule belongs to.
    pub policy_id: PolicyId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The original rule text the condition was derived from.
    pub rule_text: String,
    /// Structured condition.
    pub condition: RuleCondition,
    /// Severity assigned to violations of this rule.
    pub severity: Severity,
    /// Whether the rule participates in scans. Superseded rules are
    /// deactivated, never deleted, to preserve violation history.
    pub active: bool,
    /// The rule this one supersedes, for version lineage. The chain is
    /// acyclic because a new rule can only point at a rule from an earlier
    /// policy version.
    pub previous_rule_id: Option<RuleId>,
    /// When the rule became effective.
    pub effective_from: DateTime<Utc>,
}

impl Rule {
    /// Convenience constructor for an active, unlinked rule.
    pub fn new(
        policy_id: PolicyId,
        tenant_id: TenantId,
        rule_text: impl Into<String>,
        condition: RuleCondition,
        severity: Severity,
    ) -> Self {
        Self {
            rule_id: RuleId::new(),
            policy_id,
            tenant_id,
            rule_text: rule_text.into(),
            condition,
            severity,
            active: true,
            previous_rule_id: None,
            effective_from: Utc::now(),
        }
    }
}
