//! Rule-set diffing between two policy versions.
//!
//! Rules are keyed by [`RuleSignature`]; a signature present in both sets
//! is the same logical rule, and its parameters are compared field by
//! field. Old-only signatures are removals, new-only signatures are
//! additions.

use serde::{Deserialize, Serialize};

use vigil_core::{RuleId, Severity};
use vigil_rules::{CompareOp, Rule, RuleCondition};

use crate::signature::RuleSignature;

/// Kind of rule change between two policy versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Rule exists only in the new version.
    New,
    /// Rule exists in both versions with different parameters.
    Modified,
    /// Rule exists only in the old version.
    Removed,
}

impl ChangeType {
    /// The canonical string label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a threshold change makes the rule catch more or fewer records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdDirection {
    /// The new threshold flags records the old one let through.
    Stricter,
    /// The new threshold lets through records the old one flagged.
    Relaxed,
}

/// Direction of a threshold change, accounting for the operator. For `>`
/// and `>=` a lower limit flags more records; for `<` and `<=` a higher
/// limit does. An equality threshold has no ordering, so its changes carry
/// no direction.
pub fn threshold_direction(
    operator: CompareOp,
    old_value: f64,
    new_value: f64,
) -> Option<ThresholdDirection> {
    if old_value == new_value {
        return None;
    }
    match operator {
        CompareOp::Gt | CompareOp::Ge => Some(if new_value < old_value {
            ThresholdDirection::Stricter
        } else {
            ThresholdDirection::Relaxed
        }),
        CompareOp::Lt | CompareOp::Le => Some(if new_value > old_value {
            ThresholdDirection::Stricter
        } else {
            ThresholdDirection::Relaxed
        }),
        CompareOp::Eq => None,
    }
}

/// One changed parameter of a modified rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FieldChange {
    /// The threshold literal moved.
    Threshold {
        old_value: f64,
        new_value: f64,
        /// Operator-aware direction, absent for equality thresholds.
        direction: Option<ThresholdDirection>,
    },
    /// The comparison operator changed.
    Operator {
        old_value: CompareOp,
        new_value: CompareOp,
    },
    /// The match pattern changed.
    Pattern {
        old_value: String,
        new_value: String,
    },
    /// The assigned severity changed.
    Severity {
        old_value: Severity,
        new_value: Severity,
    },
}

/// One detected rule change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleChange {
    /// Kind of change.
    pub change_type: ChangeType,
    /// The superseded rule, absent for additions.
    pub old_rule_id: Option<RuleId>,
    /// The superseding rule, absent for removals.
    pub new_rule_id: Option<RuleId>,
    /// Rule text, from the surviving side.
    pub rule_text: String,
    /// Severity, from the surviving side.
    pub severity: Severity,
    /// Changed parameters, populated for modifications only.
    pub changes: Vec<FieldChange>,
}

/// Diff two active rule sets. Modified entries carry both rule ids, which
/// is the lineage callers record as `previous_rule_id` on the new rule.
/// Output order follows the old set for modifications and removals, then
/// the new set for additions.
pub fn detect_rule_changes(old_rules: &[Rule], new_rules: &[Rule]) -> Vec<RuleChange> {
    let new_by_signature: Vec<(RuleSignature, &Rule)> = new_rules
        .iter()
        .map(|rule| (RuleSignature::of(rule), rule))
        .collect();
    let mut changes = Vec::new();

    for old_rule in old_rules {
        let signature = RuleSignature::of(old_rule);
        match new_by_signature.iter().find(|(s, _)| *s == signature) {
            Some((_, new_rule)) => {
                let field_changes = compare_rules(old_rule, new_rule);
                if !field_changes.is_empty() {
                    changes.push(RuleChange {
                        change_type: ChangeType::Modified,
                        old_rule_id: Some(old_rule.rule_id),
                        new_rule_id: Some(new_rule.rule_id),
                        rule_text: new_rule.rule_text.clone(),
                        severity: new_rule.severity,
                        changes: field_changes,
                    });
                }
            }
            None => {
                changes.push(RuleChange {
                    change_type: ChangeType::Removed,
                    old_rule_id: Some(old_rule.rule_id),
                    new_rule_id: None,
                    rule_text: old_rule.rule_text.clone(),
                    severity: old_rule.severity,
                    changes: Vec::new(),
                });
            }
        }
    }

    for (signature, new_rule) in &new_by_signature {
        let existed_before = old_rules
            .iter()
            .any(|old| RuleSignature::of(old) == *signature);
        if !existed_before {
            changes.push(RuleChange {
                change_type: ChangeType::New,
                old_rule_id: None,
                new_rule_id: Some(new_rule.rule_id),
                rule_text: new_rule.rule_text.clone(),
                severity: new_rule.severity,
                changes: Vec::new(),
            });
        }
    }
    changes
}

/// Compare the parameters of two same-signature rules.
fn compare_rules(old_rule: &Rule, new_rule: &Rule) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    match (&old_rule.condition, &new_rule.condition) {
        (
            RuleCondition::Threshold {
                operator: old_op,
                value: old_value,
                ..
            },
            RuleCondition::Threshold {
                operator: new_op,
                value: new_value,
                ..
            },
        ) => {
            if old_value != new_value {
                changes.push(FieldChange::Threshold {
                    old_value: *old_value,
                    new_value: *new_value,
                    direction: threshold_direction(*new_op, *old_value, *new_value),
                });
            }
            if old_op != new_op {
                changes.push(FieldChange::Operator {
                    old_value: *old_op,
                    new_value: *new_op,
                });
            }
        }
        (
            RuleCondition::Pattern {
                pattern: old_pattern,
                ..
            },
            RuleCondition::Pattern {
                pattern: new_pattern,
                ..
            },
        ) => {
            if old_pattern != new_pattern {
                changes.push(FieldChange::Pattern {
                    old_value: old_pattern.clone(),
                    new_value: new_pattern.clone(),
                });
            }
        }
        (
            RuleCondition::Comparison {
                operator: old_op, ..
            },
            RuleCondition::Comparison {
                operator: new_op, ..
            },
        ) => {
            if old_op != new_op {
                changes.push(FieldChange::Operator {
                    old_value: *old_op,
                    new_value: *new_op,
                });
            }
        }
        _ => {}
    }

    if old_rule.severity != new_rule.severity {
        changes.push(FieldChange::Severity {
            old_value: old_rule.severity,
            new_value: new_rule.severity,
        });
    }
    changes
}
