//! Rule identity across policy versions.
//!
//! Rule ids change on every re-parse, so two versions of the same logical
//! rule are matched by signature: condition kind, primary field, and the
//! first fifty characters of the rule text. Rules with equal signatures
//! are versions of each other; everything else is an add or a remove.

use serde::{Deserialize, Serialize};

use vigil_rules::{ConditionKind, Rule};

/// Number of leading rule-text characters that participate in identity.
const TEXT_PREFIX_CHARS: usize = 50;

/// Version-stable identity of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleSignature {
    /// Condition kind.
    pub kind: ConditionKind,
    /// Primary field the condition inspects, empty for generic rules.
    pub field: String,
    /// Leading characters of the rule text.
    pub text_prefix: String,
}

impl RuleSignature {
    /// Compute the signature of a rule.
    pub fn of(rule: &Rule) -> Self {
        Self {
            kind: rule.condition.kind(),
            field: rule.condition.primary_field().unwrap_or_default().to_string(),
            text_prefix: rule.rule_text.chars().take(TEXT_PREFIX_CHARS).collect(),
        }
    }
}
