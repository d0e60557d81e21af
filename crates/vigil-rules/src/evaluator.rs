//! # Rule Evaluation
//!
//! Evaluates one rule's condition against a batch of records and emits raw
//! match candidates. Evaluation is total: a missing field, a value of the
//! wrong shape, or an unparseable pattern produces zero matches for the
//! affected records, never an error, so one bad rule cannot abort the scan
//! that runs it.

use regex::RegexBuilder;

use vigil_core::Record;

use crate::rule::{CompareOp, Rule, RuleCondition};

/// One record flagged by a rule, before scoring and persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    /// Index of the record within the evaluated batch.
    pub record_index: usize,
    /// Stable identity of the record, when the source supplies one.
    pub record_id: String,
    /// The field (or field pair) the condition matched on.
    pub field_name: String,
    /// String form of the offending value.
    pub field_value: String,
    /// Generated explanation of why the record violates the rule.
    pub explanation: String,
}

/// Evaluates structured rule conditions over record batches.
///
/// Stateless; one instance serves every rule. Evaluation of a single rule
/// over its batch is sequential and deterministic — records are visited in
/// batch order and matches preserve that order.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Create an evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Evaluate `rule` against `records`, returning the violating subset.
    ///
    /// The returned matches carry everything needed to build a violation:
    /// the offending field, its value, and a human-readable explanation.
    pub fn evaluate(&self, rule: &Rule, records: &[Record]) -> Vec<RuleMatch> {
        match &rule.condition {
            RuleCondition::Threshold {
                field,
                operator,
                value,
            } => self.check_threshold(records, field, *operator, *value),
            RuleCondition::Pattern { field, pattern } => {
                self.check_pattern(rule, records, field, pattern)
            }
            RuleCondition::Comparison {
                field1,
                field2,
                operator,
            } => self.check_comparison(records, field1, field2, *operator),
            // Permissive fallback: unrecognized condition kinds match nothing.
            RuleCondition::Unrecognized => {
                tracing::debug!(rule_id = %rule.rule_id, "unrecognized condition kind, zero matches");
                Vec::new()
            }
        }
    }

    fn check_threshold(
        &self,
        records: &[Record],
        field: &str,
        operator: CompareOp,
        threshold: f64,
    ) -> Vec<RuleMatch> {
        let mut matches = Vec::new();
        for (index, record) in records.iter().enumerate() {
            // Missing or non-numeric fields never match.
            let Some(actual) = record.number(field) else {
                continue;
            };
            if operator.holds(actual, threshold) {
                matches.push(RuleMatch {
                    record_index: index,
                    record_id: record.record_id(),
                    field_name: field.to_string(),
                    field_value: format_number(actual),
                    explanation: format!(
                        "Value {} violates threshold {} {}",
                        format_number(actual),
                        operator,
                        format_number(threshold)
                    ),
                });
            }
        }
        matches
    }

    fn check_pattern(
        &self,
        rule: &Rule,
        records: &[Record],
        field: &str,
        pattern: &str,
    ) -> Vec<RuleMatch> {
        let regex = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => regex,
            Err(err) => {
                tracing::warn!(
                    rule_id = %rule.rule_id,
                    pattern,
                    error = %err,
                    "invalid pattern, rule produces zero matches"
                );
                return Vec::new();
            }
        };

        let mut matches = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let Some(text) = record.display_value(field) else {
                continue;
            };
            if regex.is_match(&text) {
                matches.push(RuleMatch {
                    record_index: index,
                    record_id: record.record_id(),
                    field_name: field.to_string(),
                    field_value: text,
                    explanation: format!("Value matches prohibited pattern: {pattern}"),
                });
            }
        }
        matches
    }

    fn check_comparison(
        &self,
        records: &[Record],
        field1: &str,
        field2: &str,
        operator: CompareOp,
    ) -> Vec<RuleMatch> {
        let mut matches = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let (Some(lhs), Some(rhs)) = (record.number(field1), record.number(field2)) else {
                continue;
            };
            if operator.holds(lhs, rhs) {
                matches.push(RuleMatch {
                    record_index: index,
                    record_id: record.record_id(),
                    field_name: format!("{field1} vs {field2}"),
                    field_value: format!("{} vs {}", format_number(lhs), format_number(rhs)),
                    explanation: format!(
                        "{field1} ({}) {operator} {field2} ({})",
                        format_number(lhs),
                        format_number(rhs)
                    ),
                });
            }
        }
        matches
    }
}

/// Format a number without a trailing `.0` for whole values, matching the
/// string forms produced at rule-ingestion time.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
