//! # Engine Constants
//!
//! The reference behavior treats its rate constants (anomaly flag threshold,
//! score weights, SLA table, contamination ratio, impact multipliers) as
//! fixed values scattered through the code. They are lifted here into one
//! named structure passed into each component at construction, so tests can
//! vary them without changing observed default behavior.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::severity::Severity;

/// Tunable constants for the compliance core.
///
/// [`EngineConfig::default`] reproduces the reference behavior exactly; any
/// deviation is a caller's deliberate choice and is validated by
/// [`EngineConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Anomaly score above which a record is flagged anomalous.
    pub anomaly_flag_threshold: f64,
    /// Weight of the rule-severity component in the final risk score.
    pub severity_weight: f64,
    /// Weight of the anomaly component in the final risk score.
    pub anomaly_weight: f64,
    /// Fraction of training data the outlier model expects to be anomalous.
    pub contamination: f64,
    /// Minimum records required to train an anomaly model.
    pub min_training_records: usize,
    /// Number of trees in the isolation forest.
    pub forest_trees: usize,
    /// Per-tree subsample ceiling.
    pub forest_max_samples: usize,
    /// RNG seed for deterministic forest training.
    pub forest_seed: u64,
    /// SLA hours until a critical-priority case is due.
    pub sla_hours_critical: i64,
    /// SLA hours until a high-priority case is due.
    pub sla_hours_high: i64,
    /// SLA hours until a medium-priority case is due.
    pub sla_hours_medium: i64,
    /// SLA hours until a low-priority case is due.
    pub sla_hours_low: i64,
    /// Hours past due before an overdue case escalates to an admin.
    pub escalation_grace_hours: i64,
    /// Volume multiplier for a rule that became stricter.
    pub stricter_multiplier: f64,
    /// Volume multiplier for a rule that became more relaxed.
    pub relaxed_multiplier: f64,
    /// Estimated violations for a new rule when the tenant has no active
    /// rules to average over.
    pub default_new_rule_violations: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            anomaly_flag_threshold: 0.75,
            severity_weight: 0.7,
            anomaly_weight: 0.3,
            contamination: 0.10,
            min_training_records: 100,
            forest_trees: 100,
            forest_max_samples: 256,
            forest_seed: 42,
            sla_hours_critical: 24,
            sla_hours_high: 72,
            sla_hours_medium: 168,
            sla_hours_low: 336,
            escalation_grace_hours: 48,
            stricter_multiplier: 1.3,
            relaxed_multiplier: 0.7,
            default_new_rule_violations: 10,
        }
    }
}

impl EngineConfig {
    /// SLA window in hours for a violation of the given severity.
    pub fn sla_hours(&self, severity: Severity) -> i64 {
        match severity {
            Severity::Critical => self.sla_hours_critical,
            Severity::High => self.sla_hours_high,
            Severity::Medium => self.sla_hours_medium,
            Severity::Low => self.sla_hours_low,
        }
    }

    /// Check the configuration for values that would corrupt scoring.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the score weights do not sum to 1.0,
    /// when a ratio falls outside [0, 1], or when a count/window is zero or
    /// negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let weight_sum = self.severity_weight + self.anomaly_weight;
        if (weight_sum - 1.0).abs() > 1e-9 {
            return Err(ValidationError::WeightSum(weight_sum));
        }
        for (name, value) in [
            ("anomaly_flag_threshold", self.anomaly_flag_threshold),
            ("contamination", self.contamination),
        ] {
            if !(0.0..=1.0).contains(&value) || value.is_nan() {
                return Err(ValidationError::RatioOutOfRange {
                    field: name,
                    value,
                });
            }
        }
        for (name, value) in [
            ("sla_hours_critical", self.sla_hours_critical),
            ("sla_hours_high", self.sla_hours_high),
            ("sla_hours_medium", self.sla_hours_medium),
            ("sla_hours_low", self.sla_hours_low),
            ("escalation_grace_hours", self.escalation_grace_hours),
        ] {
            if value <= 0 {
                return Err(ValidationError::NonPositiveWindow {
                    field: name,
                    value,
                });
            }
        }
        if self.min_training_records == 0 || self.forest_trees == 0 || self.forest_max_samples == 0
        {
            return Err(ValidationError::ZeroCount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reproduces_reference_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.anomaly_flag_threshold, 0.75);
        assert_eq!(cfg.severity_weight, 0.7);
        assert_eq!(cfg.anomaly_weight, 0.3);
        assert_eq!(cfg.contamination, 0.10);
        assert_eq!(cfg.min_training_records, 100);
        assert_eq!(cfg.sla_hours(Severity::Critical), 24);
        assert_eq!(cfg.sla_hours(Severity::High), 72);
        assert_eq!(cfg.sla_hours(Severity::Medium), 168);
        assert_eq!(cfg.sla_hours(Severity::Low), 336);
        assert_eq!(cfg.escalation_grace_hours, 48);
        cfg.validate().unwrap();
    }

    #[test]
    fn validate_rejects_skewed_weights() {
        let cfg = EngineConfig {
            severity_weight: 0.7,
            anomaly_weight: 0.5,
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ValidationError::WeightSum(_))
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let cfg = EngineConfig {
            anomaly_flag_threshold: 1.5,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_sla() {
        let cfg = EngineConfig {
            sla_hours_high: 0,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
