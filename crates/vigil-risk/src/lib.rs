//! # vigil-risk — Final Risk Scoring
//!
//! Combines a rule's severity tier with a record's anomaly score into the
//! single ranking number carried by every violation:
//!
//! ```text
//! final = clip(severity_score * 0.7 + anomaly_score * 100 * 0.3, 0, 100)
//! ```
//!
//! rounded to two decimal places. Pure and deterministic — the same
//! severity and anomaly score always reproduce the same stored value, so a
//! persisted violation can be audited by recomputation.

use vigil_core::{EngineConfig, Severity};

/// Severity score assigned when a free-text label is not one of the four
/// known tiers.
const UNRECOGNIZED_SEVERITY_SCORE: f64 = 50.0;

/// Deterministic severity/anomaly blender.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    config: EngineConfig,
}

impl RiskScorer {
    /// Create a scorer with the given weights.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Blend a severity tier with an anomaly score in [0, 1].
    pub fn combined_score(&self, severity: Severity, anomaly_score: f64) -> f64 {
        self.blend(severity.score(), anomaly_score)
    }

    /// Blend from a free-text severity label. Unrecognized labels score as
    /// the medium tier (50).
    pub fn combined_score_for_label(&self, severity_label: &str, anomaly_score: f64) -> f64 {
        let severity_score = Severity::from_label(severity_label)
            .map(|s| s.score())
            .unwrap_or(UNRECOGNIZED_SEVERITY_SCORE);
        self.blend(severity_score, anomaly_score)
    }

    fn blend(&self, severity_score: f64, anomaly_score: f64) -> f64 {
        let raw = severity_score * self.config.severity_weight
            + anomaly_score * 100.0 * self.config.anomaly_weight;
        round2(raw.clamp(0.0, 100.0))
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn critical_with_zero_anomaly_scores_exactly_70() {
        let scorer = RiskScorer::default();
        assert_eq!(scorer.combined_score(Severity::Critical, 0.0), 70.0);
    }

    #[test]
    fn tier_table_at_full_anomaly() {
        let scorer = RiskScorer::default();
        assert_eq!(scorer.combined_score(Severity::Critical, 1.0), 100.0);
        assert_eq!(scorer.combined_score(Severity::High, 1.0), 82.5);
        assert_eq!(scorer.combined_score(Severity::Medium, 1.0), 65.0);
        assert_eq!(scorer.combined_score(Severity::Low, 1.0), 47.5);
    }

    #[test]
    fn unrecognized_label_scores_as_medium() {
        let scorer = RiskScorer::default();
        assert_eq!(
            scorer.combined_score_for_label("unheard_of", 0.0),
            scorer.combined_score(Severity::Medium, 0.0)
        );
    }

    #[test]
    fn label_path_matches_typed_path() {
        let scorer = RiskScorer::default();
        for severity in Severity::all() {
            assert_eq!(
                scorer.combined_score_for_label(severity.as_str(), 0.42),
                scorer.combined_score(*severity, 0.42)
            );
        }
    }

    #[test]
    fn result_is_rounded_to_two_decimals() {
        let scorer = RiskScorer::default();
        let score = scorer.combined_score(Severity::Low, 0.333);
        assert_eq!(score, 27.49);
    }

    proptest! {
        #[test]
        fn output_always_within_0_100(anomaly in 0.0_f64..=1.0) {
            let scorer = RiskScorer::default();
            for severity in Severity::all() {
                let score = scorer.combined_score(*severity, anomaly);
                prop_assert!((0.0..=100.0).contains(&score));
            }
        }

        #[test]
        fn monotonic_in_anomaly_for_fixed_severity(
            a in 0.0_f64..=1.0,
            b in 0.0_f64..=1.0,
        ) {
            let scorer = RiskScorer::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            for severity in Severity::all() {
                prop_assert!(
                    scorer.combined_score(*severity, lo)
                        <= scorer.combined_score(*severity, hi)
                );
            }
        }

        #[test]
        fn monotonic_in_severity_for_fixed_anomaly(anomaly in 0.0_f64..=1.0) {
            let scorer = RiskScorer::default();
            prop_assert!(
                scorer.combined_score(Severity::Low, anomaly)
                    <= scorer.combined_score(Severity::Medium, anomaly)
            );
            prop_assert!(
                scorer.combined_score(Severity::Medium, anomaly)
                    <= scorer.combined_score(Severity::High, anomaly)
            );
            prop_assert!(
                scorer.combined_score(Severity::High, anomaly)
                    <= scorer.combined_score(Severity::Critical, anomaly)
            );
        }

        #[test]
        fn deterministic_recomputation(anomaly in 0.0_f64..=1.0) {
            let scorer = RiskScorer::default();
            for severity in Severity::all() {
                let first = scorer.combined_score(*severity, anomaly);
                let second = scorer.combined_score(*severity, anomaly);
                prop_assert_eq!(first, second);
            }
        }
    }
}
