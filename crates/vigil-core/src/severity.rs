//! # Violation Severity
//!
//! The four-tier qualitative severity attached to every rule. Severity
//! drives both the rule-based component of the final risk score and the
//! remediation priority tier.

use serde::{Deserialize, Serialize};

/// Qualitative severity of a rule violation.
///
/// Ordering (worst → least): `Critical > High > Medium > Low`. The derived
/// `Ord` follows that rank, so `max()` over a set of severities yields the
/// most severe one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Regulatory breach requiring immediate action.
    Critical,
    /// Significant exposure, short remediation window.
    High,
    /// Standard finding, routine remediation window.
    Medium,
    /// Minor finding, long remediation window.
    Low,
}

impl Severity {
    /// All severities, most severe first.
    pub fn all() -> &'static [Severity] {
        &[Self::Critical, Self::High, Self::Medium, Self::Low]
    }

    /// The canonical string label for serialization and reporting.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Rank value, higher is more severe.
    fn rank(self) -> u8 {
        match self {
            Self::Critical => 3,
            Self::High => 2,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }

    /// The rule-based score component on the 0–100 scale.
    ///
    /// `critical → 100, high → 75, medium → 50, low → 25`.
    pub fn score(&self) -> f64 {
        match self {
            Self::Critical => 100.0,
            Self::High => 75.0,
            Self::Medium => 50.0,
            Self::Low => 25.0,
        }
    }

    /// Parse a severity label, case-insensitively.
    ///
    /// Returns `None` for unrecognized labels; callers that must stay
    /// permissive (the risk scorer, the priority mapping) substitute their
    /// documented medium-tier default.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_rank() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn score_matches_tier_table() {
        assert_eq!(Severity::Critical.score(), 100.0);
        assert_eq!(Severity::High.score(), 75.0);
        assert_eq!(Severity::Medium.score(), 50.0);
        assert_eq!(Severity::Low.score(), 25.0);
    }

    #[test]
    fn from_label_is_case_insensitive() {
        assert_eq!(Severity::from_label("CRITICAL"), Some(Severity::Critical));
        assert_eq!(Severity::from_label("High"), Some(Severity::High));
        assert_eq!(Severity::from_label("urgent"), None);
    }

    #[test]
    fn serde_uses_snake_case_labels() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
