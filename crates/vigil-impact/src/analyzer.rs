//! # Policy Impact Analyzer
//!
//! Compares two versions of a policy, logs every rule change, and
//! estimates how the violation volume will move. The estimates are
//! heuristics over historical counts, not predictions from data; they
//! exist to rank policy updates by review urgency before the next scan
//! runs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use vigil_core::{EngineConfig, PolicyId, RuleId, TenantId};
use vigil_rules::{Policy, Rule};

use crate::change::{detect_rule_changes, ChangeType, FieldChange, RuleChange, ThresholdDirection};
use crate::error::ImpactError;

/// Read access to stored policies, rules, and violation counts.
pub trait PolicyStore: Send + Sync {
    /// Look up a policy version.
    fn policy(&self, policy_id: PolicyId) -> Option<Policy>;

    /// Active rules of a policy version.
    fn active_rules(&self, policy_id: PolicyId) -> Vec<Rule>;

    /// Historical violations attributed to one rule within a tenant.
    fn violation_count_for_rule(&self, tenant_id: TenantId, rule_id: RuleId) -> usize;

    /// All historical violations of a tenant.
    fn tenant_violation_count(&self, tenant_id: TenantId) -> usize;

    /// Active rules of a tenant, across policies.
    fn tenant_active_rule_count(&self, tenant_id: TenantId) -> usize;
}

/// Estimated violation-volume effect of one rule change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleImpact {
    /// The rule the estimate is about: the new rule for additions and
    /// modifications, the old rule for removals.
    pub rule_id: RuleId,
    /// Kind of change behind the estimate.
    pub change_type: ChangeType,
    /// Historical violations of the old rule.
    pub old_violations: usize,
    /// Estimated violations under the new rule set.
    pub estimated_violations: usize,
    /// `estimated - old`, signed.
    pub risk_delta: i64,
}

/// Which way the overall violation volume is expected to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskDirection {
    Increased,
    Decreased,
    Stable,
}

/// Aggregated volume estimate for one policy update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactSummary {
    /// Estimated additional violations.
    pub new_violations: usize,
    /// Estimated violations that stop being detected.
    pub resolved_violations: usize,
    /// `new - resolved`, signed.
    pub net_risk_delta: i64,
    /// Net delta relative to resolved volume, percent, two decimals. Zero
    /// when nothing resolves.
    pub risk_change_percent: f64,
    /// Sign of the net delta.
    pub risk_direction: RiskDirection,
    /// Per-rule breakdown.
    pub rule_impacts: Vec<RuleImpact>,
}

/// Full analysis of one policy update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyImpactReport {
    /// Policy name, from the new version.
    pub policy_name: String,
    /// Version numbers compared.
    pub old_version: u32,
    pub new_version: u32,
    /// Every detected rule change.
    pub changes: Vec<RuleChange>,
    /// Volume estimate.
    pub impact: ImpactSummary,
    /// `previous_rule_id` lineage to apply: `(new_rule, old_rule)` per
    /// modification.
    pub lineage: Vec<(RuleId, RuleId)>,
    /// When the analysis ran.
    pub analyzed_at: DateTime<Utc>,
}

/// One persisted change-log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyChangeRecord {
    /// Unique identifier.
    pub change_id: Uuid,
    /// The new policy version the change belongs to.
    pub policy_id: PolicyId,
    /// Kind of change.
    pub change_type: ChangeType,
    /// The superseded rule, absent for additions.
    pub old_rule_id: Option<RuleId>,
    /// The superseding rule, absent for removals.
    pub new_rule_id: Option<RuleId>,
    /// Historical violations of the old rule, when estimated.
    pub old_violations: usize,
    /// Estimated violations under the new rule set, when estimated.
    pub new_violations: usize,
    /// `new - old`, signed.
    pub risk_delta: i64,
    /// When the change was detected.
    pub detected_at: DateTime<Utc>,
}

/// Policy version comparator with an in-memory change log.
pub struct PolicyImpactAnalyzer {
    config: EngineConfig,
    store: Arc<dyn PolicyStore>,
    change_log: DashMap<PolicyId, Vec<PolicyChangeRecord>>,
}

impl PolicyImpactAnalyzer {
    /// Create an analyzer over a policy store.
    pub fn new(config: EngineConfig, store: Arc<dyn PolicyStore>) -> Self {
        Self {
            config,
            store,
            change_log: DashMap::new(),
        }
    }

    /// Compare two versions of a policy. Diffs the active rule sets,
    /// records a change-log row per change, and estimates the violation
    /// volume shift.
    pub fn analyze_policy_update(
        &self,
        old_policy_id: PolicyId,
        new_policy_id: PolicyId,
        now: DateTime<Utc>,
    ) -> Result<PolicyImpactReport, ImpactError> {
        let old_policy = self
            .store
            .policy(old_policy_id)
            .ok_or(ImpactError::PolicyNotFound(old_policy_id))?;
        let new_policy = self
            .store
            .policy(new_policy_id)
            .ok_or(ImpactError::PolicyNotFound(new_policy_id))?;

        let old_rules = self.store.active_rules(old_policy_id);
        let new_rules = self.store.active_rules(new_policy_id);
        let changes = detect_rule_changes(&old_rules, &new_rules);
        let impact = self.estimate_impact(&changes, new_policy.tenant_id);
        let lineage = changes
            .iter()
            .filter(|c| c.change_type == ChangeType::Modified)
            .filter_map(|c| Some((c.new_rule_id?, c.old_rule_id?)))
            .collect();

        let mut records = Vec::with_capacity(changes.len());
        for change in &changes {
            let estimate = impact.rule_impacts.iter().find(|i| {
                Some(i.rule_id) == change.new_rule_id || Some(i.rule_id) == change.old_rule_id
            });
            records.push(PolicyChangeRecord {
                change_id: Uuid::new_v4(),
                policy_id: new_policy_id,
                change_type: change.change_type,
                old_rule_id: change.old_rule_id,
                new_rule_id: change.new_rule_id,
                old_violations: estimate.map(|i| i.old_violations).unwrap_or(0),
                new_violations: estimate.map(|i| i.estimated_violations).unwrap_or(0),
                risk_delta: estimate.map(|i| i.risk_delta).unwrap_or(0),
                detected_at: now,
            });
        }
        self.change_log
            .entry(new_policy_id)
            .or_default()
            .extend(records);

        info!(
            policy = %new_policy.name,
            old_version = old_policy.version,
            new_version = new_policy.version,
            changes = changes.len(),
            net_risk_delta = impact.net_risk_delta,
            "policy update analyzed"
        );

        Ok(PolicyImpactReport {
            policy_name: new_policy.name,
            old_version: old_policy.version,
            new_version: new_policy.version,
            changes,
            impact,
            lineage,
            analyzed_at: now,
        })
    }

    /// Change history recorded for a policy version, newest first.
    pub fn history(&self, policy_id: PolicyId) -> Vec<PolicyChangeRecord> {
        let mut records = self
            .change_log
            .get(&policy_id)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        records.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        records
    }

    /// Volume heuristic per change:
    ///
    /// - modified, stricter threshold: `floor(old * 1.3)`
    /// - modified, relaxed threshold: `floor(old * 0.7)`
    /// - removed: all of the rule's historical violations resolve
    /// - new: the tenant's average violations per active rule, default 10
    ///   when the tenant has no active rules
    ///
    /// Modifications without a directed threshold change (operator,
    /// pattern, severity) get no volume estimate.
    fn estimate_impact(&self, changes: &[RuleChange], tenant_id: TenantId) -> ImpactSummary {
        let mut new_violations = 0usize;
        let mut resolved_violations = 0usize;
        let mut rule_impacts = Vec::new();

        for change in changes {
            match change.change_type {
                ChangeType::Modified => {
                    let (Some(old_rule_id), Some(new_rule_id)) =
                        (change.old_rule_id, change.new_rule_id)
                    else {
                        continue;
                    };
                    let Some(direction) = change.changes.iter().find_map(|c| match c {
                        FieldChange::Threshold { direction, .. } => *direction,
                        _ => None,
                    }) else {
                        continue;
                    };
                    let old = self.store.violation_count_for_rule(tenant_id, old_rule_id);
                    let multiplier = match direction {
                        ThresholdDirection::Stricter => self.config.stricter_multiplier,
                        ThresholdDirection::Relaxed => self.config.relaxed_multiplier,
                    };
                    let estimated = (old as f64 * multiplier) as usize;
                    match direction {
                        ThresholdDirection::Stricter => {
                            new_violations += estimated.saturating_sub(old)
                        }
                        ThresholdDirection::Relaxed => {
                            resolved_violations += old.saturating_sub(estimated)
                        }
                    }
                    rule_impacts.push(RuleImpact {
                        rule_id: new_rule_id,
                        change_type: ChangeType::Modified,
                        old_violations: old,
                        estimated_violations: estimated,
                        risk_delta: estimated as i64 - old as i64,
                    });
                }
                ChangeType::New => {
                    let Some(new_rule_id) = change.new_rule_id else {
                        continue;
                    };
                    let estimated = self.average_violations_per_rule(tenant_id);
                    new_violations += estimated;
                    rule_impacts.push(RuleImpact {
                        rule_id: new_rule_id,
                        change_type: ChangeType::New,
                        old_violations: 0,
                        estimated_violations: estimated,
                        risk_delta: estimated as i64,
                    });
                }
                ChangeType::Removed => {
                    let Some(old_rule_id) = change.old_rule_id else {
                        continue;
                    };
                    let old = self.store.violation_count_for_rule(tenant_id, old_rule_id);
                    resolved_violations += old;
                    rule_impacts.push(RuleImpact {
                        rule_id: old_rule_id,
                        change_type: ChangeType::Removed,
                        old_violations: old,
                        estimated_violations: 0,
                        risk_delta: -(old as i64),
                    });
                }
            }
        }

        let net_risk_delta = new_violations as i64 - resolved_violations as i64;
        let risk_change_percent = if resolved_violations > 0 {
            let raw = net_risk_delta as f64 / resolved_violations as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        } else {
            0.0
        };
        let risk_direction = match net_risk_delta {
            d if d > 0 => RiskDirection::Increased,
            d if d < 0 => RiskDirection::Decreased,
            _ => RiskDirection::Stable,
        };

        ImpactSummary {
            new_violations,
            resolved_violations,
            net_risk_delta,
            risk_change_percent,
            risk_direction,
            rule_impacts,
        }
    }

    fn average_violations_per_rule(&self, tenant_id: TenantId) -> usize {
        let rules = self.store.tenant_active_rule_count(tenant_id);
        if rules == 0 {
            return self.config.default_new_rule_violations as usize;
        }
        self.store.tenant_violation_count(tenant_id) / rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vigil_core::Severity;
    use vigil_rules::{CompareOp, RuleCondition};

    struct FixtureStore {
        policies: Vec<Policy>,
        rules: Vec<Rule>,
        violation_counts: HashMap<RuleId, usize>,
    }

    impl PolicyStore for FixtureStore {
        fn policy(&self, policy_id: PolicyId) -> Option<Policy> {
            self.policies.iter().find(|p| p.policy_id == policy_id).cloned()
        }

        fn active_rules(&self, policy_id: PolicyId) -> Vec<Rule> {
            self.rules
                .iter()
                .filter(|r| r.policy_id == policy_id && r.active)
                .cloned()
                .collect()
        }

        fn violation_count_for_rule(&self, _tenant_id: TenantId, rule_id: RuleId) -> usize {
            self.violation_counts.get(&rule_id).copied().unwrap_or(0)
        }

        fn tenant_violation_count(&self, _tenant_id: TenantId) -> usize {
            self.violation_counts.values().sum()
        }

        fn tenant_active_rule_count(&self, _tenant_id: TenantId) -> usize {
            self.rules.iter().filter(|r| r.active).count()
        }
    }

    fn threshold_rule(
        policy_id: PolicyId,
        tenant_id: TenantId,
        text: &str,
        value: f64,
    ) -> Rule {
        Rule::new(
            policy_id,
            tenant_id,
            text,
            RuleCondition::Threshold {
                field: "amount".to_string(),
                operator: CompareOp::Gt,
                value,
            },
            Severity::High,
        )
    }

    #[test]
    fn missing_policy_is_an_error() {
        let store = Arc::new(FixtureStore {
            policies: Vec::new(),
            rules: Vec::new(),
            violation_counts: HashMap::new(),
        });
        let analyzer = PolicyImpactAnalyzer::new(EngineConfig::default(), store);
        let missing = PolicyId::new();
        let err = analyzer
            .analyze_policy_update(missing, PolicyId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, ImpactError::PolicyNotFound(id) if id == missing));
    }

    #[test]
    fn stricter_threshold_estimates_thirty_percent_more() {
        let tenant = TenantId::new();
        let old_policy = Policy::new(tenant, "AML", Utc::now());
        let new_policy = old_policy.next_version(Utc::now());
        let old_rule = threshold_rule(old_policy.policy_id, tenant, "report transfers", 10_000.0);
        let new_rule = threshold_rule(new_policy.policy_id, tenant, "report transfers", 5_000.0);
        let mut violation_counts = HashMap::new();
        violation_counts.insert(old_rule.rule_id, 10);

        let analyzer = PolicyImpactAnalyzer::new(
            EngineConfig::default(),
            Arc::new(FixtureStore {
                policies: vec![old_policy.clone(), new_policy.clone()],
                rules: vec![old_rule.clone(), new_rule.clone()],
                violation_counts,
            }),
        );
        let report = analyzer
            .analyze_policy_update(old_policy.policy_id, new_policy.policy_id, Utc::now())
            .unwrap();

        assert_eq!(report.policy_name, "AML");
        assert_eq!((report.old_version, report.new_version), (1, 2));
        assert_eq!(report.impact.new_violations, 3); // floor(10 * 1.3) - 10
        assert_eq!(report.impact.resolved_violations, 0);
        assert_eq!(report.impact.risk_direction, RiskDirection::Increased);
        assert_eq!(report.lineage, vec![(new_rule.rule_id, old_rule.rule_id)]);

        let impact = &report.impact.rule_impacts[0];
        assert_eq!(impact.old_violations, 10);
        assert_eq!(impact.estimated_violations, 13);
        assert_eq!(impact.risk_delta, 3);
    }

    #[test]
    fn relaxed_threshold_resolves_truncated_share() {
        let tenant = TenantId::new();
        let old_policy = Policy::new(tenant, "AML", Utc::now());
        let new_policy = old_policy.next_version(Utc::now());
        let old_rule = threshold_rule(old_policy.policy_id, tenant, "report transfers", 5_000.0);
        let new_rule = threshold_rule(new_policy.policy_id, tenant, "report transfers", 10_000.0);
        let mut violation_counts = HashMap::new();
        violation_counts.insert(old_rule.rule_id, 9);

        let analyzer = PolicyImpactAnalyzer::new(
            EngineConfig::default(),
            Arc::new(FixtureStore {
                policies: vec![old_policy.clone(), new_policy.clone()],
                rules: vec![old_rule, new_rule],
                violation_counts,
            }),
        );
        let report = analyzer
            .analyze_policy_update(old_policy.policy_id, new_policy.policy_id, Utc::now())
            .unwrap();

        // floor(9 * 0.7) = 6, so 3 resolve.
        assert_eq!(report.impact.resolved_violations, 3);
        assert_eq!(report.impact.net_risk_delta, -3);
        assert_eq!(report.impact.risk_change_percent, -100.0);
        assert_eq!(report.impact.risk_direction, RiskDirection::Decreased);
    }

    #[test]
    fn new_rule_uses_tenant_average_with_default_fallback() {
        let tenant = TenantId::new();
        let old_policy = Policy::new(tenant, "AML", Utc::now());
        let new_policy = old_policy.next_version(Utc::now());
        let added = threshold_rule(new_policy.policy_id, tenant, "cap fees", 50.0);

        // No pre-existing rules: the default estimate of 10 applies.
        let analyzer = PolicyImpactAnalyzer::new(
            EngineConfig::default(),
            Arc::new(FixtureStore {
                policies: vec![old_policy.clone(), new_policy.clone()],
                rules: vec![added],
                violation_counts: HashMap::new(),
            }),
        );
        let report = analyzer
            .analyze_policy_update(old_policy.policy_id, new_policy.policy_id, Utc::now())
            .unwrap();
        // The added rule itself is active, so the tenant average is
        // 0 violations / 1 rule = 0.
        assert_eq!(report.impact.new_violations, 0);

        let empty_tenant_analyzer = PolicyImpactAnalyzer::new(
            EngineConfig::default(),
            Arc::new(FixtureStore {
                policies: vec![old_policy.clone(), new_policy.clone()],
                rules: Vec::new(),
                violation_counts: HashMap::new(),
            }),
        );
        assert_eq!(empty_tenant_analyzer.average_violations_per_rule(tenant), 10);
    }

    #[test]
    fn removed_rule_resolves_its_full_history() {
        let tenant = TenantId::new();
        let old_policy = Policy::new(tenant, "AML", Utc::now());
        let new_policy = old_policy.next_version(Utc::now());
        let dropped = threshold_rule(old_policy.policy_id, tenant, "cap fees", 50.0);
        let mut violation_counts = HashMap::new();
        violation_counts.insert(dropped.rule_id, 7);

        let analyzer = PolicyImpactAnalyzer::new(
            EngineConfig::default(),
            Arc::new(FixtureStore {
                policies: vec![old_policy.clone(), new_policy.clone()],
                rules: vec![dropped],
                violation_counts,
            }),
        );
        let report = analyzer
            .analyze_policy_update(old_policy.policy_id, new_policy.policy_id, Utc::now())
            .unwrap();
        assert_eq!(report.impact.resolved_violations, 7);
        assert_eq!(report.impact.risk_direction, RiskDirection::Decreased);
    }

    #[test]
    fn change_log_records_history_newest_first() {
        let tenant = TenantId::new();
        let old_policy = Policy::new(tenant, "AML", Utc::now());
        let new_policy = old_policy.next_version(Utc::now());
        let old_rule = threshold_rule(old_policy.policy_id, tenant, "report transfers", 10_000.0);
        let new_rule = threshold_rule(new_policy.policy_id, tenant, "report transfers", 5_000.0);

        let analyzer = PolicyImpactAnalyzer::new(
            EngineConfig::default(),
            Arc::new(FixtureStore {
                policies: vec![old_policy.clone(), new_policy.clone()],
                rules: vec![old_rule, new_rule],
                violation_counts: HashMap::new(),
            }),
        );
        let first_at = Utc::now();
        let second_at = first_at + chrono::Duration::minutes(5);
        analyzer
            .analyze_policy_update(old_policy.policy_id, new_policy.policy_id, first_at)
            .unwrap();
        analyzer
            .analyze_policy_update(old_policy.policy_id, new_policy.policy_id, second_at)
            .unwrap();

        let history = analyzer.history(new_policy.policy_id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].detected_at, second_at);
        assert_eq!(history[0].change_type, ChangeType::Modified);
        assert!(analyzer.history(old_policy.policy_id).is_empty());
    }
}
