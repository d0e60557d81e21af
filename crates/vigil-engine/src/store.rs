//! # In-Memory Stores
//!
//! Violation and policy storage for the pipeline. Both are `DashMap`
//! keyed stores; [`InMemoryPolicyStore`] additionally implements the
//! impact analyzer's read seam by joining against the violation store for
//! historical counts.

use std::sync::Arc;

use dashmap::DashMap;

use vigil_core::{PolicyId, RuleId, TenantId, Violation, ViolationId, ViolationStatus};
use vigil_impact::PolicyStore;
use vigil_rules::{Policy, Rule};

/// Thread-safe violation storage.
#[derive(Debug, Default)]
pub struct InMemoryViolationStore {
    violations: DashMap<ViolationId, Violation>,
}

impl InMemoryViolationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a violation.
    pub fn insert(&self, violation: Violation) {
        self.violations.insert(violation.violation_id, violation);
    }

    /// Remove a violation, returning it. Used to roll back a violation
    /// whose remediation case could not be created.
    pub fn remove(&self, violation_id: ViolationId) -> Option<Violation> {
        self.violations.remove(&violation_id).map(|(_, v)| v)
    }

    /// Fetch a snapshot of a violation.
    pub fn get(&self, violation_id: ViolationId) -> Option<Violation> {
        self.violations.get(&violation_id).map(|entry| entry.clone())
    }

    /// Set a violation's review status. Returns false when the violation
    /// does not exist.
    pub fn set_status(&self, violation_id: ViolationId, status: ViolationStatus) -> bool {
        match self.violations.get_mut(&violation_id) {
            Some(mut entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    /// All violations of a tenant, as snapshots.
    pub fn for_tenant(&self, tenant_id: TenantId) -> Vec<Violation> {
        self.violations
            .iter()
            .filter(|entry| entry.tenant_id == tenant_id)
            .map(|entry| entry.clone())
            .collect()
    }

    /// Violations of a tenant attributed to one rule.
    pub fn count_for_rule(&self, tenant_id: TenantId, rule_id: RuleId) -> usize {
        self.violations
            .iter()
            .filter(|entry| entry.tenant_id == tenant_id && entry.rule_id == rule_id)
            .count()
    }

    /// All violations of a tenant.
    pub fn count_for_tenant(&self, tenant_id: TenantId) -> usize {
        self.violations
            .iter()
            .filter(|entry| entry.tenant_id == tenant_id)
            .count()
    }

    /// Total number of violations held.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Whether the store holds no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Thread-safe policy and rule storage, joined with the violation store
/// for the impact analyzer's historical counts.
pub struct InMemoryPolicyStore {
    policies: DashMap<PolicyId, Policy>,
    rules: DashMap<RuleId, Rule>,
    violations: Arc<InMemoryViolationStore>,
}

impl InMemoryPolicyStore {
    /// Create a store joined to a violation store.
    pub fn new(violations: Arc<InMemoryViolationStore>) -> Self {
        Self {
            policies: DashMap::new(),
            rules: DashMap::new(),
            violations,
        }
    }

    /// Insert or replace a policy version.
    pub fn upsert_policy(&self, policy: Policy) {
        self.policies.insert(policy.policy_id, policy);
    }

    /// Insert or replace a rule.
    pub fn upsert_rule(&self, rule: Rule) {
        self.rules.insert(rule.rule_id, rule);
    }

    /// Deactivate a superseded policy version and all its rules.
    pub fn deactivate_policy(&self, policy_id: PolicyId) {
        if let Some(mut policy) = self.policies.get_mut(&policy_id) {
            policy.active = false;
        }
        for mut rule in self.rules.iter_mut() {
            if rule.policy_id == policy_id {
                rule.active = false;
            }
        }
    }

    /// Link a rule to the rule it supersedes.
    pub fn set_rule_lineage(&self, rule_id: RuleId, previous: RuleId) {
        if let Some(mut rule) = self.rules.get_mut(&rule_id) {
            rule.previous_rule_id = Some(previous);
        }
    }

    /// Active policies of a tenant, ordered by name then version for
    /// reproducible scan reports.
    pub fn active_policies(&self, tenant_id: TenantId) -> Vec<Policy> {
        let mut policies: Vec<Policy> = self
            .policies
            .iter()
            .filter(|entry| entry.tenant_id == tenant_id && entry.active)
            .map(|entry| entry.clone())
            .collect();
        policies.sort_by(|a, b| a.name.cmp(&b.name).then(a.version.cmp(&b.version)));
        policies
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn policy(&self, policy_id: PolicyId) -> Option<Policy> {
        self.policies.get(&policy_id).map(|entry| entry.clone())
    }

    fn active_rules(&self, policy_id: PolicyId) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self
            .rules
            .iter()
            .filter(|entry| entry.policy_id == policy_id && entry.active)
            .map(|entry| entry.clone())
            .collect();
        rules.sort_by(|a, b| a.rule_text.cmp(&b.rule_text));
        rules
    }

    fn violation_count_for_rule(&self, tenant_id: TenantId, rule_id: RuleId) -> usize {
        self.violations.count_for_rule(tenant_id, rule_id)
    }

    fn tenant_violation_count(&self, tenant_id: TenantId) -> usize {
        self.violations.count_for_tenant(tenant_id)
    }

    fn tenant_active_rule_count(&self, tenant_id: TenantId) -> usize {
        self.rules
            .iter()
            .filter(|entry| entry.tenant_id == tenant_id && entry.active)
            .count()
    }
}
