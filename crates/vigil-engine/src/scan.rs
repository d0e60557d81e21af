//! # Scan Orchestration
//!
//! Runs a tenant's record batch against every active policy. Per rule
//! match: anomaly-score the flagged record, blend the final risk score,
//! persist the violation, and create its remediation case. Violation and
//! case are an atomic pair; when case creation fails the violation is
//! rolled back so no violation ever exists without a case.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use vigil_anomaly::{AnomalyScorer, AnomalyVerdict};
use vigil_core::{
    AlertChannel, AlertMessage, AlertRef, AlertSink, EngineConfig, PolicyId, Record, Severity,
    TenantId, Violation, ViolationId, ViolationStatus,
};
use vigil_impact::PolicyStore;
use vigil_remediation::RemediationEngine;
use vigil_risk::RiskScorer;
use vigil_rules::{Rule, RuleEvaluator};

use crate::analytics::ScoreLog;
use crate::error::ScanError;
use crate::source::DataSource;
use crate::store::{InMemoryPolicyStore, InMemoryViolationStore};

/// Violation counts broken down by severity tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    fn add(&mut self, other: SeverityCounts) {
        self.critical += other.critical;
        self.high += other.high;
        self.medium += other.medium;
        self.low += other.low;
    }

    /// Sum across all tiers.
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// Per-policy slice of a scan report.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyScanSummary {
    pub policy_id: PolicyId,
    pub policy_name: String,
    pub version: u32,
    pub rules_executed: usize,
    pub violations_found: usize,
    pub violations_by_severity: SeverityCounts,
}

/// Result of one scan run.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub tenant_id: TenantId,
    pub records_scanned: usize,
    pub policies_scanned: usize,
    pub rules_executed: usize,
    pub total_violations: usize,
    /// Cases successfully opened; equals `total_violations` unless case
    /// creation failed and rolled violations back.
    pub cases_created: usize,
    pub violations_by_severity: SeverityCounts,
    pub policies: Vec<PolicyScanSummary>,
    pub completed_at: DateTime<Utc>,
}

/// The full detection pipeline for one tenant scan.
pub struct ScanEngine {
    config: EngineConfig,
    evaluator: RuleEvaluator,
    anomaly: Arc<AnomalyScorer>,
    risk: RiskScorer,
    remediation: Arc<RemediationEngine>,
    policies: Arc<InMemoryPolicyStore>,
    violations: Arc<InMemoryViolationStore>,
    alerts: Arc<dyn AlertSink>,
    scores: ScoreLog,
}

impl ScanEngine {
    /// Wire the pipeline together.
    pub fn new(
        config: EngineConfig,
        anomaly: Arc<AnomalyScorer>,
        remediation: Arc<RemediationEngine>,
        policies: Arc<InMemoryPolicyStore>,
        violations: Arc<InMemoryViolationStore>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            risk: RiskScorer::new(config.clone()),
            config,
            evaluator: RuleEvaluator::new(),
            anomaly,
            remediation,
            policies,
            violations,
            alerts,
            scores: ScoreLog::new(),
        }
    }

    /// The violation store scans write into.
    pub fn violations(&self) -> &Arc<InMemoryViolationStore> {
        &self.violations
    }

    /// Fetch the tenant's records through the data source and scan them
    /// against every active policy.
    pub fn scan(
        &self,
        tenant_id: TenantId,
        source: &dyn DataSource,
        now: DateTime<Utc>,
    ) -> Result<ScanReport, ScanError> {
        let records = source.fetch_records(tenant_id)?;
        Ok(self.scan_records(tenant_id, &records, now))
    }

    /// Scan an already-fetched batch against every active policy of the
    /// tenant.
    pub fn scan_records(
        &self,
        tenant_id: TenantId,
        records: &[Record],
        now: DateTime<Utc>,
    ) -> ScanReport {
        // One anomaly pass per scan; every rule reuses the verdicts.
        let verdicts = self.anomaly.score(tenant_id, records);
        self.scores.observe_batch(tenant_id, records, &verdicts);

        let mut report = ScanReport {
            tenant_id,
            records_scanned: records.len(),
            policies_scanned: 0,
            rules_executed: 0,
            total_violations: 0,
            cases_created: 0,
            violations_by_severity: SeverityCounts::default(),
            policies: Vec::new(),
            completed_at: now,
        };

        for policy in self.policies.active_policies(tenant_id) {
            let rules = self.policies.active_rules(policy.policy_id);
            let mut summary = PolicyScanSummary {
                policy_id: policy.policy_id,
                policy_name: policy.name.clone(),
                version: policy.version,
                rules_executed: rules.len(),
                violations_found: 0,
                violations_by_severity: SeverityCounts::default(),
            };

            for rule in &rules {
                let stored = self.execute_rule(rule, records, &verdicts, now);
                for severity in &stored {
                    summary.violations_found += 1;
                    summary.violations_by_severity.record(*severity);
                }
                report.cases_created += stored.len();
                report.rules_executed += 1;
            }

            report.total_violations += summary.violations_found;
            report.violations_by_severity.add(summary.violations_by_severity);
            report.policies.push(summary);
            report.policies_scanned += 1;
        }

        info!(
            tenant_id = %tenant_id,
            records = report.records_scanned,
            policies = report.policies_scanned,
            rules = report.rules_executed,
            violations = report.total_violations,
            "scan completed"
        );
        report
    }

    /// Evaluate one rule and persist the violation/case pair for each
    /// match. Returns the severities of the violations that survived.
    fn execute_rule(
        &self,
        rule: &Rule,
        records: &[Record],
        verdicts: &[AnomalyVerdict],
        now: DateTime<Utc>,
    ) -> Vec<Severity> {
        let mut stored = Vec::new();
        for hit in self.evaluator.evaluate(rule, records) {
            let verdict = verdicts
                .get(hit.record_index)
                .copied()
                .unwrap_or_else(AnomalyVerdict::benign);
            let final_risk_score = self.risk.combined_score(rule.severity, verdict.score);

            let violation = Violation {
                violation_id: ViolationId::new(),
                rule_id: rule.rule_id,
                policy_id: rule.policy_id,
                tenant_id: rule.tenant_id,
                severity: rule.severity,
                record_id: hit.record_id,
                field_name: hit.field_name,
                field_value: hit.field_value,
                explanation: hit.explanation,
                anomaly_score: verdict.score,
                rule_severity_score: rule.severity.score(),
                final_risk_score,
                status: ViolationStatus::Pending,
                detected_at: now,
            };
            let violation_id = violation.violation_id;
            self.violations.insert(violation.clone());

            match self
                .remediation
                .create_case(&violation, rule.condition.kind(), now)
            {
                Ok(_) => {
                    stored.push(violation.severity);
                    if matches!(violation.severity, Severity::High | Severity::Critical) {
                        self.alerts.send(&AlertMessage {
                            reference: AlertRef::Violation(violation_id),
                            tenant_id: violation.tenant_id,
                            severity: violation.severity,
                            message: format!(
                                "{} violation detected: {}",
                                violation.severity, violation.explanation
                            ),
                            channels: vec![AlertChannel::Websocket, AlertChannel::Email],
                        });
                    }
                }
                Err(err) => {
                    // Keep the pair atomic: no violation without a case.
                    self.violations.remove(violation_id);
                    warn!(
                        rule_id = %rule.rule_id,
                        violation_id = %violation_id,
                        error = %err,
                        "case creation failed, violation rolled back"
                    );
                }
            }
        }
        stored
    }

    /// Week-over-week risk trend for a tenant, as of `as_of`.
    pub fn risk_trend(&self, tenant_id: TenantId, as_of: DateTime<Utc>) -> crate::RiskTrend {
        crate::analytics::risk_trend(
            &self.violations,
            tenant_id,
            self.config.anomaly_flag_threshold,
            as_of,
        )
    }

    /// Per-account anomaly heatmap over everything scans have scored for
    /// the tenant.
    pub fn risk_heatmap(&self, tenant_id: TenantId) -> crate::RiskHeatmap {
        crate::analytics::risk_heatmap(&self.scores, tenant_id)
    }

    /// The configuration the pipeline runs with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
