//! # Remediation Engine
//!
//! Turns detected violations into tracked work: creates one case per
//! violation with a generated remediation checklist, an SLA due date, and a
//! least-loaded auto-assignee, then drives stored cases through the
//! lifecycle with reviewer transitions and the periodic overdue/escalation
//! sweep.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use vigil_core::{
    AlertChannel, AlertMessage, AlertRef, AlertSink, CaseId, EngineConfig, Severity, TenantId,
    UserId, Violation,
};
use vigil_rules::ConditionKind;

use crate::case::{CaseComment, CasePriority, CaseStatus, RemediationCase};
use crate::directory::{eligible_roles, UserDirectory, UserRole};
use crate::error::RemediationError;
use crate::store::InMemoryCaseStore;

/// Outcome of one escalation sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscalationSweep {
    /// Cases newly marked overdue.
    pub overdue: Vec<CaseId>,
    /// Cases escalated and reassigned to an admin.
    pub escalated: Vec<CaseId>,
}

/// Per-tenant case workload summary.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CaseStatistics {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub escalated: usize,
    pub overdue: usize,
    pub completed: usize,
    /// Critical-priority cases not yet completed.
    pub critical_pending: usize,
    /// Completed share of all cases, percent, two decimals. Zero when the
    /// tenant has no cases.
    pub completion_rate: f64,
}

/// Case lifecycle driver.
pub struct RemediationEngine {
    config: EngineConfig,
    store: Arc<InMemoryCaseStore>,
    directory: Arc<dyn UserDirectory>,
    alerts: Arc<dyn AlertSink>,
}

impl RemediationEngine {
    /// Create an engine over a case store, a user directory, and an alert
    /// sink.
    pub fn new(
        config: EngineConfig,
        store: Arc<InMemoryCaseStore>,
        directory: Arc<dyn UserDirectory>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            config,
            store,
            directory,
            alerts,
        }
    }

    /// The case store this engine writes to.
    pub fn store(&self) -> &Arc<InMemoryCaseStore> {
        &self.store
    }

    /// Create the remediation case for a violation: priority from severity,
    /// due date from the priority's SLA, checklist from the rule's condition
    /// kind, assignee by least load. Fails if the violation already has a
    /// case.
    pub fn create_case(
        &self,
        violation: &Violation,
        condition_kind: ConditionKind,
        now: DateTime<Utc>,
    ) -> Result<RemediationCase, RemediationError> {
        let priority = CasePriority::from(violation.severity);
        let sla_hours = self.config.sla_hours(priority.as_severity());
        let due_date = now + Duration::hours(sla_hours);
        let recommended_action = recommendation(condition_kind, &violation.explanation);
        let assigned_to = self.auto_assign(violation.tenant_id, priority);

        let case = RemediationCase {
            case_id: CaseId::new(),
            violation_id: violation.violation_id,
            rule_id: violation.rule_id,
            tenant_id: violation.tenant_id,
            assigned_to,
            status: CaseStatus::Open,
            priority,
            recommended_action,
            due_date,
            created_at: now,
            updated_at: now,
            completed_at: None,
            comments: Vec::new(),
        };
        self.store.insert(case.clone())?;

        info!(
            case_id = %case.case_id,
            violation_id = %case.violation_id,
            priority = %case.priority,
            assigned = case.assigned_to.is_some(),
            "remediation case created"
        );
        if assigned_to.is_some() {
            self.alerts.send(&AlertMessage {
                reference: AlertRef::Case(case.case_id),
                tenant_id: case.tenant_id,
                severity: priority.as_severity(),
                message: format!(
                    "New {} remediation case assigned, due {}",
                    case.priority, case.due_date
                ),
                channels: vec![AlertChannel::Email],
            });
        }
        Ok(case)
    }

    /// Least-loaded active user holding an eligible role for the priority.
    /// Falls back to compliance admins when no eligible user exists, then
    /// to unassigned. Ties on load break by user id, so reruns over the
    /// same directory state pick the same assignee.
    fn auto_assign(&self, tenant_id: TenantId, priority: CasePriority) -> Option<UserId> {
        let mut candidates = self.directory.candidates(tenant_id, eligible_roles(priority));
        if candidates.is_empty() {
            candidates = self
                .directory
                .candidates(tenant_id, &[UserRole::ComplianceAdmin]);
        }
        if candidates.is_empty() {
            warn!(tenant_id = %tenant_id, priority = %priority, "no assignable user, case left unassigned");
        }
        candidates
            .into_iter()
            .min_by_key(|c| (c.active_cases, c.user_id))
            .map(|c| c.user_id)
    }

    /// Apply a reviewer-driven status change, validating the transition.
    /// Stamps `completed_at` on completion and appends the optional
    /// comment.
    pub fn update_status(
        &self,
        case_id: CaseId,
        new_status: CaseStatus,
        actor: Option<UserId>,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RemediationCase, RemediationError> {
        self.store.update(case_id, |case| {
            if !case.status.can_transition_to(new_status) {
                return Err(RemediationError::InvalidTransition {
                    from: case.status,
                    to: new_status,
                });
            }
            case.status = new_status;
            case.updated_at = now;
            if new_status == CaseStatus::Completed {
                case.completed_at = Some(now);
            }
            if let Some(text) = comment {
                case.comments.push(CaseComment::new(actor, text, now));
            }
            Ok(())
        })
    }

    /// Hand a case to a different user, recording the handover in the
    /// comment trail.
    pub fn reassign_case(
        &self,
        case_id: CaseId,
        new_assignee: UserId,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<RemediationCase, RemediationError> {
        self.store.update(case_id, |case| {
            let previous = case
                .assigned_to
                .map(|u| u.to_string())
                .unwrap_or_else(|| "Unassigned".to_string());
            case.assigned_to = Some(new_assignee);
            case.updated_at = now;
            case.comments.push(CaseComment::new(
                actor,
                format!("Case reassigned from {previous} to {new_assignee}"),
                now,
            ));
            Ok(())
        })
    }

    /// Append a comment to a case.
    pub fn add_comment(
        &self,
        case_id: CaseId,
        author: Option<UserId>,
        text: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<RemediationCase, RemediationError> {
        let text = text.into();
        self.store.update(case_id, |case| {
            case.comments.push(CaseComment::new(author, text, now));
            case.updated_at = now;
            Ok(())
        })
    }

    /// The periodic sweep. Two passes over a snapshot of case ids:
    ///
    /// 1. Open or in-progress cases past their due date become overdue and
    ///    fire an email + chat alert.
    /// 2. Overdue cases whose due date is more than the grace window in the
    ///    past are reassigned to the tenant's escalation admin, marked
    ///    escalated, and annotated with a system comment. Without an admin
    ///    the case stays overdue and the next sweep retries.
    ///
    /// Each transition re-checks the stored status under the entry lock, so
    /// running the sweep twice over the same clock reading is a no-op the
    /// second time.
    pub fn check_escalations(&self, now: DateTime<Utc>) -> EscalationSweep {
        let mut sweep = EscalationSweep::default();
        let grace = Duration::hours(self.config.escalation_grace_hours);

        for case_id in self.store.case_ids() {
            let Some(snapshot) = self.store.get(case_id) else {
                continue;
            };

            match snapshot.status {
                CaseStatus::Open | CaseStatus::InProgress if snapshot.due_date < now => {
                    let marked = self.store.update(case_id, |case| {
                        if !matches!(case.status, CaseStatus::Open | CaseStatus::InProgress) {
                            return Ok(());
                        }
                        case.status = CaseStatus::Overdue;
                        case.updated_at = now;
                        Ok(())
                    });
                    if let Ok(case) = marked {
                        if case.status == CaseStatus::Overdue {
                            sweep.overdue.push(case_id);
                            self.alerts.send(&AlertMessage {
                                reference: AlertRef::Case(case_id),
                                tenant_id: case.tenant_id,
                                severity: case.priority.as_severity(),
                                message: format!(
                                    "Remediation case overdue since {}",
                                    case.due_date
                                ),
                                channels: vec![AlertChannel::Email, AlertChannel::Slack],
                            });
                        }
                    }
                }
                CaseStatus::Overdue if snapshot.due_date < now - grace => {
                    let Some(admin) = self.directory.escalation_admin(snapshot.tenant_id) else {
                        warn!(
                            case_id = %case_id,
                            tenant_id = %snapshot.tenant_id,
                            "no compliance admin for escalation, case stays overdue"
                        );
                        continue;
                    };
                    let escalated = self.store.update(case_id, |case| {
                        if case.status != CaseStatus::Overdue {
                            return Ok(());
                        }
                        case.status = CaseStatus::Escalated;
                        case.assigned_to = Some(admin);
                        case.updated_at = now;
                        case.comments.push(CaseComment::new(
                            Some(admin),
                            "SYSTEM: Case auto-escalated due to 48+ hours overdue. \
                             Requires immediate attention.",
                            now,
                        ));
                        Ok(())
                    });
                    if let Ok(case) = escalated {
                        if case.status == CaseStatus::Escalated {
                            sweep.escalated.push(case_id);
                            info!(case_id = %case_id, admin = %admin, "case auto-escalated");
                        }
                    }
                }
                _ => {}
            }
        }
        sweep
    }

    /// Workload summary for a tenant.
    pub fn statistics(&self, tenant_id: TenantId) -> CaseStatistics {
        let cases = self.store.cases_for_tenant(tenant_id);
        let total = cases.len();
        let mut stats = CaseStatistics {
            total,
            open: 0,
            in_progress: 0,
            escalated: 0,
            overdue: 0,
            completed: 0,
            critical_pending: 0,
            completion_rate: 0.0,
        };
        for case in &cases {
            match case.status {
                CaseStatus::Open => stats.open += 1,
                CaseStatus::InProgress => stats.in_progress += 1,
                CaseStatus::Escalated => stats.escalated += 1,
                CaseStatus::Overdue => stats.overdue += 1,
                CaseStatus::Completed => stats.completed += 1,
            }
            if case.priority == CasePriority::Critical && !case.status.is_terminal() {
                stats.critical_pending += 1;
            }
        }
        if total > 0 {
            let rate = stats.completed as f64 / total as f64 * 100.0;
            stats.completion_rate = (rate * 100.0).round() / 100.0;
        }
        stats
    }
}

/// Remediation checklist for a rule's condition kind, with the violation
/// explanation appended.
fn recommendation(kind: ConditionKind, explanation: &str) -> String {
    let checklist = match kind {
        ConditionKind::Threshold => {
            "IMMEDIATE ACTION REQUIRED:\n\
             1. File regulatory report within 24 hours\n\
             2. Notify compliance officer and legal team\n\
             3. Document all communications\n\
             4. Review transaction history for pattern\n\
             5. Prepare explanation for regulatory inquiry"
        }
        ConditionKind::Pattern => {
            "IMMEDIATE ESCALATION REQUIRED:\n\
             1. Escalate to AML investigation team immediately\n\
             2. Review all linked transactions and accounts\n\
             3. Identify beneficial owners and related parties\n\
             4. Freeze all related accounts pending investigation\n\
             5. Prepare Suspicious Activity Report (SAR)\n\
             6. Coordinate with law enforcement if necessary\n\
             7. Document complete investigation trail"
        }
        ConditionKind::Comparison => {
            "REVIEW AND VERIFICATION REQUIRED:\n\
             1. Verify data accuracy and completeness\n\
             2. Review business justification\n\
             3. Request supporting documentation\n\
             4. Assess compliance with internal policies\n\
             5. Document findings and resolution"
        }
        ConditionKind::Generic => {
            "COMPLIANCE REVIEW REQUIRED:\n\
             1. Review violation details and evidence\n\
             2. Assess severity and potential impact\n\
             3. Determine appropriate corrective action\n\
             4. Document resolution and preventive measures\n\
             5. Update compliance procedures if needed"
        }
    };
    format!("{checklist}\n\nViolation Details: {explanation}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{AssigneeCandidate, DirectoryUser, StaticUserDirectory};
    use parking_lot::Mutex;
    use vigil_core::{NoopAlertSink, PolicyId, RuleId, ViolationId, ViolationStatus};

    fn violation(tenant_id: TenantId, severity: Severity) -> Violation {
        Violation {
            violation_id: ViolationId::new(),
            rule_id: RuleId::new(),
            policy_id: PolicyId::new(),
            tenant_id,
            severity,
            record_id: "txn-1".to_string(),
            field_name: "amount".to_string(),
            field_value: "125000".to_string(),
            explanation: "Value 125000 violates threshold > 10000".to_string(),
            anomaly_score: 0.2,
            rule_severity_score: severity.score(),
            final_risk_score: 58.5,
            status: ViolationStatus::Pending,
            detected_at: Utc::now(),
        }
    }

    struct RecordingSink {
        sent: Mutex<Vec<AlertMessage>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl AlertSink for RecordingSink {
        fn send(&self, alert: &AlertMessage) {
            self.sent.lock().push(alert.clone());
        }
    }

    struct FixedDirectory {
        users: Vec<AssigneeCandidate>,
        admin: Option<UserId>,
    }

    impl UserDirectory for FixedDirectory {
        fn candidates(&self, _tenant_id: TenantId, _roles: &[UserRole]) -> Vec<AssigneeCandidate> {
            self.users.clone()
        }

        fn escalation_admin(&self, _tenant_id: TenantId) -> Option<UserId> {
            self.admin
        }
    }

    fn engine_with(directory: Arc<dyn UserDirectory>) -> RemediationEngine {
        RemediationEngine::new(
            EngineConfig::default(),
            Arc::new(InMemoryCaseStore::new()),
            directory,
            Arc::new(NoopAlertSink),
        )
    }

    #[test]
    fn high_severity_case_gets_72_hour_sla() {
        let engine = engine_with(Arc::new(FixedDirectory {
            users: Vec::new(),
            admin: None,
        }));
        let now = Utc::now();
        let case = engine
            .create_case(&violation(TenantId::new(), Severity::High), ConditionKind::Threshold, now)
            .unwrap();

        assert_eq!(case.priority, CasePriority::High);
        assert_eq!(case.status, CaseStatus::Open);
        assert_eq!(case.due_date, now + Duration::hours(72));
        assert!(case.recommended_action.starts_with("IMMEDIATE ACTION REQUIRED"));
        assert!(case
            .recommended_action
            .contains("Violation Details: Value 125000 violates threshold > 10000"));
    }

    #[test]
    fn duplicate_violation_is_rejected() {
        let engine = engine_with(Arc::new(FixedDirectory {
            users: Vec::new(),
            admin: None,
        }));
        let v = violation(TenantId::new(), Severity::Medium);
        let now = Utc::now();
        engine.create_case(&v, ConditionKind::Generic, now).unwrap();
        let err = engine.create_case(&v, ConditionKind::Generic, now).unwrap_err();
        assert!(matches!(err, RemediationError::DuplicateCase { .. }));
    }

    #[test]
    fn assignment_prefers_least_loaded_then_lowest_user_id() {
        let busy = UserId::new();
        let (idle_a, idle_b) = {
            let a = UserId::new();
            let b = UserId::new();
            if a < b {
                (a, b)
            } else {
                (b, a)
            }
        };
        let engine = engine_with(Arc::new(FixedDirectory {
            users: vec![
                AssigneeCandidate {
                    user_id: busy,
                    active_cases: 5,
                },
                AssigneeCandidate {
                    user_id: idle_b,
                    active_cases: 1,
                },
                AssigneeCandidate {
                    user_id: idle_a,
                    active_cases: 1,
                },
            ],
            admin: None,
        }));
        let case = engine
            .create_case(
                &violation(TenantId::new(), Severity::Medium),
                ConditionKind::Generic,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(case.assigned_to, Some(idle_a));
    }

    #[test]
    fn assignment_over_live_store_counts() {
        let store = Arc::new(InMemoryCaseStore::new());
        let tenant = TenantId::new();
        let reviewer_a = DirectoryUser {
            user_id: UserId::new(),
            tenant_id: tenant,
            role: UserRole::Reviewer,
            active: true,
        };
        let reviewer_b = DirectoryUser {
            user_id: UserId::new(),
            tenant_id: tenant,
            role: UserRole::Reviewer,
            active: true,
        };
        let directory = Arc::new(StaticUserDirectory::new(
            vec![reviewer_a, reviewer_b],
            Arc::clone(&store),
        ));
        let engine = RemediationEngine::new(
            EngineConfig::default(),
            store,
            directory,
            Arc::new(NoopAlertSink),
        );

        let now = Utc::now();
        let first = engine
            .create_case(&violation(tenant, Severity::Medium), ConditionKind::Generic, now)
            .unwrap();
        let second = engine
            .create_case(&violation(tenant, Severity::Medium), ConditionKind::Generic, now)
            .unwrap();

        // Second case must go to whichever reviewer the first one skipped.
        let first_assignee = first.assigned_to.unwrap();
        let second_assignee = second.assigned_to.unwrap();
        assert_ne!(first_assignee, second_assignee);
    }

    #[test]
    fn unassignable_case_is_created_unassigned() {
        let engine = engine_with(Arc::new(FixedDirectory {
            users: Vec::new(),
            admin: None,
        }));
        let case = engine
            .create_case(
                &violation(TenantId::new(), Severity::Critical),
                ConditionKind::Pattern,
                Utc::now(),
            )
            .unwrap();
        assert!(case.assigned_to.is_none());
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let engine = engine_with(Arc::new(FixedDirectory {
            users: Vec::new(),
            admin: None,
        }));
        let now = Utc::now();
        let case = engine
            .create_case(&violation(TenantId::new(), Severity::Low), ConditionKind::Generic, now)
            .unwrap();

        let err = engine
            .update_status(case.case_id, CaseStatus::Escalated, None, None, now)
            .unwrap_err();
        assert!(matches!(
            err,
            RemediationError::InvalidTransition {
                from: CaseStatus::Open,
                to: CaseStatus::Escalated,
            }
        ));
    }

    #[test]
    fn completion_stamps_completed_at() {
        let engine = engine_with(Arc::new(FixedDirectory {
            users: Vec::new(),
            admin: None,
        }));
        let now = Utc::now();
        let case = engine
            .create_case(&violation(TenantId::new(), Severity::Low), ConditionKind::Generic, now)
            .unwrap();
        let later = now + Duration::hours(2);
        let done = engine
            .update_status(
                case.case_id,
                CaseStatus::Completed,
                None,
                Some("resolved".to_string()),
                later,
            )
            .unwrap();
        assert_eq!(done.status, CaseStatus::Completed);
        assert_eq!(done.completed_at, Some(later));
        assert_eq!(done.comments.len(), 1);
    }

    #[test]
    fn sweep_marks_overdue_then_escalates_after_grace() {
        let admin = UserId::new();
        let sink = Arc::new(RecordingSink::new());
        let engine = RemediationEngine::new(
            EngineConfig::default(),
            Arc::new(InMemoryCaseStore::new()),
            Arc::new(FixedDirectory {
                users: Vec::new(),
                admin: Some(admin),
            }),
            Arc::clone(&sink) as Arc<dyn AlertSink>,
        );
        let created = Utc::now();
        let case = engine
            .create_case(
                &violation(TenantId::new(), Severity::Critical),
                ConditionKind::Threshold,
                created,
            )
            .unwrap();

        // Past due but inside the grace window: overdue only.
        let past_due = case.due_date + Duration::hours(1);
        let first = engine.check_escalations(past_due);
        assert_eq!(first.overdue, vec![case.case_id]);
        assert!(first.escalated.is_empty());

        // Past the 48-hour grace: escalated and reassigned.
        let past_grace = case.due_date + Duration::hours(49);
        let second = engine.check_escalations(past_grace);
        assert!(second.overdue.is_empty());
        assert_eq!(second.escalated, vec![case.case_id]);

        let stored = engine.store().get(case.case_id).unwrap();
        assert_eq!(stored.status, CaseStatus::Escalated);
        assert_eq!(stored.assigned_to, Some(admin));
        assert!(stored.comments.iter().any(|c| c.text.contains("auto-escalated")));

        let alerts = sink.sent.lock();
        assert!(alerts
            .iter()
            .any(|a| a.channels.contains(&AlertChannel::Slack)));
    }

    #[test]
    fn sweep_is_idempotent() {
        let engine = engine_with(Arc::new(FixedDirectory {
            users: Vec::new(),
            admin: Some(UserId::new()),
        }));
        let created = Utc::now();
        let case = engine
            .create_case(
                &violation(TenantId::new(), Severity::High),
                ConditionKind::Generic,
                created,
            )
            .unwrap();

        let at = case.due_date + Duration::hours(1);
        let first = engine.check_escalations(at);
        assert_eq!(first.overdue.len(), 1);
        let second = engine.check_escalations(at);
        assert!(second.overdue.is_empty());
        assert!(second.escalated.is_empty());
    }

    #[test]
    fn sweep_without_admin_leaves_case_overdue() {
        let engine = engine_with(Arc::new(FixedDirectory {
            users: Vec::new(),
            admin: None,
        }));
        let created = Utc::now();
        let case = engine
            .create_case(
                &violation(TenantId::new(), Severity::High),
                ConditionKind::Generic,
                created,
            )
            .unwrap();

        engine.check_escalations(case.due_date + Duration::hours(1));
        let sweep = engine.check_escalations(case.due_date + Duration::hours(72));
        assert!(sweep.escalated.is_empty());
        assert_eq!(
            engine.store().get(case.case_id).unwrap().status,
            CaseStatus::Overdue
        );
    }

    #[test]
    fn reassignment_records_handover_comment() {
        let engine = engine_with(Arc::new(FixedDirectory {
            users: Vec::new(),
            admin: None,
        }));
        let now = Utc::now();
        let case = engine
            .create_case(&violation(TenantId::new(), Severity::Low), ConditionKind::Generic, now)
            .unwrap();
        let new_owner = UserId::new();
        let updated = engine
            .reassign_case(case.case_id, new_owner, None, now)
            .unwrap();
        assert_eq!(updated.assigned_to, Some(new_owner));
        assert!(updated.comments[0].text.starts_with("Case reassigned from Unassigned to"));
    }

    #[test]
    fn statistics_count_by_status_and_round_completion_rate() {
        let engine = engine_with(Arc::new(FixedDirectory {
            users: Vec::new(),
            admin: None,
        }));
        let tenant = TenantId::new();
        let now = Utc::now();
        let a = engine
            .create_case(&violation(tenant, Severity::Critical), ConditionKind::Generic, now)
            .unwrap();
        engine
            .create_case(&violation(tenant, Severity::Medium), ConditionKind::Generic, now)
            .unwrap();
        engine
            .create_case(&violation(tenant, Severity::Low), ConditionKind::Generic, now)
            .unwrap();
        engine
            .update_status(a.case_id, CaseStatus::Completed, None, None, now)
            .unwrap();

        let stats = engine.statistics(tenant);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.open, 2);
        assert_eq!(stats.critical_pending, 0);
        assert_eq!(stats.completion_rate, 33.33);

        let empty = engine.statistics(TenantId::new());
        assert_eq!(empty.total, 0);
        assert_eq!(empty.completion_rate, 0.0);
    }
}
