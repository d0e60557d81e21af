//! # Remediation Case Lifecycle
//!
//! One [`RemediationCase`] per violation, driven through a validated-enum
//! state machine:
//!
//! ```text
//! Open ──▶ InProgress ──▶ { Escalated, Completed, Overdue }
//!   │                          ▲              ▲
//!   ├──▶ Overdue ──────────────┘──▶ Completed │
//!   └──▶ Completed                            │
//!              Escalated ─────────────────────┘
//! ```
//!
//! `Completed` is the only terminal state. The periodic sweep owns the
//! forward transitions into `Overdue` and `Escalated`; reviewers own the
//! rest through `update_status`. A validated enum (runtime-checked
//! transitions) fits here because cases are stored and listed with their
//! state unknown at compile time, and because the sweep must make
//! conditional transitions over arbitrary stored cases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vigil_core::{CaseId, RuleId, Severity, TenantId, UserId, ViolationId};

/// Lifecycle state of a remediation case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Created, not yet picked up.
    Open,
    /// An assignee is working the case.
    InProgress,
    /// Forcibly reassigned after staying overdue past the grace window.
    Escalated,
    /// Remediation finished. Terminal.
    Completed,
    /// Past its SLA due date.
    Overdue,
}

impl CaseStatus {
    /// The canonical string label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Escalated => "escalated",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
        }
    }

    /// Whether the case is closed for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Valid target states from this state.
    pub fn valid_transitions(&self) -> &'static [CaseStatus] {
        match self {
            Self::Open => &[Self::InProgress, Self::Overdue, Self::Completed],
            Self::InProgress => &[Self::Escalated, Self::Completed, Self::Overdue],
            Self::Overdue => &[Self::Escalated, Self::Completed],
            Self::Escalated => &[Self::Completed],
            Self::Completed => &[],
        }
    }

    /// Whether moving to `target` is allowed.
    pub fn can_transition_to(&self, target: CaseStatus) -> bool {
        self.valid_transitions().contains(&target)
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Remediation urgency, derived from the violation's severity with the
/// identical four tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasePriority {
    /// 24-hour SLA.
    Critical,
    /// 72-hour SLA.
    High,
    /// 7-day SLA.
    Medium,
    /// 14-day SLA.
    Low,
}

impl CasePriority {
    /// The canonical string label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// The severity tier this priority mirrors, used to look up SLA hours
    /// and to set alert severity for case transitions.
    pub fn as_severity(&self) -> Severity {
        match self {
            Self::Critical => Severity::Critical,
            Self::High => Severity::High,
            Self::Medium => Severity::Medium,
            Self::Low => Severity::Low,
        }
    }
}

impl From<Severity> for CasePriority {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Self::Critical,
            Severity::High => Self::High,
            Severity::Medium => Self::Medium,
            Severity::Low => Self::Low,
        }
    }
}

impl std::fmt::Display for CasePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only case comment. `author` is the acting user; sweep-generated
/// comments carry the admin the case was escalated to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseComment {
    /// Unique identifier.
    pub comment_id: Uuid,
    /// The user the comment is attributed to.
    pub author: Option<UserId>,
    /// Comment body.
    pub text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl CaseComment {
    /// Create a comment stamped now.
    pub fn new(author: Option<UserId>, text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            comment_id: Uuid::new_v4(),
            author,
            text: text.into(),
            created_at: at,
        }
    }
}

/// One remediation case, one-to-one with a violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationCase {
    /// Unique identifier.
    pub case_id: CaseId,
    /// The violation this case remediates. Unique across all cases.
    pub violation_id: ViolationId,
    /// The rule behind the violation.
    pub rule_id: RuleId,
    /// Owning tenant; always the violation's tenant.
    pub tenant_id: TenantId,
    /// Current owner, when one could be assigned.
    pub assigned_to: Option<UserId>,
    /// Lifecycle state.
    pub status: CaseStatus,
    /// Urgency tier.
    pub priority: CasePriority,
    /// Generated remediation checklist.
    pub recommended_action: String,
    /// SLA deadline.
    pub due_date: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Completion timestamp, once terminal.
    pub completed_at: Option<DateTime<Utc>>,
    /// Append-only comment trail.
    pub comments: Vec<CaseComment>,
}
