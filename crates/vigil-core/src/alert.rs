//! # Alert Sink Seam
//!
//! Outbound notifications (email, chat, websocket broadcast) are delivered
//! by a collaborator outside this core. The core only constructs
//! [`AlertMessage`] values and hands them to an [`AlertSink`].
//!
//! Delivery failure must never fail the operation that raised the alert:
//! implementations are required to swallow (and log) their own transport
//! errors, which is why [`AlertSink::send`] returns nothing.

use serde::{Deserialize, Serialize};

use crate::identity::{CaseId, TenantId, ViolationId};
use crate::severity::Severity;

/// Delivery channel requested for an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertChannel {
    /// Direct email to a recipient.
    Email,
    /// Team chat webhook.
    Slack,
    /// Live dashboard broadcast.
    Websocket,
}

/// What an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum AlertRef {
    /// A freshly detected violation.
    Violation(ViolationId),
    /// A remediation case transition (overdue, escalated, assigned).
    Case(CaseId),
}

/// One outbound notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertMessage {
    /// The violation or case the alert concerns.
    pub reference: AlertRef,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Severity driving channel choice and formatting downstream.
    pub severity: Severity,
    /// Human-readable body.
    pub message: String,
    /// Channels the caller wants the alert delivered on.
    pub channels: Vec<AlertChannel>,
}

/// Sink for outbound alerts.
///
/// Implementations deliver asynchronously and swallow their own failures;
/// the core neither retries nor observes delivery status.
pub trait AlertSink: Send + Sync {
    /// Accept an alert for delivery.
    fn send(&self, alert: &AlertMessage);
}

/// Sink that drops every alert. Useful in tests and batch tooling where no
/// notification transport is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlertSink;

impl AlertSink for NoopAlertSink {
    fn send(&self, alert: &AlertMessage) {
        tracing::debug!(
            severity = %alert.severity,
            channels = alert.channels.len(),
            "alert dropped (noop sink)"
        );
    }
}
