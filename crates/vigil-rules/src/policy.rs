//! Policy version metadata.
//!
//! A policy is an immutable version snapshot: re-uploading a document
//! produces a new [`Policy`] with a new id and a bumped version, and the
//! impact analyzer compares the rule sets of two such snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vigil_core::{PolicyId, TenantId};

/// One version of a compliance policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique identifier of this version.
    pub policy_id: PolicyId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Human-readable policy name, stable across versions.
    pub name: String,
    /// Monotonically increasing version number.
    pub version: u32,
    /// Whether this version's rules participate in scans.
    pub active: bool,
    /// When this version was created.
    pub created_at: DateTime<Utc>,
}

impl Policy {
    /// Create the first active version of a policy.
    pub fn new(tenant_id: TenantId, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            policy_id: PolicyId::new(),
            tenant_id,
            name: name.into(),
            version: 1,
            active: true,
            created_at,
        }
    }

    /// Create the next version of this policy, active, with a fresh id.
    pub fn next_version(&self, created_at: DateTime<Utc>) -> Self {
        Self {
            policy_id: PolicyId::new(),
            tenant_id: self.tenant_id,
            name: self.name.clone(),
            version: self.version + 1,
            active: true,
            created_at,
        }
    }
}
