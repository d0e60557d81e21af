//! # User Directory
//!
//! Assignment needs to know who can take a case and how loaded they are.
//! The [`UserDirectory`] trait is that seam: the engine asks for candidates
//! by tenant and role, the directory answers with user ids and their
//! current non-terminal case counts. [`StaticUserDirectory`] backs the
//! trait with a fixed roster plus the case store for live counts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use vigil_core::{TenantId, UserId};

use crate::case::CasePriority;
use crate::store::InMemoryCaseStore;

/// Platform role, ordered from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    ComplianceAdmin,
    Reviewer,
    Viewer,
}

impl UserRole {
    /// The canonical string label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::ComplianceAdmin => "compliance_admin",
            Self::Reviewer => "reviewer",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Roles allowed to own a case of the given priority.
pub fn eligible_roles(priority: CasePriority) -> &'static [UserRole] {
    match priority {
        CasePriority::Critical => &[UserRole::SuperAdmin, UserRole::ComplianceAdmin],
        CasePriority::High => &[UserRole::ComplianceAdmin, UserRole::Reviewer],
        CasePriority::Medium => &[UserRole::Reviewer],
        CasePriority::Low => &[UserRole::Reviewer, UserRole::Viewer],
    }
}

/// A user eligible for assignment, with their current workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssigneeCandidate {
    /// The candidate's id.
    pub user_id: UserId,
    /// Non-terminal cases currently assigned to them.
    pub active_cases: usize,
}

/// Source of assignable users for a tenant.
pub trait UserDirectory: Send + Sync {
    /// Active users of the tenant holding any of `roles`, with their
    /// non-terminal case counts.
    fn candidates(&self, tenant_id: TenantId, roles: &[UserRole]) -> Vec<AssigneeCandidate>;

    /// The user escalated cases are handed to. Least-loaded active
    /// compliance admin of the tenant, if any.
    fn escalation_admin(&self, tenant_id: TenantId) -> Option<UserId>;
}

/// One roster entry of a [`StaticUserDirectory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role: UserRole,
    pub active: bool,
}

/// Fixed-roster directory. Workload counts come from the case store at
/// query time, so assignment always sees current loads.
pub struct StaticUserDirectory {
    users: Vec<DirectoryUser>,
    store: Arc<InMemoryCaseStore>,
}

impl StaticUserDirectory {
    /// Create a directory over a fixed roster.
    pub fn new(users: Vec<DirectoryUser>, store: Arc<InMemoryCaseStore>) -> Self {
        Self { users, store }
    }
}

impl UserDirectory for StaticUserDirectory {
    fn candidates(&self, tenant_id: TenantId, roles: &[UserRole]) -> Vec<AssigneeCandidate> {
        self.users
            .iter()
            .filter(|u| u.tenant_id == tenant_id && u.active && roles.contains(&u.role))
            .map(|u| AssigneeCandidate {
                user_id: u.user_id,
                active_cases: self.store.active_case_count(u.user_id),
            })
            .collect()
    }

    fn escalation_admin(&self, tenant_id: TenantId) -> Option<UserId> {
        self.candidates(tenant_id, &[UserRole::ComplianceAdmin])
            .into_iter()
            .min_by_key(|c| (c.active_cases, c.user_id))
            .map(|c| c.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_user(tenant_id: TenantId, role: UserRole, active: bool) -> DirectoryUser {
        DirectoryUser {
            user_id: UserId::new(),
            tenant_id,
            role,
            active,
        }
    }

    #[test]
    fn candidates_filter_by_tenant_role_and_active() {
        let store = Arc::new(InMemoryCaseStore::new());
        let tenant = TenantId::new();
        let other_tenant = TenantId::new();

        let reviewer = roster_user(tenant, UserRole::Reviewer, true);
        let inactive = roster_user(tenant, UserRole::Reviewer, false);
        let viewer = roster_user(tenant, UserRole::Viewer, true);
        let foreign = roster_user(other_tenant, UserRole::Reviewer, true);
        let directory = StaticUserDirectory::new(
            vec![reviewer, inactive, viewer, foreign],
            Arc::clone(&store),
        );

        let found = directory.candidates(tenant, &[UserRole::Reviewer]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_id, reviewer.user_id);
        assert_eq!(found[0].active_cases, 0);
    }

    #[test]
    fn critical_cases_go_to_admin_roles_only() {
        let roles = eligible_roles(CasePriority::Critical);
        assert!(roles.contains(&UserRole::SuperAdmin));
        assert!(roles.contains(&UserRole::ComplianceAdmin));
        assert!(!roles.contains(&UserRole::Reviewer));
    }

    #[test]
    fn escalation_admin_requires_a_compliance_admin() {
        let store = Arc::new(InMemoryCaseStore::new());
        let tenant = TenantId::new();
        let reviewer_only = StaticUserDirectory::new(
            vec![roster_user(tenant, UserRole::Reviewer, true)],
            Arc::clone(&store),
        );
        assert!(reviewer_only.escalation_admin(tenant).is_none());

        let admin = roster_user(tenant, UserRole::ComplianceAdmin, true);
        let with_admin = StaticUserDirectory::new(vec![admin], store);
        assert_eq!(with_admin.escalation_admin(tenant), Some(admin.user_id));
    }
}
