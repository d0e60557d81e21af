//! # In-Memory Case Store
//!
//! Concurrent map of remediation cases keyed by case id, with a secondary
//! index enforcing the one-case-per-violation invariant. `DashMap` gives
//! per-entry locking, so updates to different cases never contend and
//! updates to the same case are serialized.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use vigil_core::{CaseId, TenantId, UserId, ViolationId};

use crate::case::RemediationCase;
use crate::error::RemediationError;

/// Thread-safe case storage.
#[derive(Debug, Default)]
pub struct InMemoryCaseStore {
    cases: DashMap<CaseId, RemediationCase>,
    by_violation: DashMap<ViolationId, CaseId>,
}

impl InMemoryCaseStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new case. Fails if the violation already has one; the
    /// secondary-index entry is claimed first so two concurrent inserts for
    /// the same violation cannot both succeed.
    pub fn insert(&self, case: RemediationCase) -> Result<(), RemediationError> {
        match self.by_violation.entry(case.violation_id) {
            Entry::Occupied(existing) => Err(RemediationError::DuplicateCase {
                violation_id: case.violation_id,
                existing: *existing.get(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(case.case_id);
                self.cases.insert(case.case_id, case);
                Ok(())
            }
        }
    }

    /// Fetch a snapshot of a case.
    pub fn get(&self, case_id: CaseId) -> Option<RemediationCase> {
        self.cases.get(&case_id).map(|entry| entry.clone())
    }

    /// Look up the case backing a violation.
    pub fn case_for_violation(&self, violation_id: ViolationId) -> Option<CaseId> {
        self.by_violation.get(&violation_id).map(|entry| *entry)
    }

    /// Apply a mutation to a case under its entry lock. Returns the updated
    /// snapshot, or an error from the mutation.
    pub fn update<F>(&self, case_id: CaseId, mutate: F) -> Result<RemediationCase, RemediationError>
    where
        F: FnOnce(&mut RemediationCase) -> Result<(), RemediationError>,
    {
        let mut entry = self
            .cases
            .get_mut(&case_id)
            .ok_or(RemediationError::CaseNotFound(case_id))?;
        mutate(entry.value_mut())?;
        Ok(entry.clone())
    }

    /// Remove a case and its violation index entry.
    pub fn remove(&self, case_id: CaseId) -> Option<RemediationCase> {
        let (_, case) = self.cases.remove(&case_id)?;
        self.by_violation.remove(&case.violation_id);
        Some(case)
    }

    /// Snapshot of all case ids. Taken up front by the sweep so that it
    /// iterates without holding shard locks across updates.
    pub fn case_ids(&self) -> Vec<CaseId> {
        self.cases.iter().map(|entry| *entry.key()).collect()
    }

    /// All cases for a tenant, as snapshots.
    pub fn cases_for_tenant(&self, tenant_id: TenantId) -> Vec<RemediationCase> {
        self.cases
            .iter()
            .filter(|entry| entry.tenant_id == tenant_id)
            .map(|entry| entry.clone())
            .collect()
    }

    /// Number of non-terminal cases assigned to a user, across tenants.
    pub fn active_case_count(&self, user_id: UserId) -> usize {
        self.cases
            .iter()
            .filter(|entry| entry.assigned_to == Some(user_id) && !entry.status.is_terminal())
            .count()
    }

    /// Total number of cases held.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether the store holds no cases.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
