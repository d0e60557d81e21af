//! # Data Sources
//!
//! The scan pulls its record batch through the [`DataSource`] seam, so the
//! pipeline is independent of where tenant data actually lives.
//! [`StaticDataSource`] backs the seam with a fixed batch for tests and
//! replays.

use vigil_core::{Record, TenantId};

use crate::error::ScanError;

/// Producer of the record batch a scan runs over.
pub trait DataSource: Send + Sync {
    /// Fetch the tenant's records.
    fn fetch_records(&self, tenant_id: TenantId) -> Result<Vec<Record>, ScanError>;
}

/// A fixed record batch, returned to any tenant.
#[derive(Debug, Clone, Default)]
pub struct StaticDataSource {
    records: Vec<Record>,
}

impl StaticDataSource {
    /// Create a source over a fixed batch.
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl DataSource for StaticDataSource {
    fn fetch_records(&self, _tenant_id: TenantId) -> Result<Vec<Record>, ScanError> {
        Ok(self.records.clone())
    }
}
