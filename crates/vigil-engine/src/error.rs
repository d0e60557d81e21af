//! Scan orchestration errors.

use thiserror::Error;

/// Errors that abort a scan before evaluation starts. Failures inside the
/// pipeline (a bad rule, a cold model, an unassignable case) degrade per
/// item instead of surfacing here.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The data source could not produce the record batch.
    #[error("data source failure")]
    DataSource(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}
