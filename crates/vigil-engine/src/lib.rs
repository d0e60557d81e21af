//! # vigil-engine — Scan Orchestration
//!
//! Wires the detection pipeline together and runs it per tenant:
//!
//! - **Scan** ([`scan`]): Records against every active policy, each match
//!   anomaly-scored, risk-blended, stored, and paired with its
//!   remediation case.
//!
//! - **Stores** ([`store`]): In-memory violation and policy storage; the
//!   policy store also serves the impact analyzer's read seam.
//!
//! - **Source** ([`source`]): The [`DataSource`] seam the scan pulls its
//!   record batch through.
//!
//! - **Analytics** ([`analytics`]): Week-over-week risk trend and the
//!   per-account anomaly heatmap.

pub mod analytics;
pub mod error;
pub mod scan;
pub mod source;
pub mod store;

pub use analytics::{AccountRisk, RiskHeatmap, RiskTrend, TrendDirection, HEATMAP_LIMIT};
pub use error::ScanError;
pub use scan::{PolicyScanSummary, ScanEngine, ScanReport, SeverityCounts};
pub use source::{DataSource, StaticDataSource};
pub use store::{InMemoryPolicyStore, InMemoryViolationStore};
