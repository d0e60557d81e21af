//! # vigil-anomaly — Statistical Outlier Scoring
//!
//! Maintains one outlier-detection model per tenant and converts a record's
//! numeric features into an anomaly score in [0, 1]:
//!
//! - **Features** ([`features`]): Fixed-order feature extraction with
//!   documented defaults for missing source columns.
//!
//! - **Scaler** ([`scaler`]): Column-wise standardization fitted with the
//!   model it serves.
//!
//! - **Forest** ([`forest`]): A seeded isolation forest with a
//!   contamination-quantile decision boundary.
//!
//! - **Scorer** ([`scorer`]): The per-tenant cache (memory + durable JSON)
//!   with the fail-open scoring contract: a cold or broken statistical
//!   layer yields benign verdicts, never a failed scan.

pub mod error;
pub mod features;
pub mod forest;
pub mod scaler;
pub mod scorer;

pub use error::AnomalyError;
pub use features::{extract_features, FEATURE_COUNT, FEATURE_NAMES};
pub use forest::IsolationForest;
pub use scaler::StandardScaler;
pub use scorer::{
    risk_level_for_score, AnomalyScorer, AnomalyVerdict, TrainingOutcome, TrainingSummary,
};
