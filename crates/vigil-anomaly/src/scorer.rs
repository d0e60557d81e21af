//! # Per-Tenant Anomaly Scoring
//!
//! [`AnomalyScorer`] owns one trained model (forest + scaler) per tenant.
//! Models are cached in memory, optionally persisted as JSON under a model
//! directory, and reused across scoring calls until retrained.
//!
//! Scoring is fail-open: when no model exists and the current batch cannot
//! train one, every record scores 0.0 and is not flagged. A scan never
//! fails because the statistical layer is cold.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use vigil_core::{EngineConfig, Record, Severity, TenantId};

use crate::error::AnomalyError;
use crate::features::{extract_features, FEATURE_NAMES};
use crate::forest::IsolationForest;
use crate::scaler::StandardScaler;

/// Result of a training request. Insufficient data is a contract outcome,
/// not an error — the caller decides whether to retry with more records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrainingOutcome {
    /// A model was fitted, cached, and (when configured) persisted.
    Success(TrainingSummary),
    /// Fewer records than the configured minimum; no state changed.
    InsufficientData {
        /// Records supplied.
        records: usize,
        /// Records required.
        required: usize,
    },
}

/// Details of a successful fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Number of training records.
    pub records: usize,
    /// Names of the extracted features, in vector order.
    pub features: Vec<String>,
}

/// Per-record scoring verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyVerdict {
    /// Outlier score in [0, 1]; higher is more anomalous.
    pub score: f64,
    /// Whether the score exceeds the configured flag threshold.
    pub anomalous: bool,
}

impl AnomalyVerdict {
    /// The verdict scored when no model is available (fail-open).
    pub fn benign() -> Self {
        Self {
            score: 0.0,
            anomalous: false,
        }
    }
}

/// A tenant's trained state: the outlier model plus the scaler that
/// produced its feature space. The two are fitted and persisted together.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TenantModel {
    forest: IsolationForest,
    scaler: StandardScaler,
}

/// Per-tenant anomaly scorer with a keyed model cache.
///
/// ## Concurrency
///
/// Training for a tenant runs under that tenant's mutex, and a completed
/// model is published with an atomic map insert of a fresh `Arc` —
/// concurrent scoring either sees the old model or the new one, never a
/// half-written slot. Scoring itself takes no lock beyond the map read.
pub struct AnomalyScorer {
    config: EngineConfig,
    models: DashMap<TenantId, Arc<TenantModel>>,
    train_locks: DashMap<TenantId, Arc<Mutex<()>>>,
    model_dir: Option<PathBuf>,
}

impl std::fmt::Debug for AnomalyScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnomalyScorer")
            .field("cached_models", &self.models.len())
            .field("model_dir", &self.model_dir)
            .finish_non_exhaustive()
    }
}

impl AnomalyScorer {
    /// Create an in-memory-only scorer.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            models: DashMap::new(),
            train_locks: DashMap::new(),
            model_dir: None,
        }
    }

    /// Create a scorer that also persists trained models as JSON files
    /// under `model_dir` and reloads them on a cache miss.
    pub fn with_model_dir(config: EngineConfig, model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: Some(model_dir.into()),
            ..Self::new(config)
        }
    }

    /// Whether a model for the tenant is currently cached in memory.
    pub fn has_cached_model(&self, tenant_id: &TenantId) -> bool {
        self.models.contains_key(tenant_id)
    }

    /// Drop the tenant's model from memory (a later score call will reload
    /// from disk or retrain).
    pub fn invalidate(&self, tenant_id: &TenantId) {
        self.models.remove(tenant_id);
    }

    /// Train (or retrain) the tenant's model from `records`.
    ///
    /// Requires at least the configured minimum number of records;
    /// anything less returns [`TrainingOutcome::InsufficientData`] and
    /// leaves any existing model untouched. Persistence failure after a
    /// successful fit is logged and swallowed — the in-memory model is
    /// kept (fail-open).
    pub fn train(&self, tenant_id: TenantId, records: &[Record]) -> TrainingOutcome {
        if records.len() < self.config.min_training_records {
            return TrainingOutcome::InsufficientData {
                records: records.len(),
                required: self.config.min_training_records,
            };
        }

        let lock = self.train_lock(tenant_id);
        let _guard = lock.lock();

        let features = extract_features(records);
        let scaler = StandardScaler::fit(&features);
        let scaled = scaler.transform(&features);
        let forest = IsolationForest::fit(
            &scaled,
            self.config.forest_trees,
            self.config.forest_max_samples,
            self.config.contamination,
            self.config.forest_seed,
        );

        let model = Arc::new(TenantModel { forest, scaler });

        if let Err(err) = self.persist(&tenant_id, &model) {
            tracing::warn!(
                tenant_id = %tenant_id,
                error = %err,
                "trained model could not be persisted; keeping in-memory copy"
            );
        }
        self.models.insert(tenant_id, model);

        tracing::debug!(tenant_id = %tenant_id, records = records.len(), "anomaly model trained");
        TrainingOutcome::Success(TrainingSummary {
            records: records.len(),
            features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Score a batch for the tenant.
    ///
    /// Resolution order for the model: memory cache, then the model
    /// directory, then an opportunistic training run on the batch itself.
    /// If all three fail, every record gets the benign verdict (score 0.0,
    /// not anomalous) — fail-open, never fail-closed.
    pub fn score(&self, tenant_id: TenantId, records: &[Record]) -> Vec<AnomalyVerdict> {
        let Some(model) = self.resolve_model(tenant_id, records) else {
            return vec![AnomalyVerdict::benign(); records.len()];
        };

        let features = extract_features(records);
        let scaled = model.scaler.transform(&features);
        model
            .forest
            .decisions(&scaled)
            .into_iter()
            .map(|decision| {
                // Monotonically decreasing sigmoid: a more anomalous (more
                // negative) decision maps toward 1.0.
                let score = (1.0 / (1.0 + decision.exp())).clamp(0.0, 1.0);
                AnomalyVerdict {
                    score,
                    anomalous: score > self.config.anomaly_flag_threshold,
                }
            })
            .collect()
    }

    fn resolve_model(&self, tenant_id: TenantId, records: &[Record]) -> Option<Arc<TenantModel>> {
        if let Some(model) = self.models.get(&tenant_id) {
            return Some(Arc::clone(&model));
        }

        match self.load(&tenant_id) {
            Ok(Some(model)) => {
                let model = Arc::new(model);
                self.models.insert(tenant_id, Arc::clone(&model));
                return Some(model);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(tenant_id = %tenant_id, error = %err, "stored model unreadable");
            }
        }

        match self.train(tenant_id, records) {
            TrainingOutcome::Success(_) => self.models.get(&tenant_id).map(|m| Arc::clone(&m)),
            TrainingOutcome::InsufficientData { records, required } => {
                tracing::debug!(
                    tenant_id = %tenant_id,
                    records,
                    required,
                    "no model and batch too small to train; scoring fail-open"
                );
                None
            }
        }
    }

    fn train_lock(&self, tenant_id: TenantId) -> Arc<Mutex<()>> {
        Arc::clone(
            &self
                .train_locks
                .entry(tenant_id)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn model_path(&self, dir: &Path, tenant_id: &TenantId) -> PathBuf {
        dir.join(format!("{tenant_id}.model.json"))
    }

    fn persist(&self, tenant_id: &TenantId, model: &TenantModel) -> Result<(), AnomalyError> {
        let Some(dir) = &self.model_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_vec(model)?;
        std::fs::write(self.model_path(dir, tenant_id), json)?;
        Ok(())
    }

    fn load(&self, tenant_id: &TenantId) -> Result<Option<TenantModel>, AnomalyError> {
        let Some(dir) = &self.model_dir else {
            return Ok(None);
        };
        let path = self.model_path(dir, tenant_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

/// Qualitative risk level for an anomaly score, used in heatmaps and
/// anomaly listings.
pub fn risk_level_for_score(score: f64) -> Severity {
    if score >= 0.9 {
        Severity::Critical
    } else if score >= 0.75 {
        Severity::High
    } else if score >= 0.5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Synthetic batch: steady mid-size transactions plus a couple of
    /// extreme ones at the end.
    fn training_batch(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                let amount = 100.0 + (i % 17) as f64 * 3.5;
                Record::from_fields([
                    ("transaction_id", json!(format!("tx-{i}"))),
                    ("amount", json!(amount)),
                    ("account_id", json!(format!("acc-{}", i % 9))),
                    (
                        "timestamp",
                        json!(format!("2026-03-{:02}T{:02}:00:00Z", 1 + i % 28, i % 24)),
                    ),
                ])
            })
            .collect()
    }

    fn outlier_record() -> Record {
        Record::from_fields([
            ("transaction_id", json!("tx-outlier")),
            ("amount", json!(5_000_000.0)),
            ("account_id", json!("acc-shadow")),
            ("timestamp", json!("2026-03-15T03:00:00Z")),
        ])
    }

    #[test]
    fn training_below_minimum_is_insufficient_data() {
        let scorer = AnomalyScorer::new(EngineConfig::default());
        let tenant = TenantId::new();
        let outcome = scorer.train(tenant, &training_batch(99));
        assert_eq!(
            outcome,
            TrainingOutcome::InsufficientData {
                records: 99,
                required: 100
            }
        );
        assert!(!scorer.has_cached_model(&tenant));
    }

    #[test]
    fn training_at_minimum_succeeds_and_caches() {
        let scorer = AnomalyScorer::new(EngineConfig::default());
        let tenant = TenantId::new();
        match scorer.train(tenant, &training_batch(100)) {
            TrainingOutcome::Success(summary) => {
                assert_eq!(summary.records, 100);
                assert_eq!(summary.features.len(), crate::features::FEATURE_COUNT);
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert!(scorer.has_cached_model(&tenant));
    }

    #[test]
    fn scoring_without_model_or_trainable_batch_is_fail_open() {
        let scorer = AnomalyScorer::new(EngineConfig::default());
        let verdicts = scorer.score(TenantId::new(), &training_batch(10));
        assert_eq!(verdicts.len(), 10);
        for v in verdicts {
            assert_eq!(v.score, 0.0);
            assert!(!v.anomalous);
        }
    }

    #[test]
    fn scoring_trains_opportunistically_from_a_large_batch() {
        let scorer = AnomalyScorer::new(EngineConfig::default());
        let tenant = TenantId::new();
        let verdicts = scorer.score(tenant, &training_batch(150));
        assert_eq!(verdicts.len(), 150);
        assert!(scorer.has_cached_model(&tenant));
        for v in verdicts {
            assert!((0.0..=1.0).contains(&v.score));
        }
    }

    #[test]
    fn extreme_record_scores_above_typical_records() {
        let scorer = AnomalyScorer::new(EngineConfig::default());
        let tenant = TenantId::new();
        let batch = training_batch(200);
        scorer.train(tenant, &batch);

        let mut probe = batch[..20].to_vec();
        probe.push(outlier_record());
        let verdicts = scorer.score(tenant, &probe);

        let outlier = verdicts.last().unwrap().score;
        let typical_max = verdicts[..20]
            .iter()
            .map(|v| v.score)
            .fold(0.0_f64, f64::max);
        assert!(
            outlier > typical_max,
            "outlier {outlier} vs typical max {typical_max}"
        );
    }

    #[test]
    fn models_never_cross_tenants() {
        let scorer = AnomalyScorer::new(EngineConfig::default());
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();
        scorer.train(tenant_a, &training_batch(120));
        assert!(scorer.has_cached_model(&tenant_a));
        assert!(!scorer.has_cached_model(&tenant_b));
        // Tenant B scoring on a small batch stays fail-open rather than
        // borrowing tenant A's model.
        let verdicts = scorer.score(tenant_b, &training_batch(5));
        assert!(verdicts.iter().all(|v| v.score == 0.0));
    }

    #[test]
    fn trained_model_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let tenant = TenantId::new();
        let batch = training_batch(150);

        let scorer = AnomalyScorer::with_model_dir(EngineConfig::default(), dir.path());
        scorer.train(tenant, &batch);
        let before = scorer.score(tenant, &batch[..10]);

        // A fresh scorer with the same directory reloads from disk.
        let reloaded = AnomalyScorer::with_model_dir(EngineConfig::default(), dir.path());
        assert!(!reloaded.has_cached_model(&tenant));
        let after = reloaded.score(tenant, &batch[..10]);
        assert!(reloaded.has_cached_model(&tenant));
        assert_eq!(before, after);
    }

    #[test]
    fn invalidate_drops_the_cached_model() {
        let scorer = AnomalyScorer::new(EngineConfig::default());
        let tenant = TenantId::new();
        scorer.train(tenant, &training_batch(120));
        scorer.invalidate(&tenant);
        assert!(!scorer.has_cached_model(&tenant));
    }

    #[test]
    fn risk_levels_follow_score_bands() {
        assert_eq!(risk_level_for_score(0.95), Severity::Critical);
        assert_eq!(risk_level_for_score(0.80), Severity::High);
        assert_eq!(risk_level_for_score(0.60), Severity::Medium);
        assert_eq!(risk_level_for_score(0.10), Severity::Low);
    }
}
