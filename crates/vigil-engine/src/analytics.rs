//! # Tenant Risk Analytics
//!
//! Read-side aggregations over scan output: the week-over-week risk trend
//! from stored violations, and the per-account anomaly heatmap from the
//! scores observed during scans.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;

use vigil_anomaly::{risk_level_for_score, AnomalyVerdict};
use vigil_core::{Record, Severity, TenantId};

use crate::store::InMemoryViolationStore;

/// Conventional field carrying the account a record belongs to.
const ACCOUNT_FIELD: &str = "account_id";

/// Which way the tenant's average risk is moving week over week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Week-over-week comparison of average final risk scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskTrend {
    /// Average final risk over violations of the last 7 days, two
    /// decimals, zero when none.
    pub current_week_avg_risk: f64,
    /// Average final risk over violations of the 7 days before that.
    pub previous_week_avg_risk: f64,
    /// Relative change, percent, two decimals. Zero when the previous
    /// week had no violations.
    pub risk_change_percent: f64,
    /// Increasing above +20%, decreasing below -20%, otherwise stable.
    pub direction: TrendDirection,
    /// Violations detected in the current week.
    pub current_violations: usize,
    /// Violations detected in the previous week.
    pub previous_violations: usize,
    /// Current-week violations whose anomaly score exceeds the flag
    /// threshold.
    pub current_anomalies: usize,
}

/// One row of the account risk heatmap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRisk {
    /// Account identifier from the source records.
    pub account_id: String,
    /// Mean anomaly score over the account's observed records, three
    /// decimals.
    pub avg_anomaly_score: f64,
    /// Severity band of the mean score.
    pub risk_level: Severity,
    /// Number of scored records behind the mean.
    pub observations: usize,
}

/// Per-account anomaly ranking for a tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskHeatmap {
    /// Riskiest accounts first, capped at [`HEATMAP_LIMIT`].
    pub accounts: Vec<AccountRisk>,
    /// Distinct accounts observed, before the cap.
    pub total_accounts: usize,
}

/// Maximum accounts a heatmap reports.
pub const HEATMAP_LIMIT: usize = 50;

/// Anomaly scores observed per account during scans. Append-only; the
/// heatmap aggregates it on read.
#[derive(Debug, Default)]
pub(crate) struct ScoreLog {
    by_tenant: DashMap<TenantId, Vec<(String, f64)>>,
}

impl ScoreLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record the verdicts of one scored batch. Records without an
    /// account field are skipped.
    pub(crate) fn observe_batch(
        &self,
        tenant_id: TenantId,
        records: &[Record],
        verdicts: &[AnomalyVerdict],
    ) {
        let mut observations = Vec::new();
        for (record, verdict) in records.iter().zip(verdicts) {
            if let Some(account) = record.display_value(ACCOUNT_FIELD) {
                observations.push((account, verdict.score));
            }
        }
        if !observations.is_empty() {
            self.by_tenant
                .entry(tenant_id)
                .or_default()
                .extend(observations);
        }
    }

    fn snapshot(&self, tenant_id: TenantId) -> Vec<(String, f64)> {
        self.by_tenant
            .get(&tenant_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }
}

/// Week-over-week risk trend for a tenant, as of `as_of`.
pub fn risk_trend(
    store: &InMemoryViolationStore,
    tenant_id: TenantId,
    anomaly_flag_threshold: f64,
    as_of: DateTime<Utc>,
) -> RiskTrend {
    let current_start = as_of - Duration::days(7);
    let previous_start = as_of - Duration::days(14);
    let violations = store.for_tenant(tenant_id);

    let current: Vec<_> = violations
        .iter()
        .filter(|v| v.detected_at >= current_start && v.detected_at < as_of)
        .collect();
    let previous: Vec<_> = violations
        .iter()
        .filter(|v| v.detected_at >= previous_start && v.detected_at < current_start)
        .collect();

    let current_avg = mean(current.iter().map(|v| v.final_risk_score));
    let previous_avg = mean(previous.iter().map(|v| v.final_risk_score));
    let change_percent = if previous_avg > 0.0 {
        (current_avg - previous_avg) / previous_avg * 100.0
    } else {
        0.0
    };
    let direction = if change_percent > 20.0 {
        TrendDirection::Increasing
    } else if change_percent < -20.0 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    RiskTrend {
        current_week_avg_risk: round2(current_avg),
        previous_week_avg_risk: round2(previous_avg),
        risk_change_percent: round2(change_percent),
        direction,
        current_violations: current.len(),
        previous_violations: previous.len(),
        current_anomalies: current
            .iter()
            .filter(|v| v.anomaly_score > anomaly_flag_threshold)
            .count(),
    }
}

/// Per-account anomaly heatmap over everything the log has observed.
/// Ties on score break by account id, so the ranking is reproducible.
pub(crate) fn risk_heatmap(log: &ScoreLog, tenant_id: TenantId) -> RiskHeatmap {
    let mut by_account: std::collections::BTreeMap<String, Vec<f64>> =
        std::collections::BTreeMap::new();
    for (account, score) in log.snapshot(tenant_id) {
        by_account.entry(account).or_default().push(score);
    }
    let total_accounts = by_account.len();

    let mut accounts: Vec<AccountRisk> = by_account
        .into_iter()
        .map(|(account_id, scores)| {
            let avg = mean(scores.iter().copied());
            AccountRisk {
                account_id,
                avg_anomaly_score: round3(avg),
                risk_level: risk_level_for_score(avg),
                observations: scores.len(),
            }
        })
        .collect();
    accounts.sort_by(|a, b| {
        b.avg_anomaly_score
            .total_cmp(&a.avg_anomaly_score)
            .then_with(|| a.account_id.cmp(&b.account_id))
    });
    accounts.truncate(HEATMAP_LIMIT);

    RiskHeatmap {
        accounts,
        total_accounts,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (mut sum, mut count) = (0.0, 0usize);
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
