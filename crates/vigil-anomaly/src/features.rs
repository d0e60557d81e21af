//! # Feature Extraction
//!
//! Converts a batch of records into fixed-order numeric feature vectors for
//! the outlier model. The vector is always [`FEATURE_COUNT`] wide: a missing
//! source column contributes its documented default instead of changing the
//! shape, so a model trained on one batch can score any later batch.

use vigil_core::Record;

/// Width of every feature vector.
pub const FEATURE_COUNT: usize = 8;

/// Human-readable names of the features, in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "log_amount",
    "amount_zscore",
    "frequency_per_24h",
    "account_risk_score",
    "transaction_velocity",
    "hour_of_day",
    "day_of_week",
    "is_weekend",
];

const AMOUNT: &str = "amount";
const FREQUENCY: &str = "frequency_per_24h";
const ACCOUNT_ID: &str = "account_id";
const ACCOUNT_RISK: &str = "account_risk_score";
const VELOCITY: &str = "transaction_velocity";
const TIMESTAMP: &str = "timestamp";

/// Extract one feature vector per record.
///
/// Feature semantics, in order:
///
/// 1. `log(1 + amount)` — log-scaled magnitude (0 without an amount).
/// 2. `(amount - batch mean) / batch stddev` — z-score across the batch
///    (0 without an amount or when the batch has no spread).
/// 3. Transaction frequency in the current window: the
///    `frequency_per_24h` column when present, else the record count per
///    `account_id` within this batch, else 0.
/// 4. Externally supplied account risk score in [0, 1], default 0.5
///    (unknown/medium).
/// 5. Transaction velocity: the `transaction_velocity` column when
///    present, else `amount / (frequency + 1)`, else 0.
/// 6–8. Hour of day, day of week (Monday = 0), and a weekend indicator,
///    derived from the `timestamp` column when parseable, else 0.
pub fn extract_features(records: &[Record]) -> Vec<Vec<f64>> {
    let amount_stats = AmountStats::of(records);
    let batch_frequency = per_account_counts(records);

    records
        .iter()
        .map(|record| {
            let amount = record.number(AMOUNT);

            let log_amount = amount.map(|a| (1.0 + a).ln()).unwrap_or(0.0);
            let zscore = amount
                .map(|a| amount_stats.zscore(a))
                .unwrap_or(0.0);

            let frequency = record
                .number(FREQUENCY)
                .or_else(|| {
                    record
                        .display_value(ACCOUNT_ID)
                        .and_then(|account| batch_frequency(&account))
                })
                .unwrap_or(0.0);

            let account_risk = record.number(ACCOUNT_RISK).unwrap_or(0.5);

            let velocity = record
                .number(VELOCITY)
                .or_else(|| amount.map(|a| a / (frequency + 1.0)))
                .unwrap_or(0.0);

            let (hour, day_of_week, is_weekend) = match record.timestamp(TIMESTAMP) {
                Some(ts) => {
                    use chrono::{Datelike, Timelike};
                    let dow = ts.weekday().num_days_from_monday() as f64;
                    (ts.hour() as f64, dow, if dow >= 5.0 { 1.0 } else { 0.0 })
                }
                None => (0.0, 0.0, 0.0),
            };

            vec![
                log_amount,
                zscore,
                frequency,
                account_risk,
                velocity,
                hour,
                day_of_week,
                is_weekend,
            ]
        })
        .collect()
}

struct AmountStats {
    mean: f64,
    std: f64,
}

impl AmountStats {
    /// Mean and sample standard deviation of the batch's amounts, over the
    /// records that carry one.
    fn of(records: &[Record]) -> Self {
        let amounts: Vec<f64> = records.iter().filter_map(|r| r.number(AMOUNT)).collect();
        if amounts.len() < 2 {
            return Self { mean: 0.0, std: 0.0 };
        }
        let n = amounts.len() as f64;
        let mean = amounts.iter().sum::<f64>() / n;
        let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Self {
            mean,
            std: variance.sqrt(),
        }
    }

    /// Z-score of one amount. A batch with no spread z-scores to 0 rather
    /// than dividing by zero.
    fn zscore(&self, amount: f64) -> f64 {
        if self.std > f64::EPSILON {
            (amount - self.mean) / self.std
        } else {
            0.0
        }
    }
}

/// Count records per account within the batch; returns a lookup closure.
fn per_account_counts(records: &[Record]) -> impl Fn(&str) -> Option<f64> {
    let mut counts = std::collections::HashMap::new();
    for record in records {
        if let Some(account) = record.display_value(ACCOUNT_ID) {
            *counts.entry(account).or_insert(0u32) += 1;
        }
    }
    move |account: &str| counts.get(account).map(|c| *c as f64)
}
