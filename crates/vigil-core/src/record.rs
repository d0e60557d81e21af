//! # Input Records
//!
//! A [`Record`] is one row of tabular input: a flat mapping of field name to
//! JSON value. The schema is connector-defined and may vary per batch, so
//! every accessor is total — a missing field or a value of the wrong shape
//! reads as `None` and never raises.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Conventional field carrying the stable identity of a record across
/// retries of the same batch.
pub const RECORD_ID_FIELD: &str = "transaction_id";

/// One flat row of input data.
///
/// Fields are kept in a `BTreeMap` so iteration order is deterministic,
/// which keeps evaluation and feature extraction reproducible for a given
/// batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from field/value pairs.
    pub fn from_fields<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Set a field value, replacing any existing one.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Whether the record carries the given field at all.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Raw value lookup.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Numeric view of a field. Only JSON numbers qualify; strings that
    /// happen to look numeric do not (the upstream connector owns typing).
    pub fn number(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }

    /// String form of a field, for pattern matching and reporting.
    ///
    /// Strings are returned as-is; numbers and booleans are formatted;
    /// `null` and missing fields read as `None`.
    pub fn display_value(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Parse a field as a UTC timestamp.
    ///
    /// Accepts RFC 3339 and the bare `YYYY-MM-DD HH:MM:SS` form common in
    /// CSV exports. Unparseable values read as `None`.
    pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        let raw = self.fields.get(field)?.as_str()?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// The record's stable identity, taken from the conventional
    /// `transaction_id` field. Empty when the connector supplies none.
    pub fn record_id(&self) -> String {
        self.display_value(RECORD_ID_FIELD).unwrap_or_default()
    }

    /// Iterate over all fields in deterministic (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
