//! Airtable record access
//!
//! Field value model, the `RecordUpdater` seam and the HTTP client behind it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod client;

pub use client::AirtableClient;

/// Record store errors
#[derive(Error, Debug)]
pub enum AirtableError {
    /// The store answered with a non-success status; carries the status text
    #[error("Airtable API error: {0}")]
    ExternalApi(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response has no fields member")]
    InvalidResponse,

    #[error("invalid record url: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, AirtableError>;

/// A single cell value.
///
/// Airtable fields are loosely typed; anything JSON can carry is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

/// Field name to value
pub type Fields = BTreeMap<String, FieldValue>;

impl FieldValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::Text(s),
            Value::Array(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::from_json).collect())
            }
            Value::Object(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Number(n) => Value::Number(n.clone()),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::List(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            FieldValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Null)
    }
}

/// Convert a JSON object into fields; anything else is rejected
pub fn fields_from_json(value: Value) -> Option<Fields> {
    match value {
        Value::Object(map) => Some(
            map.into_iter()
                .map(|(k, v)| (k, FieldValue::from_json(v)))
                .collect(),
        ),
        _ => None,
    }
}

/// Fields as a JSON object
pub fn fields_to_json(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// Partial update of one record
#[async_trait]
pub trait RecordUpdater: Send + Sync {
    /// Merge `updates` into the record and return the record's fields as stored
    async fn update_record(
        &self,
        table_name: &str,
        record_id: &str,
        updates: Fields,
    ) -> Result<Fields>;
}
