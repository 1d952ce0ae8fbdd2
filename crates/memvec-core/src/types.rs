//! Data types for records, queries, and search results.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Opaque record identifier.
///
/// Ids come from a monotonic counter and are never reused, so ascending id
/// order is insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record#{}", self.0)
    }
}

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::String(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::String(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Number(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Number(v as f64)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

/// Caller-supplied metadata, opaque to the engine.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Parse a JSON object into metadata.
///
/// Only flat objects of strings, numbers and booleans are accepted; `null`
/// yields empty metadata.
pub fn metadata_from_json(value: serde_json::Value) -> Result<Metadata> {
    match value {
        serde_json::Value::Null => Ok(Metadata::new()),
        serde_json::Value::Object(map) => {
            if let Some((key, _)) = map
                .iter()
                .find(|(_, v)| v.is_null() || v.is_array() || v.is_object())
            {
                return Err(Error::InvalidArgument(format!(
                    "metadata key '{}' must be a string, number or boolean",
                    key
                )));
            }
            Ok(serde_json::from_value(serde_json::Value::Object(map))?)
        }
        other => Err(Error::InvalidArgument(format!(
            "metadata must be a JSON object, got {}",
            other
        ))),
    }
}

/// One stored unit. Immutable once inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub content: String,
    pub metadata: Metadata,
    pub embedding: Array1<f64>,
}

/// A record awaiting insertion: the ingestion triple.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub content: String,
    pub metadata: Metadata,
    pub embedding: Array1<f64>,
}

impl NewRecord {
    pub fn new(
        content: impl Into<String>,
        metadata: Metadata,
        embedding: impl Into<Array1<f64>>,
    ) -> Self {
        Self {
            content: content.into(),
            metadata,
            embedding: embedding.into(),
        }
    }
}

/// A similarity query: text to be embedded, or a raw vector.
#[derive(Debug, Clone)]
pub enum Query {
    Text(String),
    Vector(Array1<f64>),
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Query::Text(text.to_string())
    }
}

impl From<Array1<f64>> for Query {
    fn from(vector: Array1<f64>) -> Self {
        Query::Vector(vector)
    }
}

/// A ranked hit. `record` is a shared view into the store.
#[derive(Debug, Clone)]
pub struct ResultItem {
    pub record: Arc<Record>,
    /// Cosine similarity to the query.
    pub score: f64,
    /// 1-based position in the result list.
    pub rank: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_from_json() {
        let meta = metadata_from_json(serde_json::json!({
            "source": "mammal-pets-doc",
            "page": 3,
            "draft": false,
        }))
        .unwrap();

        assert_eq!(meta["source"], MetadataValue::from("mammal-pets-doc"));
        assert_eq!(meta["page"], MetadataValue::Number(3.0));
        assert_eq!(meta["draft"], MetadataValue::Bool(false));
    }

    #[test]
    fn test_metadata_rejects_nested() {
        let err = metadata_from_json(serde_json::json!({"loc": {"line": 1}})).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = metadata_from_json(serde_json::json!(["a"])).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_null_metadata_is_empty() {
        assert!(metadata_from_json(serde_json::Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_record_id_orders_by_insertion() {
        assert!(RecordId(1) < RecordId(2));
        assert_eq!(RecordId(7).to_string(), "record#7");
    }
}
