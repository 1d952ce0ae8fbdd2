//! Metadata filters applied before ranking.

use memvec_core::{Metadata, MetadataValue, Record};
use serde::{Deserialize, Serialize};

/// Conjunction of `key == value` conditions. An empty filter matches
/// every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    conditions: Metadata,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to equal `value`.
    pub fn equals(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.conditions.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.conditions
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected))
    }

    pub fn matches_record(&self, record: &Record) -> bool {
        self.matches(&record.metadata)
    }
}
