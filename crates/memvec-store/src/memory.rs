//! In-memory document store.
//!
//! Records live in a copy-on-write list behind a `RwLock`. Writers are
//! serialized by the lock; readers take a [`Snapshot`] (an `Arc` clone of the
//! list) and scan it without holding the lock, so a scan never observes a
//! store mid-mutation.

use std::sync::Arc;

use memvec_core::{Error, Metadata, NewRecord, Record, RecordId, Result};
use ndarray::Array1;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

/// Thread-safe in-memory store of (content, metadata, embedding) records.
#[derive(Debug)]
pub struct DocumentStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    /// Sorted by ascending id (ids are handed out monotonically).
    records: Arc<Vec<Arc<Record>>>,
    /// Embedding length, fixed by the first insert.
    dimension: Option<usize>,
    next_id: u64,
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub records: usize,
    pub dimension: Option<usize>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                records: Arc::new(Vec::new()),
                dimension: None,
                next_id: 1,
            }),
        }
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Insert a record. The first insert fixes the store's dimension.
    pub fn insert(
        &self,
        content: impl Into<String>,
        metadata: Metadata,
        embedding: Array1<f64>,
    ) -> Result<RecordId> {
        let mut inner = self.inner.write();
        check_embedding(inner.dimension, &embedding)?;

        let id = inner.push(content.into(), metadata, embedding);
        debug!("Inserted {} (dim={:?})", id, inner.dimension);
        Ok(id)
    }

    /// Insert many records atomically: every embedding is validated before
    /// any record is stored.
    pub fn insert_batch<I>(&self, batch: I) -> Result<Vec<RecordId>>
    where
        I: IntoIterator<Item = NewRecord>,
    {
        let batch: Vec<NewRecord> = batch.into_iter().collect();
        let mut inner = self.inner.write();

        let mut dimension = inner.dimension;
        for new in &batch {
            check_embedding(dimension, &new.embedding)?;
            dimension.get_or_insert(new.embedding.len());
        }

        let ids: Vec<RecordId> = batch
            .into_iter()
            .map(|new| inner.push(new.content, new.metadata, new.embedding))
            .collect();
        debug!("Inserted batch of {} records", ids.len());
        Ok(ids)
    }

    /// Remove a record. Other ids are unaffected.
    pub fn remove(&self, id: RecordId) -> Result<()> {
        let mut inner = self.inner.write();
        let pos = inner
            .records
            .binary_search_by_key(&id, |r| r.id)
            .map_err(|_| Error::NotFound(id))?;
        Arc::make_mut(&mut inner.records).remove(pos);
        debug!("Removed {}", id);
        Ok(())
    }

    /// Drop every record. The dimension stays fixed.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        let dropped = inner.records.len();
        inner.records = Arc::new(Vec::new());
        info!("Cleared {} records", dropped);
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    pub fn get(&self, id: RecordId) -> Result<Arc<Record>> {
        let inner = self.inner.read();
        inner
            .records
            .binary_search_by_key(&id, |r| r.id)
            .map(|pos| Arc::clone(&inner.records[pos]))
            .map_err(|_| Error::NotFound(id))
    }

    /// A consistent view of every record as of this call.
    pub fn all(&self) -> Snapshot {
        let inner = self.inner.read();
        Snapshot {
            records: Arc::clone(&inner.records),
            dimension: inner.dimension,
        }
    }

    pub fn count(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().dimension
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read();
        StoreStats {
            records: inner.records.len(),
            dimension: inner.dimension,
        }
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreInner {
    /// Append an already-validated record.
    fn push(&mut self, content: String, metadata: Metadata, embedding: Array1<f64>) -> RecordId {
        let id = RecordId(self.next_id);
        self.next_id += 1;
        self.dimension.get_or_insert(embedding.len());
        Arc::make_mut(&mut self.records).push(Arc::new(Record {
            id,
            content,
            metadata,
            embedding,
        }));
        id
    }
}

fn check_embedding(dimension: Option<usize>, embedding: &Array1<f64>) -> Result<()> {
    if embedding.is_empty() {
        return Err(Error::EmptyEmbedding);
    }
    if let Some(expected) = dimension {
        if embedding.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidArgument(
            "embedding contains NaN or infinite components".into(),
        ));
    }
    Ok(())
}

/// Point-in-time view of the store. Iterate it as often as needed; each
/// traversal sees the same records in insertion order.
#[derive(Debug, Clone)]
pub struct Snapshot {
    records: Arc<Vec<Arc<Record>>>,
    dimension: Option<usize>,
}

impl Snapshot {
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Record>> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Arc<Record>;
    type IntoIter = std::slice::Iter<'a, Arc<Record>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memvec_core::MetadataValue;
    use ndarray::array;

    fn source(name: &str) -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("source".into(), MetadataValue::from(name));
        meta
    }

    #[test]
    fn test_insert_and_get() {
        let store = DocumentStore::new();
        let id = store
            .insert(
                "Dogs are great companions.",
                source("mammal-pets-doc"),
                array![1.0, 0.0],
            )
            .unwrap();

        let record = store.get(id).unwrap();
        assert_eq!(record.content, "Dogs are great companions.");
        assert_eq!(record.metadata["source"], MetadataValue::from("mammal-pets-doc"));
        assert_eq!(store.count(), 1);
        assert_eq!(store.dimension(), Some(2));
    }

    #[test]
    fn test_dimension_mismatch_inserts_nothing() {
        let store = DocumentStore::new();
        store.insert("a", Metadata::new(), array![1.0, 0.0]).unwrap();

        let err = store
            .insert("b", Metadata::new(), array![1.0, 0.0, 0.0])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_empty_embedding_rejected() {
        let store = DocumentStore::new();
        let err = store
            .insert("a", Metadata::new(), Array1::zeros(0))
            .unwrap_err();
        assert!(matches!(err, Error::EmptyEmbedding));
        assert_eq!(store.dimension(), None);
    }

    #[test]
    fn test_non_finite_rejected() {
        let store = DocumentStore::new();
        let err = store
            .insert("a", Metadata::new(), array![f64::NAN, 1.0])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let store = DocumentStore::new();
        let err = store
            .insert_batch(vec![
                NewRecord::new("a", Metadata::new(), vec![1.0, 0.0]),
                NewRecord::new("b", Metadata::new(), vec![0.0, 1.0]),
                NewRecord::new("c", Metadata::new(), vec![1.0]),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
        assert_eq!(store.count(), 0);
        assert_eq!(store.dimension(), None);

        let ids = store
            .insert_batch(vec![
                NewRecord::new("a", Metadata::new(), vec![1.0, 0.0]),
                NewRecord::new("b", Metadata::new(), vec![0.0, 1.0]),
            ])
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);
        assert_eq!(store.dimension(), Some(2));
    }

    #[test]
    fn test_remove_keeps_other_ids() {
        let store = DocumentStore::new();
        let a = store.insert("a", Metadata::new(), array![1.0]).unwrap();
        let b = store.insert("b", Metadata::new(), array![2.0]).unwrap();
        let c = store.insert("c", Metadata::new(), array![3.0]).unwrap();

        store.remove(b).unwrap();
        assert!(matches!(store.get(b), Err(Error::NotFound(id)) if id == b));
        assert!(matches!(store.remove(b), Err(Error::NotFound(_))));
        assert_eq!(store.get(a).unwrap().content, "a");
        assert_eq!(store.get(c).unwrap().content, "c");

        let d = store.insert("d", Metadata::new(), array![4.0]).unwrap();
        assert!(d > c);
    }

    #[test]
    fn test_snapshot_is_isolated_and_restartable() {
        let store = DocumentStore::new();
        store.insert("a", Metadata::new(), array![1.0]).unwrap();
        store.insert("b", Metadata::new(), array![2.0]).unwrap();

        let snapshot = store.all();
        store.insert("c", Metadata::new(), array![3.0]).unwrap();
        store.remove(RecordId(1)).unwrap();

        let first: Vec<&str> = snapshot.iter().map(|r| r.content.as_str()).collect();
        let second: Vec<&str> = snapshot.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(first, vec!["a", "b"]);
        assert_eq!(first, second);

        let current = store.all();
        let fresh: Vec<&str> = current.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(fresh, vec!["b", "c"]);
    }

    #[test]
    fn test_clear_keeps_dimension() {
        let store = DocumentStore::new();
        store.insert("a", Metadata::new(), array![1.0, 0.0]).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert!(matches!(
            store.insert("b", Metadata::new(), array![1.0]),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let store = Arc::new(DocumentStore::new());
        store.insert("seed", Metadata::new(), array![1.0, 1.0]).unwrap();

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..100 {
                    store
                        .insert(format!("doc {}", i), Metadata::new(), array![i as f64, 1.0])
                        .unwrap();
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let snapshot = store.all();
                        let ids: Vec<RecordId> = snapshot.iter().map(|r| r.id).collect();
                        assert!(ids.windows(2).all(|w| w[0] < w[1]));
                        assert_eq!(ids.len(), snapshot.len());
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.count(), 101);
    }
}
