//! LRU query cache for embedding results.
//!
//! Avoids re-embedding repeated query text. The retrieval core never
//! caches; wrap a provider in [`CachedEmbedder`] to opt in.
//! Default: 1000 entries, 1-hour TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use memvec_core::Result;
use ndarray::Array1;
use parking_lot::Mutex;
use tracing::debug;

use crate::provider::EmbeddingProvider;

/// Cached embedding entry with timestamp.
struct CacheEntry {
    embedding: Array1<f64>,
    inserted_at: Instant,
}

/// Thread-safe LRU query cache for embeddings.
pub struct QueryCache {
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Least recently used first.
    order: Vec<String>,
    max_size: usize,
    ttl: Duration,
}

impl CacheInner {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let key = self.order.remove(pos);
            self.order.push(key);
        }
    }

    fn evict(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

impl QueryCache {
    /// Create a new cache with the given capacity and TTL.
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(max_size),
                order: Vec::with_capacity(max_size),
                max_size,
                ttl,
            }),
        }
    }

    /// Create a cache with default settings (1000 entries, 1hr TTL).
    pub fn default_cache() -> Self {
        Self::new(1000, Duration::from_secs(3600))
    }

    /// Get a cached embedding. Returns None on miss or expired entry.
    pub fn get(&self, query: &str) -> Option<Array1<f64>> {
        let mut inner = self.inner.lock();
        let ttl = inner.ttl;

        let fresh = inner
            .entries
            .get(query)
            .map(|e| e.inserted_at.elapsed() < ttl);

        match fresh {
            Some(true) => {
                inner.touch(query);
                inner.entries.get(query).map(|e| e.embedding.clone())
            }
            Some(false) => {
                inner.evict(query);
                None
            }
            None => None,
        }
    }

    /// Insert an embedding into the cache.
    pub fn put(&self, query: String, embedding: Array1<f64>) {
        let mut inner = self.inner.lock();
        if inner.max_size == 0 {
            return;
        }

        if inner.entries.contains_key(&query) {
            inner.order.retain(|k| k != &query);
        } else {
            while inner.entries.len() >= inner.max_size && !inner.order.is_empty() {
                let oldest = inner.order.remove(0);
                inner.entries.remove(&oldest);
            }
        }

        inner.order.push(query.clone());
        inner.entries.insert(
            query,
            CacheEntry {
                embedding,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of entries in the cache.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

/// Provider wrapper that serves repeated texts from a [`QueryCache`].
pub struct CachedEmbedder<P> {
    provider: P,
    cache: QueryCache,
}

impl<P: EmbeddingProvider> CachedEmbedder<P> {
    pub fn new(provider: P, cache: QueryCache) -> Self {
        Self { provider, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for CachedEmbedder<P> {
    async fn embed(&self, text: &str) -> Result<Array1<f64>> {
        if let Some(embedding) = self.cache.get(text) {
            debug!("Embedding cache hit");
            return Ok(embedding);
        }
        let embedding = self.provider.embed(text).await?;
        self.cache.put(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.provider.dimension()
    }
}
