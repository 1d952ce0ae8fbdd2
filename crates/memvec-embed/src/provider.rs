//! Embedding provider trait and the fixed-table implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use memvec_core::{Error, Result};
use ndarray::Array1;

/// Turns text into a vector of `dimension()` reals.
///
/// Failures are reported as [`Error::Provider`]; retry policy, if any,
/// belongs to the implementation.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text (a query or a document chunk).
    async fn embed(&self, text: &str) -> Result<Array1<f64>>;

    /// Embed several texts. Fails as a whole on the first error.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Array1<f64>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;
}

/// Provider backed by a fixed text→vector table. Unknown text is a
/// provider error.
pub struct FixedEmbedder {
    dim: usize,
    table: HashMap<String, Array1<f64>>,
}

impl FixedEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            table: HashMap::new(),
        }
    }

    /// Register the vector for `text`. Fails if its length is not `dim`.
    pub fn insert(&mut self, text: impl Into<String>, embedding: Array1<f64>) -> Result<()> {
        if embedding.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: embedding.len(),
            });
        }
        self.table.insert(text.into(), embedding);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, text: impl Into<String>, embedding: Array1<f64>) -> Result<Self> {
        self.insert(text, embedding)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Array1<f64>> {
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| Error::Provider(format!("no embedding registered for {:?}", text)))
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}
