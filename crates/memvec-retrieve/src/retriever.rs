//! Retriever facade — batch queries over a shared store.
//!
//! Each query in a batch runs on its own tokio task, at most
//! `max_concurrency` at a time. Results come back in input order, and a
//! failed query becomes an `Err` in its own slot without touching its
//! siblings.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use memvec_core::{Error, Metadata, NewRecord, Query, RecordId, Result, ResultItem, RetrievalConfig};
use memvec_embed::EmbeddingProvider;
use memvec_store::DocumentStore;
use ndarray::Array1;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::strategy::{self, Strategy};

/// Outcome of one query in a batch.
pub type QueryOutcome = Result<Vec<ResultItem>>;

/// Cooperative cancellation for a running batch. Once raised, no further
/// query is launched; queries already running finish normally.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Entry point for callers: resolves text through the injected provider
/// and runs strategies against store snapshots.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<DocumentStore>,
    provider: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        store: Arc<DocumentStore>,
        provider: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            provider,
            config,
        })
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Answer a single query.
    ///
    /// Strategy arguments are validated before the provider is called.
    /// `VectorDirect` uses its own vector and ignores `query`.
    pub async fn search(&self, query: Query, strategy: &Strategy) -> Result<Vec<ResultItem>> {
        let plan = strategy.plan(&self.config)?;

        let vector: Array1<f64> = match (strategy.fixed_vector(), query) {
            (Some(vector), _) => vector.clone(),
            (None, Query::Vector(vector)) => vector,
            (None, Query::Text(text)) => {
                debug!("Embedding query text ({} chars)", text.len());
                self.provider.embed(&text).await?
            }
        };

        let snapshot = self.store.all();
        strategy::execute(plan, &vector, &snapshot, strategy.filter())
    }

    /// Run every text query with the same strategy.
    pub async fn retrieve<S: AsRef<str>>(
        &self,
        queries: &[S],
        strategy: &Strategy,
    ) -> Vec<QueryOutcome> {
        self.retrieve_with_cancel(queries, strategy, &CancelFlag::new())
            .await
    }

    /// Like [`retrieve`](Self::retrieve), but stops launching queries once
    /// `cancel` is raised. Every query that never started is reported as
    /// `Err(Error::Cancelled)`.
    pub async fn retrieve_with_cancel<S: AsRef<str>>(
        &self,
        queries: &[S],
        strategy: &Strategy,
        cancel: &CancelFlag,
    ) -> Vec<QueryOutcome> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut handles = Vec::with_capacity(queries.len());

        for query in queries {
            if cancel.is_cancelled() {
                handles.push(None);
                continue;
            }
            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    handles.push(None);
                    continue;
                }
            };
            if cancel.is_cancelled() {
                handles.push(None);
                continue;
            }

            let this = self.clone();
            let strategy = strategy.clone();
            let text = query.as_ref().to_string();
            handles.push(Some(tokio::spawn(async move {
                let outcome = this.search(Query::Text(text), &strategy).await;
                drop(permit);
                outcome
            })));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (idx, handle) in handles.into_iter().enumerate() {
            let outcome = match handle {
                None => Err(Error::Cancelled),
                Some(handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(Error::Internal(format!("query task failed: {}", e))),
                },
            };
            if let Err(e) = &outcome {
                warn!("Query {} failed: {}", idx, e);
            }
            outcomes.push(outcome);
        }

        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        info!(
            "Retrieved batch of {} queries ({} failed)",
            outcomes.len(),
            failed
        );
        outcomes
    }

    /// Embed `docs` through the provider and insert them atomically.
    ///
    /// A provider failure aborts before anything is stored.
    pub async fn add_texts(&self, docs: Vec<(String, Metadata)>) -> Result<Vec<RecordId>> {
        let texts: Vec<&str> = docs.iter().map(|(text, _)| text.as_str()).collect();
        let embeddings = self.provider.embed_batch(&texts).await?;
        if embeddings.len() != docs.len() {
            return Err(Error::Provider(format!(
                "provider returned {} embeddings for {} texts",
                embeddings.len(),
                docs.len()
            )));
        }

        let batch = docs
            .into_iter()
            .zip(embeddings)
            .map(|((content, metadata), embedding)| NewRecord {
                content,
                metadata,
                embedding,
            });
        let ids = self.store.insert_batch(batch)?;
        info!("Added {} documents", ids.len());
        Ok(ids)
    }
}
