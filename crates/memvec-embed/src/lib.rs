//! memvec Embed — the embedding provider seam.
//!
//! The store never talks to a model. Text queries are resolved through an
//! [`EmbeddingProvider`] that callers inject. [`FixedEmbedder`] serves a
//! fixed text→vector table (tests, offline corpora), and [`CachedEmbedder`]
//! adds an LRU + TTL cache in front of any provider.

pub mod cache;
pub mod provider;

pub use cache::{CachedEmbedder, QueryCache};
pub use provider::{EmbeddingProvider, FixedEmbedder};
