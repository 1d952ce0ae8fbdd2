//! memvec Retrieve — retrieval strategies and the batch retriever.
//!
//! Strategies: plain top-k, top-k with score, direct-vector top-k, and
//! Maximal Marginal Relevance re-ranking. [`Retriever`] is the entry point
//! for callers.

pub mod mmr;
pub mod retriever;
pub mod strategy;

pub use retriever::{CancelFlag, QueryOutcome, Retriever};
pub use strategy::{MmrParams, Plan, Strategy, TopKParams, VectorParams};
