//! memvec Store — in-memory document store + exact cosine similarity search.

pub mod filter;
pub mod memory;
pub mod similarity;

pub use filter::MetadataFilter;
pub use memory::{DocumentStore, Snapshot, StoreStats};
pub use similarity::{
    compare_scores, cosine_similarity, magnitude, rank_order, rank_records, Scored,
};
