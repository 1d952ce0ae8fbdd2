//! Error types for memvec.

use thiserror::Error;

use crate::types::RecordId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding is empty")]
    EmptyEmbedding,

    #[error("Vector has zero magnitude")]
    ZeroMagnitudeVector,

    #[error("Not found: {0}")]
    NotFound(RecordId),

    #[error("Embedding provider error: {0}")]
    Provider(String),

    #[error("Query cancelled before it started")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
