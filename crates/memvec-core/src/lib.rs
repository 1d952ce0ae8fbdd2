//! memvec Core — data model, error taxonomy, retrieval configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::RetrievalConfig;
pub use error::{Error, Result};
pub use types::*;
