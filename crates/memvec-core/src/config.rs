//! Retrieval defaults and concurrency limits.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Defaults applied when a strategy leaves a parameter unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Results per query when `k` is unspecified.
    pub default_k: usize,
    /// MMR candidate pool floor; the effective default is `max(k, default_fetch_k)`.
    pub default_fetch_k: usize,
    /// MMR relevance/diversity trade-off when unspecified.
    pub default_lambda: f64,
    /// Maximum queries of one batch in flight at once.
    pub max_concurrency: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: 4,
            default_fetch_k: 20,
            default_lambda: 0.5,
            max_concurrency: 4,
        }
    }
}

impl RetrievalConfig {
    /// Create configuration from environment and defaults.
    ///
    /// Reads `MEMVEC_DEFAULT_K`, `MEMVEC_DEFAULT_FETCH_K`,
    /// `MEMVEC_DEFAULT_LAMBDA` and `MEMVEC_MAX_CONCURRENCY`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            default_k: env_or("MEMVEC_DEFAULT_K", defaults.default_k),
            default_fetch_k: env_or("MEMVEC_DEFAULT_FETCH_K", defaults.default_fetch_k),
            default_lambda: env_or("MEMVEC_DEFAULT_LAMBDA", defaults.default_lambda),
            max_concurrency: env_or("MEMVEC_MAX_CONCURRENCY", defaults.max_concurrency),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values no strategy could run with.
    pub fn validate(&self) -> Result<()> {
        if self.default_k == 0 {
            return Err(Error::Config("default_k must be at least 1".into()));
        }
        if self.default_fetch_k == 0 {
            return Err(Error::Config("default_fetch_k must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.default_lambda) {
            return Err(Error::Config(format!(
                "default_lambda must be within [0, 1], got {}",
                self.default_lambda
            )));
        }
        if self.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be at least 1".into()));
        }
        Ok(())
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
