//! Retrieval strategies.
//!
//! Each variant carries its own parameter struct. Unset parameters are
//! filled from [`RetrievalConfig`] and validated by [`Strategy::plan`]
//! before any similarity is computed.

use memvec_core::{Error, RecordId, Result, ResultItem, RetrievalConfig};
use memvec_store::{magnitude, rank_records, MetadataFilter, Scored, Snapshot};
use ndarray::Array1;
use tracing::debug;

use crate::mmr;

/// Parameters shared by the plain top-k strategies.
#[derive(Debug, Clone, Default)]
pub struct TopKParams {
    pub k: Option<usize>,
    pub filter: Option<MetadataFilter>,
}

/// Top-k against a caller-supplied vector.
#[derive(Debug, Clone)]
pub struct VectorParams {
    pub vector: Array1<f64>,
    pub k: Option<usize>,
    pub filter: Option<MetadataFilter>,
}

/// Maximal Marginal Relevance parameters.
#[derive(Debug, Clone, Default)]
pub struct MmrParams {
    pub k: Option<usize>,
    pub fetch_k: Option<usize>,
    /// 1.0 = pure relevance, 0.0 = pure diversity.
    pub lambda: Option<f64>,
    pub filter: Option<MetadataFilter>,
}

/// How a query is answered.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Most similar `k` records.
    TopK(TopKParams),
    /// Same ranking as `TopK`; callers consume the score.
    TopKWithScore(TopKParams),
    /// Top-k against a vector that bypasses the embedding provider.
    VectorDirect(VectorParams),
    /// Diversity-aware re-ranking of the top `fetch_k` candidates.
    Mmr(MmrParams),
}

/// A strategy with defaults resolved and arguments validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Plan {
    Rank { k: usize },
    Mmr { k: usize, fetch_k: usize, lambda: f64 },
}

impl Strategy {
    pub fn top_k(k: usize) -> Self {
        Strategy::TopK(TopKParams {
            k: Some(k),
            filter: None,
        })
    }

    pub fn top_k_with_score(k: usize) -> Self {
        Strategy::TopKWithScore(TopKParams {
            k: Some(k),
            filter: None,
        })
    }

    pub fn vector(vector: impl Into<Array1<f64>>, k: usize) -> Self {
        Strategy::VectorDirect(VectorParams {
            vector: vector.into(),
            k: Some(k),
            filter: None,
        })
    }

    pub fn mmr(fetch_k: usize, k: usize, lambda: f64) -> Self {
        Strategy::Mmr(MmrParams {
            k: Some(k),
            fetch_k: Some(fetch_k),
            lambda: Some(lambda),
            filter: None,
        })
    }

    /// Attach a metadata filter applied before ranking.
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        match &mut self {
            Strategy::TopK(p) | Strategy::TopKWithScore(p) => p.filter = Some(filter),
            Strategy::VectorDirect(p) => p.filter = Some(filter),
            Strategy::Mmr(p) => p.filter = Some(filter),
        }
        self
    }

    pub fn filter(&self) -> Option<&MetadataFilter> {
        match self {
            Strategy::TopK(p) | Strategy::TopKWithScore(p) => p.filter.as_ref(),
            Strategy::VectorDirect(p) => p.filter.as_ref(),
            Strategy::Mmr(p) => p.filter.as_ref(),
        }
    }

    /// The query vector carried by the strategy itself, if any.
    pub fn fixed_vector(&self) -> Option<&Array1<f64>> {
        match self {
            Strategy::VectorDirect(p) => Some(&p.vector),
            _ => None,
        }
    }

    /// Resolve defaults and validate arguments.
    pub fn plan(&self, config: &RetrievalConfig) -> Result<Plan> {
        match self {
            Strategy::TopK(p) | Strategy::TopKWithScore(p) => Ok(Plan::Rank {
                k: resolve_k(p.k, config)?,
            }),
            Strategy::VectorDirect(p) => Ok(Plan::Rank {
                k: resolve_k(p.k, config)?,
            }),
            Strategy::Mmr(p) => {
                let k = resolve_k(p.k, config)?;
                let fetch_k = p.fetch_k.unwrap_or_else(|| k.max(config.default_fetch_k));
                if fetch_k < k {
                    return Err(Error::InvalidArgument(format!(
                        "fetch_k ({}) must be at least k ({})",
                        fetch_k, k
                    )));
                }
                let lambda = p.lambda.unwrap_or(config.default_lambda);
                if !(0.0..=1.0).contains(&lambda) {
                    return Err(Error::InvalidArgument(format!(
                        "lambda must be within [0, 1], got {}",
                        lambda
                    )));
                }
                Ok(Plan::Mmr { k, fetch_k, lambda })
            }
        }
    }
}

fn resolve_k(k: Option<usize>, config: &RetrievalConfig) -> Result<usize> {
    match k {
        Some(0) => Err(Error::InvalidArgument("k must be at least 1".into())),
        Some(k) => Ok(k),
        None => Ok(config.default_k),
    }
}

/// Check a query vector against the snapshot before scanning.
pub fn check_query(query: &Array1<f64>, snapshot: &Snapshot) -> Result<()> {
    if let Some(expected) = snapshot.dimension() {
        if query.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }
    }
    if query.is_empty() {
        return Err(Error::EmptyEmbedding);
    }
    if query.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidArgument(
            "query vector contains NaN or infinite components".into(),
        ));
    }
    if magnitude(query) == 0.0 {
        return Err(Error::ZeroMagnitudeVector);
    }
    Ok(())
}

/// Run a validated plan against a snapshot.
pub fn execute(
    plan: Plan,
    query: &Array1<f64>,
    snapshot: &Snapshot,
    filter: Option<&MetadataFilter>,
) -> Result<Vec<ResultItem>> {
    check_query(query, snapshot)?;

    let candidates = snapshot
        .iter()
        .filter(|r| filter.map_or(true, |f| f.matches_record(r)));
    let mut ranked = rank_records(query, candidates)?;

    let selected = match plan {
        Plan::Rank { k } => {
            ranked.truncate(k);
            ranked
        }
        Plan::Mmr { k, fetch_k, lambda } => {
            ranked.truncate(fetch_k);
            mmr::select(ranked, k, lambda)?
        }
    };

    debug!(
        "{:?} over {} records returned {:?}",
        plan,
        snapshot.len(),
        selected.iter().map(|s| s.record.id).collect::<Vec<RecordId>>()
    );
    Ok(into_items(selected))
}

fn into_items(selected: Vec<Scored>) -> Vec<ResultItem> {
    selected
        .into_iter()
        .enumerate()
        .map(|(i, s)| ResultItem {
            record: s.record,
            score: s.score,
            rank: i + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use memvec_core::{Metadata, MetadataValue};
    use memvec_store::DocumentStore;
    use ndarray::array;

    fn scenario_store() -> DocumentStore {
        let store = DocumentStore::new();
        store.insert("east", Metadata::new(), array![1.0, 0.0]).unwrap();
        store.insert("north", Metadata::new(), array![0.0, 1.0]).unwrap();
        store.insert("mostly east", Metadata::new(), array![0.9, 0.1]).unwrap();
        store
    }

    fn contents(items: &[ResultItem]) -> Vec<&str> {
        items.iter().map(|i| i.record.content.as_str()).collect()
    }

    fn run(
        strategy: &Strategy,
        query: Array1<f64>,
        store: &DocumentStore,
    ) -> Result<Vec<ResultItem>> {
        let plan = strategy.plan(&RetrievalConfig::default())?;
        execute(plan, &query, &store.all(), strategy.filter())
    }

    #[test]
    fn test_top_k_scenario() {
        let store = scenario_store();
        let items = run(&Strategy::top_k(2), array![1.0, 0.0], &store).unwrap();

        assert_eq!(contents(&items), vec!["east", "mostly east"]);
        assert!((items[0].score - 1.0).abs() < 1e-9);
        assert!((items[1].score - 0.9938837346736189).abs() < 1e-9);
        assert_eq!(items[0].rank, 1);
        assert_eq!(items[1].rank, 2);
    }

    #[test]
    fn test_top_k_with_score_matches_top_k() {
        let store = scenario_store();
        let plain = run(&Strategy::top_k(3), array![0.6, 0.8], &store).unwrap();
        let scored = run(&Strategy::top_k_with_score(3), array![0.6, 0.8], &store).unwrap();

        let a: Vec<_> = plain.iter().map(|i| (i.record.id, i.score)).collect();
        let b: Vec<_> = scored.iter().map(|i| (i.record.id, i.score)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_k_and_small_store() {
        let store = scenario_store();
        let items = run(&Strategy::TopK(TopKParams::default()), array![1.0, 1.0], &store).unwrap();
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_sorted_with_ties_in_insertion_order() {
        let store = DocumentStore::new();
        store.insert("a", Metadata::new(), array![0.0, 1.0]).unwrap();
        store.insert("b", Metadata::new(), array![2.0, 0.0]).unwrap();
        store.insert("c", Metadata::new(), array![1.0, 0.0]).unwrap();
        store.insert("d", Metadata::new(), array![1.0, 1.0]).unwrap();
        store.insert("e", Metadata::new(), array![5.0, 0.0]).unwrap();

        let items = run(&Strategy::top_k(5), array![1.0, 0.0], &store).unwrap();
        assert_eq!(contents(&items), vec!["b", "c", "e", "d", "a"]);
        assert!(items.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_invalid_arguments() {
        let config = RetrievalConfig::default();
        assert!(matches!(Strategy::top_k(0).plan(&config), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            Strategy::mmr(2, 3, 0.5).plan(&config),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            Strategy::mmr(5, 3, 1.5).plan(&config),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            Strategy::mmr(5, 3, f64::NAN).plan(&config),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            Strategy::mmr(5, 0, 0.5).plan(&config),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_mmr_defaults() {
        let config = RetrievalConfig::default();
        let plan = Strategy::Mmr(MmrParams::default()).plan(&config).unwrap();
        assert_eq!(
            plan,
            Plan::Mmr {
                k: 4,
                fetch_k: 20,
                lambda: 0.5
            }
        );

        let plan = Strategy::Mmr(MmrParams {
            k: Some(30),
            ..Default::default()
        })
        .plan(&config)
        .unwrap();
        assert_eq!(
            plan,
            Plan::Mmr {
                k: 30,
                fetch_k: 30,
                lambda: 0.5
            }
        );
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let store = scenario_store();
        let err = run(&Strategy::top_k(1), array![1.0, 0.0, 0.0], &store).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_zero_query_vector() {
        let store = scenario_store();
        let err = run(&Strategy::top_k(1), array![0.0, 0.0], &store).unwrap_err();
        assert!(matches!(err, Error::ZeroMagnitudeVector));
    }

    #[test]
    fn test_empty_store_returns_nothing() {
        let store = DocumentStore::new();
        let items = run(&Strategy::top_k(3), array![1.0, 0.0], &store).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_filter_applies_before_ranking() {
        let store = DocumentStore::new();
        let mut pets = Metadata::new();
        pets.insert("source".into(), MetadataValue::from("mammal-pets-doc"));
        store.insert("dogs", pets.clone(), array![0.5, 0.5]).unwrap();
        store.insert("btc", Metadata::new(), array![1.0, 0.0]).unwrap();
        store.insert("cats", pets, array![0.0, 1.0]).unwrap();

        let pets_only = MetadataFilter::new().equals("source", "mammal-pets-doc");
        let strategy = Strategy::top_k(2).with_filter(pets_only);
        let items = run(&strategy, array![1.0, 0.0], &store).unwrap();
        assert_eq!(contents(&items), vec!["dogs", "cats"]);
    }
}
