//! Maximal Marginal Relevance selection.
//!
//! MMR(c) = λ × sim(query, c) − (1 − λ) × max over selected s of sim(c, s)
//!
//! λ = 1.0: pure relevance (plain top-k over the pool)
//! λ = 0.0: pure diversity

use std::cmp::Ordering;

use memvec_core::Result;
use memvec_store::{compare_scores, cosine_similarity, rank_order, Scored};

/// Greedily pick up to `k` candidates from `pool`.
///
/// `pool` carries each candidate's query similarity in `score`. Equal MMR
/// scores are broken by the ranking order (higher query similarity, then
/// lower id). The returned items keep their query similarity as `score`
/// and are in selection order.
pub fn select(pool: Vec<Scored>, k: usize, lambda: f64) -> Result<Vec<Scored>> {
    let k = k.min(pool.len());
    let mut selected: Vec<Scored> = Vec::with_capacity(k);
    let mut remaining = pool;
    // Highest similarity of each remaining candidate to anything selected.
    let mut redundancy = vec![f64::NEG_INFINITY; remaining.len()];

    while selected.len() < k {
        let mut best: Option<(usize, f64)> = None;
        for (idx, candidate) in remaining.iter().enumerate() {
            let penalty = if selected.is_empty() {
                0.0
            } else {
                redundancy[idx]
            };
            let score = lambda * candidate.score - (1.0 - lambda) * penalty;

            let better = match best {
                None => true,
                Some((best_idx, best_score)) => match compare_scores(score, best_score) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => {
                        let incumbent = &remaining[best_idx];
                        rank_order(
                            (candidate.score, candidate.record.id),
                            (incumbent.score, incumbent.record.id),
                        ) == Ordering::Less
                    }
                },
            };
            if better {
                best = Some((idx, score));
            }
        }

        let Some((best_idx, _)) = best else { break };
        let chosen = remaining.remove(best_idx);
        redundancy.remove(best_idx);

        for (idx, candidate) in remaining.iter().enumerate() {
            let sim = cosine_similarity(&candidate.record.embedding, &chosen.record.embedding)?;
            if sim > redundancy[idx] {
                redundancy[idx] = sim;
            }
        }
        selected.push(chosen);
    }

    Ok(selected)
}
