//! Cosine similarity and the ranking order shared by every strategy.
//!
//! Higher similarity ranks first; equal similarities fall back to
//! ascending insertion order (record id), so identical inputs always
//! produce identical output.

use std::cmp::Ordering;
use std::sync::Arc;

use memvec_core::{Error, Record, RecordId, Result};
use ndarray::Array1;

/// Largest absolute component, `0.0` for an all-zero vector.
fn max_abs(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
}

/// `v` divided by its largest absolute component, so every component lies
/// in [-1, 1] and squaring can neither overflow nor underflow to zero.
fn rescaled(v: &Array1<f64>) -> Option<Array1<f64>> {
    let scale = max_abs(v);
    (scale > 0.0).then(|| v / scale)
}

/// Euclidean norm of a vector. Zero only when every component is zero.
pub fn magnitude(v: &Array1<f64>) -> f64 {
    match rescaled(v) {
        Some(unit) => max_abs(v) * unit.dot(&unit).sqrt(),
        None => 0.0,
    }
}

/// Cosine similarity: `dot(a, b) / (|a| * |b|)`.
///
/// Fails with `DimensionMismatch` for unequal lengths and with
/// `ZeroMagnitudeVector` when either vector is all zeros. Both inputs are
/// rescaled first, which leaves the cosine unchanged for any finite
/// magnitude.
pub fn cosine_similarity(a: &Array1<f64>, b: &Array1<f64>) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let (a, b) = match (rescaled(a), rescaled(b)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(Error::ZeroMagnitudeVector),
    };

    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    Ok((a.dot(&b) / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

/// A record paired with its similarity to some query.
#[derive(Debug, Clone)]
pub struct Scored {
    pub record: Arc<Record>,
    pub score: f64,
}

/// The total order over `(score, id)` pairs: descending score, then
/// ascending id. `-0.0` and `0.0` compare equal.
pub fn rank_order(a: (f64, RecordId), b: (f64, RecordId)) -> Ordering {
    compare_scores(b.0, a.0).then_with(|| a.1.cmp(&b.1))
}

/// Total comparison of scores that treats both zeros as one value.
pub fn compare_scores(a: f64, b: f64) -> Ordering {
    (a + 0.0).total_cmp(&(b + 0.0))
}

/// Score every record against `query` and sort by [`rank_order`].
pub fn rank_records<'a, I>(query: &Array1<f64>, records: I) -> Result<Vec<Scored>>
where
    I: IntoIterator<Item = &'a Arc<Record>>,
{
    let mut scored = records
        .into_iter()
        .map(|record| {
            cosine_similarity(query, &record.embedding).map(|score| Scored {
                record: Arc::clone(record),
                score,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    scored.sort_by(|a, b| rank_order((a.score, a.record.id), (b.score, b.record.id)));
    Ok(scored)
}
