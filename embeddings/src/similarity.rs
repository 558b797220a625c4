//! Similarity computation and ranking.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Compute the cosine similarity between two embeddings.
///
/// Returns `Ok(None)` when the score is undefined: either vector has zero
/// norm, or the arithmetic produced a non-finite value. Vectors of different
/// lengths are an error.
///
/// Accumulation happens in `f64`, so large but finite components do not
/// overflow into a spurious degenerate score.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<Option<f32>> {
    let dot = dot_product(a, b)?;
    let magnitude_a = magnitude(a);
    let magnitude_b = magnitude(b);

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(None);
    }

    let score = (dot / (magnitude_a * magnitude_b)) as f32;
    Ok(score.is_finite().then_some(score))
}

fn dot_product(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum())
}

fn magnitude(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt()
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Id of the matched document.
    pub doc_id: String,

    /// Cosine similarity, or `None` when it is undefined for this pair.
    pub score: Option<f32>,
}

impl SearchResult {
    /// Create a new search result.
    pub fn new(doc_id: impl Into<String>, score: Option<f32>) -> Self {
        Self {
            doc_id: doc_id.into(),
            score,
        }
    }

    /// Whether the score is undefined (zero-norm vector involved).
    pub fn is_degenerate(&self) -> bool {
        self.score.is_none()
    }
}

/// Order results by descending score and keep the first `k`.
///
/// The sort is stable: equal scores keep their input order. Degenerate
/// results sort after every scored result.
pub fn rank(mut results: Vec<SearchResult>, k: usize) -> Vec<SearchResult> {
    results.sort_by_key(|r| Reverse(r.score.map(OrderedFloat)));
    results.truncate(k);
    results
}
