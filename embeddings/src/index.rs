//! In-memory vector index with exact cosine search.

use tracing::{debug, warn};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::{SearchResult, cosine_similarity, rank};

/// An ordered collection of document embeddings.
///
/// Ids and embeddings are kept in two parallel vectors that only ever grow
/// together, in insertion order. Insertion order is the tie-break order of
/// [`VectorIndex::search`]. All embeddings share one dimension, fixed by the
/// first insertion.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    doc_ids: Vec<String>,
    embeddings: Vec<Embedding>,
    dimension: Option<usize>,
}

impl VectorIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an embedding.
    pub fn push(&mut self, doc_id: impl Into<String>, embedding: Embedding) -> Result<()> {
        self.check_dimension(&embedding)?;

        self.dimension = Some(embedding.len());
        self.doc_ids.push(doc_id.into());
        self.embeddings.push(embedding);
        Ok(())
    }

    /// Get the number of entries in the index.
    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    /// Dimension shared by all embeddings (None while empty).
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Document ids in insertion order.
    pub fn doc_ids(&self) -> &[String] {
        &self.doc_ids
    }

    /// Check that `embedding` could be pushed without a dimension mismatch.
    pub fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        match self.dimension {
            Some(expected) if embedding.len() != expected => {
                Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Iterate over `(doc_id, embedding)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Embedding)> {
        self.doc_ids
            .iter()
            .map(String::as_str)
            .zip(self.embeddings.iter())
    }

    /// Score every entry against `query` and return the best `k`.
    ///
    /// Ties keep insertion order. Entries whose similarity is undefined are
    /// returned last with no score. An empty index or `k == 0` yields no
    /// results without looking at the query.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        let mut scored = Vec::with_capacity(self.len());
        for (doc_id, embedding) in self.iter() {
            let score = cosine_similarity(query, embedding)?;
            scored.push(SearchResult::new(doc_id, score));
        }

        let degenerate = scored.iter().filter(|r| r.is_degenerate()).count();
        if degenerate > 0 {
            warn!(
                "{degenerate} of {} similarity scores are undefined (zero-norm vector)",
                scored.len()
            );
        }

        let results = rank(scored, k);
        debug!("Ranked {} documents, returning {}", self.len(), results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn index(entries: &[(&str, Embedding)]) -> VectorIndex {
        let mut index = VectorIndex::new();
        for (id, embedding) in entries {
            index.push(*id, embedding.clone()).unwrap();
        }
        index
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.doc_id.as_str()).collect()
    }

    #[test]
    fn test_index_search() {
        let index = index(&[
            ("doc0", vec![1.0, 0.0]),
            ("doc1", vec![0.0, 1.0]),
            ("doc2", vec![0.7, 0.7]),
        ]);

        let results = index.search(&[1.0, 0.0], 2).unwrap();

        assert_eq!(ids(&results), vec!["doc0", "doc2"]);
        assert!((results[0].score.unwrap() - 1.0).abs() < 1e-6);
        assert!((results[1].score.unwrap() - 0.707_106_8).abs() < 1e-4);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = index(&[
            ("doc0", vec![1.0, 0.0]),
            ("doc1", vec![0.0, 1.0]),
            ("doc2", vec![1.0, 0.0]),
        ]);

        let results = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(ids(&results), vec!["doc0", "doc2"]);
    }

    #[test]
    fn test_top_k_boundaries() {
        let index = index(&[
            ("doc0", vec![1.0, 0.0]),
            ("doc1", vec![0.0, 1.0]),
            ("doc2", vec![0.7, 0.7]),
        ]);

        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
        let all = index.search(&[1.0, 0.0], 10).unwrap();
        assert_eq!(ids(&all), vec!["doc0", "doc2", "doc1"]);
    }

    #[test]
    fn test_empty_index() {
        let index = VectorIndex::new();
        assert!(index.search(&[1.0, 0.0], 5).unwrap().is_empty());
        assert_eq!(index.dimension(), None);
    }

    #[test]
    fn test_degenerate_entries_sort_last() {
        let index = index(&[
            ("zero", vec![0.0, 0.0]),
            ("opposite", vec![-1.0, 0.0]),
            ("same", vec![2.0, 0.0]),
        ]);

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(ids(&results), vec!["same", "opposite", "zero"]);
        assert!(results[2].is_degenerate());
    }

    #[test]
    fn test_zero_query_marks_everything_degenerate() {
        let index = index(&[("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);

        let results = index.search(&[0.0, 0.0], 5).unwrap();
        assert_eq!(ids(&results), vec!["a", "b"]);
        assert!(results.iter().all(SearchResult::is_degenerate));
    }

    #[test]
    fn test_dimension_mismatch_on_push() {
        let mut index = VectorIndex::new();
        index.push("a", vec![1.0, 0.0, 0.0]).unwrap();
        let result = index.push("bad", vec![1.0, 0.0]);
        assert!(result.is_err());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_dimension_mismatch_on_query() {
        let index = index(&[("a", vec![1.0, 0.0, 0.0])]);
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_check_dimension() {
        let mut index = VectorIndex::new();
        assert!(index.check_dimension(&[1.0, 2.0, 3.0]).is_ok());

        index.push("a", vec![1.0, 0.0]).unwrap();
        assert!(index.check_dimension(&[0.5, 0.5]).is_ok());
        assert!(matches!(
            index.check_dimension(&[1.0]),
            Err(EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_iter() {
        let index = index(&[("a", vec![1.0]), ("b", vec![2.0])]);
        assert_eq!(index.iter().count(), 2);
        assert_eq!(index.doc_ids(), ["a".to_string(), "b".to_string()]);
    }
}
