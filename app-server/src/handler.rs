//! Search request handler.
//!
//! Translates wire requests into index queries and index results into the
//! wire response shape.

use std::sync::Arc;

use docsearch_engine::{Result, SearchIndex, SearchResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Body of `POST /search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text query, passed to the embedding provider unchanged.
    pub query: String,

    /// Number of results wanted. Falls back to the server default when
    /// absent; negative values are treated as 0.
    #[serde(default)]
    pub top_k: Option<i64>,
}

/// Response of `POST /search`.
///
/// Each result is a `[doc_id, score]` pair; `score` is `null` when the
/// similarity is undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Ranked `(doc_id, score)` pairs, best first.
    pub results: Vec<(String, Option<f32>)>,
}

impl From<Vec<SearchResult>> for SearchResponse {
    fn from(results: Vec<SearchResult>) -> Self {
        Self {
            results: results.into_iter().map(|r| (r.doc_id, r.score)).collect(),
        }
    }
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` once the server is accepting requests.
    pub status: String,

    /// Number of indexed documents.
    pub documents: usize,

    /// Number of embeddings held by the cache.
    pub cached_embeddings: usize,
}

/// Handler for search operations over a built index.
#[derive(Clone)]
pub struct SearchHandler {
    index: Arc<SearchIndex>,
    default_top_k: usize,
}

impl SearchHandler {
    /// Create a handler serving `index`.
    ///
    /// Requests without `top_k` get 5 results unless
    /// [`SearchHandler::with_default_top_k`] says otherwise.
    pub fn new(index: SearchIndex) -> Self {
        Self {
            index: Arc::new(index),
            default_top_k: 5,
        }
    }

    /// Set the number of results returned when a request omits `top_k`.
    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    /// Run a search request.
    ///
    /// Fails only when the query cannot be embedded or its dimension does
    /// not match the index.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        let top_k = self.resolve_top_k(request.top_k);
        debug!("Search request: top_k={top_k}");

        let results = self.index.search(&request.query, top_k).await?;
        Ok(results.into())
    }

    /// Report liveness and index size.
    pub async fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
            documents: self.index.len(),
            cached_embeddings: self.index.cache().stats().await.entries,
        }
    }

    fn resolve_top_k(&self, requested: Option<i64>) -> usize {
        match requested {
            None => self.default_top_k,
            Some(k) => usize::try_from(k).unwrap_or(0),
        }
    }
}
