//! HTTP server for the document search engine.
//!
//! Exposes a built [`docsearch_engine::SearchIndex`] over two routes:
//!
//! - `POST /search` with `{"query": "...", "top_k": 5}` returns
//!   `{"results": [["doc_id", score], ...]}`
//! - `GET /health` returns the number of indexed documents

pub mod handler;
pub mod web;

pub use handler::{HealthResponse, SearchHandler, SearchRequest, SearchResponse};
pub use web::{HttpError, router};
