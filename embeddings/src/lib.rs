//! # Embeddings
//!
//! This crate provides embedding generation, a persistent embedding cache
//! and cosine-similarity ranking for docsearch.
//!
//! ## Features
//!
//! - **Embedding Providers**: local fastembed models, OpenAI-compatible HTTP API,
//!   offline feature hashing
//! - **Embedding Cache**: Content-hash validated vectors persisted as JSON
//! - **Vector Index**: Ordered in-memory corpus with exact top-k search
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► EmbeddingCache            │
//! │       │                    │              │                     │
//! │       ▼                    ▼              ▼                     │
//! │  Local/OpenAI/Hashing VectorIndex    embedding_cache.json      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod index;
pub mod local;
pub mod provider;
pub mod similarity;

pub use cache::{CacheEntry, CacheOptions, CacheStats, EmbeddingCache, WriteMode};
pub use error::{EmbeddingError, Result};
pub use index::VectorIndex;
pub use local::FastEmbedProvider;
pub use provider::{EmbeddingProvider, HashingProvider, OpenAIProvider, StaticProvider};
pub use similarity::{SearchResult, cosine_similarity};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of the offline hashing provider (matches the default local model).
pub const DEFAULT_DIMENSION: usize = 384;
