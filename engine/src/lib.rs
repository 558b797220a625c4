//! # Search Engine
//!
//! This crate builds the searchable document index. It combines:
//!
//! - **Corpus**: Sorted document enumeration, normalization and hashing
//! - **Embedding Cache**: Reuse of vectors whose content hash still matches
//! - **Embedding Provider**: Fresh vectors for new or edited documents
//! - **Vector Index**: Exact cosine ranking of every document
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         SearchIndex                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │    Corpus    │  │  Embedding   │  │  Embedding   │           │
//! │  │    Loader    │  │    Cache     │  │   Provider   │           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! │         │                │                  │                   │
//! │         └────────────────┼──────────────────┘                   │
//! │                          ▼                                      │
//! │                  ┌──────────────┐                               │
//! │                  │    Vector    │                               │
//! │                  │    Index     │                               │
//! │                  └──────────────┘                               │
//! │                          │                                      │
//! │                          ▼                                      │
//! │                  ┌──────────────┐                               │
//! │                  │    top-k     │                               │
//! │                  │   results    │                               │
//! │                  └──────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docsearch_engine::{EngineConfig, SearchIndex};
//!
//! let config = EngineConfig::new("data/docs");
//! let provider = config.provider.build()?;
//! let index = SearchIndex::open(&config, provider).await?;
//!
//! let results = index.search("computer graphics", 5).await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;

pub use config::{CacheConfig, EngineConfig, ProviderConfig, ProviderKind, SearchConfig};
pub use engine::{BuildReport, SearchIndex};
pub use error::{EngineError, Result};

// Re-export from dependencies for convenience
pub use docsearch_corpus::{CorpusConfig, DecodePolicy};
pub use docsearch_embeddings::{
    EmbeddingCache, EmbeddingError, EmbeddingProvider, SearchResult, WriteMode,
};
