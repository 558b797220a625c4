//! Error types for the search engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in the search engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Corpus enumeration failed.
    #[error("corpus error: {0}")]
    Corpus(#[from] docsearch_corpus::CorpusError),

    /// Cache, provider or scoring error outside of a single document.
    #[error("embedding error: {0}")]
    Embedding(#[from] docsearch_embeddings::EmbeddingError),

    /// A document could not be loaded.
    #[error("failed to load document {doc_id:?}: {source}")]
    Load {
        doc_id: String,
        #[source]
        source: docsearch_corpus::CorpusError,
    },

    /// A document could not be embedded.
    #[error("failed to embed document {doc_id:?}: {source}")]
    Embed {
        doc_id: String,
        #[source]
        source: docsearch_embeddings::EmbeddingError,
    },

    /// The provider returned an unusable vector for a document.
    #[error("malformed embedding for document {doc_id:?}: {reason}")]
    MalformedEmbedding { doc_id: String, reason: String },

    /// The cache could not persist a document's embedding.
    #[error("failed to cache embedding for {doc_id:?}: {source}")]
    Cache {
        doc_id: String,
        #[source]
        source: docsearch_embeddings::EmbeddingError,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// The document a build error is attributed to, if any.
    pub fn doc_id(&self) -> Option<&str> {
        match self {
            Self::Load { doc_id, .. }
            | Self::Embed { doc_id, .. }
            | Self::MalformedEmbedding { doc_id, .. }
            | Self::Cache { doc_id, .. } => Some(doc_id),
            _ => None,
        }
    }
}
