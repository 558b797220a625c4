//! Error types for the embeddings system.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Provider not configured.
    #[error("embedding provider not configured")]
    ProviderNotConfigured,

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The requested local model is not supported.
    #[error("unknown embedding model: {0}")]
    UnknownModel(String),

    /// A local model could not be loaded.
    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),

    /// A local model failed while encoding.
    #[error("embedding model error: {0}")]
    Model(String),

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The persisted cache is not valid JSON of the expected shape.
    #[error("corrupt embedding cache {}: {source}", .path.display())]
    CacheCorruption {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The persisted cache could not be read or written.
    #[error("cache io error on {}: {source}", .path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
