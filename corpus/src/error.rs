//! Error types for corpus loading.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for corpus operations.
pub type Result<T> = std::result::Result<T, CorpusError>;

/// Errors that can occur while scanning or loading documents.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Corpus directory not found.
    #[error("corpus directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// A document could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Strict decoding rejected a document.
    #[error("invalid UTF-8 in {} at byte {valid_up_to}", .path.display())]
    InvalidUtf8 { path: PathBuf, valid_up_to: usize },

    /// The file name cannot be turned into a document id.
    #[error("cannot derive a document id from {}", .0.display())]
    InvalidFileName(PathBuf),

    /// Two files map to the same document id.
    #[error("duplicate document id {doc_id:?}: {} and {}", .first.display(), .second.display())]
    DuplicateDocument {
        doc_id: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Directory traversal failed.
    #[error("directory traversal error: {0}")]
    Walk(#[from] walkdir::Error),
}
