//! Configuration types for the document corpus.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for a corpus directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Path to the directory holding the documents.
    pub path: PathBuf,

    /// Extension a file must carry to be part of the corpus (None = any file).
    pub extension: Option<String>,

    /// How to treat invalid UTF-8 in document bytes.
    pub decode: DecodePolicy,

    /// Whether to follow symbolic links to files.
    pub follow_symlinks: bool,
}

impl CorpusConfig {
    /// Create a new corpus config.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            extension: Some("txt".to_string()),
            decode: DecodePolicy::default(),
            follow_symlinks: true,
        }
    }

    /// Check whether a path has an accepted extension.
    pub fn accepts(&self, path: &std::path::Path) -> bool {
        match &self.extension {
            Some(wanted) => path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy() == wanted.as_str()),
            None => true,
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self::new("data/docs")
    }
}

/// How invalid UTF-8 sequences in a document are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Drop invalid sequences and keep the valid text around them.
    #[default]
    Lossy,

    /// Reject the document.
    Strict,
}
