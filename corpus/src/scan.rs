//! Corpus enumeration.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::error::{CorpusError, Result};

/// A file that belongs to the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    /// Document id (file name without extension).
    pub doc_id: String,

    /// Full path to the file.
    pub path: PathBuf,
}

/// Derive a document id from a file path: the file name without its final
/// extension.
pub fn doc_id_for(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CorpusError::InvalidFileName(path.to_path_buf()))
}

/// Dotfiles are never part of the corpus.
fn is_hidden(name: &OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}

/// Enumerates the documents of a corpus directory.
pub struct CorpusScanner {
    config: CorpusConfig,
}

impl CorpusScanner {
    /// Create a new scanner.
    pub fn new(config: CorpusConfig) -> Self {
        Self { config }
    }

    /// List the corpus files, sorted ascending by path.
    ///
    /// Only the top level of the directory is scanned and hidden files are
    /// skipped. The returned order is
    /// the document order of the index and the tie-break order of search
    /// results.
    pub fn scan(&self) -> Result<Vec<CorpusEntry>> {
        let root = &self.config.path;
        if !root.is_dir() {
            return Err(CorpusError::DirectoryNotFound(root.clone()));
        }

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.config.follow_symlinks)
            // Single level, so file name order is path order.
            .sort_by_file_name();

        let mut entries = Vec::new();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() || is_hidden(entry.file_name()) {
                continue;
            }

            let path = entry.into_path();
            if !self.config.accepts(&path) {
                debug!("Skipping {}", path.display());
                continue;
            }

            let doc_id = doc_id_for(&path)?;
            if let Some(first) = seen.insert(doc_id.clone(), path.clone()) {
                return Err(CorpusError::DuplicateDocument {
                    doc_id,
                    first,
                    second: path,
                });
            }

            entries.push(CorpusEntry { doc_id, path });
        }

        info!("Found {} documents in {}", entries.len(), root.display());
        Ok(entries)
    }
}
