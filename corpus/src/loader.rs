//! Document loading and normalization.
//!
//! A document is read as raw bytes, decoded according to the configured
//! [`DecodePolicy`], normalized with [`clean_text`] and fingerprinted with
//! [`compute_hash`]. The fingerprint is what the embedding cache validates
//! against, so both functions must stay stable across releases.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use crate::config::DecodePolicy;
use crate::error::{CorpusError, Result};
use crate::scan::doc_id_for;

#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*?>").expect("tag pattern is valid"));

/// A loaded, normalized document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier derived from the file name.
    pub id: String,

    /// Path the document was read from.
    pub path: PathBuf,

    /// Normalized text handed to the embedding provider.
    pub cleaned_text: String,

    /// SHA-256 hex digest of `cleaned_text`.
    pub content_hash: String,

    /// Number of characters in `cleaned_text`.
    pub length: usize,
}

/// Normalize raw document text.
///
/// Lowercases, replaces anything that looks like a markup tag with a space,
/// collapses whitespace runs and trims the result.
pub fn clean_text(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped = TAG_PATTERN.replace_all(&lowered, " ");
    stripped
        .split(is_separator)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Unicode whitespace plus the ASCII information separators U+001C to
/// U+001F. Stored content hashes depend on this exact set.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Compute the lowercase hex SHA-256 digest of `text`.
///
/// This is a change-detection fingerprint, not a security primitive.
pub fn compute_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Load a document with the default (lossy) decode policy.
pub async fn load_document(path: impl AsRef<Path>) -> Result<Document> {
    DocumentLoader::default().load(path).await
}

/// Reads documents from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentLoader {
    decode: DecodePolicy,
}

impl DocumentLoader {
    /// Create a loader with the given decode policy.
    pub fn new(decode: DecodePolicy) -> Self {
        Self { decode }
    }

    /// Read, decode, normalize and fingerprint a single document.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<Document> {
        let path = path.as_ref();
        let id = doc_id_for(path)?;

        let bytes = fs::read(path).await.map_err(|source| CorpusError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let raw = self.decode(bytes, path)?;
        let cleaned_text = clean_text(&raw);
        let content_hash = compute_hash(&cleaned_text);
        let length = cleaned_text.chars().count();

        debug!("Loaded document {id} ({length} chars)");

        Ok(Document {
            id,
            path: path.to_path_buf(),
            cleaned_text,
            content_hash,
            length,
        })
    }

    fn decode(&self, bytes: Vec<u8>, path: &Path) -> Result<String> {
        match self.decode {
            DecodePolicy::Lossy => Ok(bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()),
            DecodePolicy::Strict => {
                String::from_utf8(bytes).map_err(|e| CorpusError::InvalidUtf8 {
                    path: path.to_path_buf(),
                    valid_up_to: e.utf8_error().valid_up_to(),
                })
            }
        }
    }
}
