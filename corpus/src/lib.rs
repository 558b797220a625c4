//! # Corpus
//!
//! This crate turns a directory of plain-text files into documents ready for
//! embedding.
//!
//! ## Features
//!
//! - **Scanning**: Sorted, non-recursive enumeration of corpus files
//! - **Normalization**: Lowercasing, tag stripping and whitespace collapsing
//! - **Fingerprints**: SHA-256 content hashes used for cache validation
//! - **Decode Policy**: Explicit handling of invalid UTF-8 input
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Corpus                                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  CorpusConfig ──► CorpusScanner ──► DocumentLoader ──► Document │
//! │                        │                   │                    │
//! │                        ▼                   ▼                    │
//! │                  sorted doc ids    clean_text / compute_hash    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod scan;

pub use config::{CorpusConfig, DecodePolicy};
pub use error::{CorpusError, Result};
pub use loader::{Document, DocumentLoader, clean_text, compute_hash, load_document};
pub use scan::{CorpusEntry, CorpusScanner, doc_id_for};
