//! Persistent embedding cache keyed by document id.
//!
//! An entry is only reused when its stored content hash equals the hash of
//! the document's current text. The whole mapping lives in memory and is
//! persisted as one pretty-printed JSON object:
//!
//! ```json
//! {
//!   "doc0": { "hash": "9f86d0…", "embedding": [0.1, 0.2], "updated_at": 1718000000.25 }
//! }
//! ```
//!
//! # Concurrency
//!
//! Within one [`EmbeddingCache`], `put` and `flush` hold the write lock across
//! the file rewrite, so concurrent writers on the same instance never lose
//! updates. Two instances (or processes) opened on the same file are not
//! coordinated: each rewrites the file from its own view and the last writer
//! wins, silently dropping the other's entries. Keep a single instance per
//! store file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Cache entry for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Content hash of the text the embedding was computed from.
    pub hash: String,

    /// The embedding vector.
    pub embedding: Embedding,

    /// When the entry was written, in seconds since the Unix epoch.
    pub updated_at: f64,

    /// Model that produced the embedding (only recorded by model-scoped caches).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// When `put` persists to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Rewrite the store on every `put`.
    #[default]
    WriteThrough,

    /// Only rewrite the store on `flush`.
    Deferred,
}

/// Options for opening a cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Persistence mode.
    pub write_mode: WriteMode,

    /// When set, entries are tagged with this model id and entries from any
    /// other (or no) model are treated as misses.
    pub model: Option<String>,
}

impl CacheOptions {
    /// Set the write mode.
    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// Scope entries to a model id.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: BTreeMap<String, CacheEntry>,
    dirty: bool,
}

/// Cache for document embeddings to avoid recomputation.
pub struct EmbeddingCache {
    /// In-memory cache.
    state: RwLock<CacheState>,

    /// Path for persistent cache storage.
    cache_path: Option<PathBuf>,

    options: CacheOptions,
}

impl EmbeddingCache {
    /// Create a new in-memory cache that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            cache_path: None,
            options: CacheOptions::default(),
        }
    }

    /// Open the cache stored at `path` with default options.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, CacheOptions::default()).await
    }

    /// Open the cache stored at `path`.
    ///
    /// A missing file yields an empty cache. An unreadable file or content
    /// that is not a valid cache is an error; there is no fallback to empty.
    pub async fn load_with(path: impl AsRef<Path>, options: CacheOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read(&path).await {
            Ok(content) => serde_json::from_slice::<BTreeMap<String, CacheEntry>>(&content)
                .map_err(|source| EmbeddingError::CacheCorruption {
                    path: path.clone(),
                    source,
                })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No embedding cache at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(EmbeddingError::CacheIo { path, source }),
        };

        info!(
            "Loaded {} cache entries from {}",
            entries.len(),
            path.display()
        );

        Ok(Self {
            state: RwLock::new(CacheState {
                entries,
                dirty: false,
            }),
            cache_path: Some(path),
            options,
        })
    }

    /// Path of the persisted store, if any.
    pub fn path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    /// Get the embedding for `doc_id` if it was computed from content hashing
    /// to `hash`.
    pub async fn get(&self, doc_id: &str, hash: &str) -> Option<Embedding> {
        let state = self.state.read().await;
        let entry = state.entries.get(doc_id)?;

        if entry.hash != hash {
            debug!("Stale cache entry for {doc_id}");
            return None;
        }

        if let Some(model) = &self.options.model {
            if entry.model.as_deref() != Some(model.as_str()) {
                debug!("Cache entry for {doc_id} was produced by another model");
                return None;
            }
        }

        Some(entry.embedding.clone())
    }

    /// Insert or overwrite the entry for `doc_id`.
    ///
    /// In write-through mode the whole store is rewritten before returning.
    /// If that rewrite fails the in-memory entry is restored to what it was.
    pub async fn put(&self, doc_id: &str, hash: &str, embedding: Embedding) -> Result<()> {
        let entry = CacheEntry {
            hash: hash.to_string(),
            embedding,
            updated_at: epoch_seconds(),
            model: self.options.model.clone(),
        };

        let mut state = self.state.write().await;
        let previous = state.entries.insert(doc_id.to_string(), entry);
        let was_dirty = std::mem::replace(&mut state.dirty, true);

        if self.options.write_mode == WriteMode::WriteThrough {
            if let Err(e) = self.save(&mut state).await {
                // Keep memory in line with the file that failed to update.
                match previous {
                    Some(previous) => state.entries.insert(doc_id.to_string(), previous),
                    None => state.entries.remove(doc_id),
                };
                state.dirty = was_dirty;
                return Err(e);
            }
        }

        debug!("Cached embedding for {doc_id}");
        Ok(())
    }

    /// Persist pending changes.
    pub async fn flush(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if state.dirty {
            self.save(&mut state).await?;
        }
        Ok(())
    }

    /// Number of entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            entries: state.entries.len(),
            models: state
                .entries
                .values()
                .filter_map(|e| e.model.clone())
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .collect(),
            dirty: state.dirty,
        }
    }

    /// Rewrite the store file. Called with the write lock held.
    async fn save(&self, state: &mut CacheState) -> Result<()> {
        let Some(path) = &self.cache_path else {
            state.dirty = false;
            return Ok(());
        };

        let content = serde_json::to_vec_pretty(&state.entries)?;
        let io_err = |source| EmbeddingError::CacheIo {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        // Write to a sibling and rename so readers never see a torn file.
        let temp_path = temp_path_for(path);
        fs::write(&temp_path, &content).await.map_err(io_err)?;
        fs::rename(&temp_path, path).await.map_err(io_err)?;

        state.dirty = false;
        debug!("Saved {} cache entries to disk", state.entries.len());
        Ok(())
    }
}

/// Statistics about the embedding cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in cache.
    pub entries: usize,

    /// Models with cached embeddings.
    pub models: Vec<String>,

    /// Whether there are changes not yet written to disk.
    pub dirty: bool,
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn epoch_seconds() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_cache_put_get() {
        let cache = EmbeddingCache::in_memory();
        let embedding = vec![1.0, 2.0, 3.0];

        cache.put("doc0", "h1", embedding.clone()).await.unwrap();

        assert_eq!(cache.get("doc0", "h1").await, Some(embedding));
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let cache = EmbeddingCache::in_memory();
        assert!(cache.get("not cached", "h").await.is_none());
    }

    #[tokio::test]
    async fn test_hash_change_is_a_miss() {
        let cache = EmbeddingCache::in_memory();
        cache.put("doc0", "h1", vec![1.0]).await.unwrap();

        assert!(cache.get("doc0", "h2").await.is_none());

        cache.put("doc0", "h2", vec![2.0]).await.unwrap();
        assert_eq!(cache.get("doc0", "h2").await, Some(vec![2.0]));
        assert!(cache.get("doc0", "h1").await.is_none());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("embedding_cache.json");
        let embedding = vec![0.1, -0.25, 3.5e-7, 42.0];

        let cache = EmbeddingCache::load(&path).await.unwrap();
        assert!(cache.is_empty().await);
        cache.put("doc0", "h1", embedding.clone()).await.unwrap();

        let reopened = EmbeddingCache::load(&path).await.unwrap();
        assert_eq!(reopened.get("doc0", "h1").await, Some(embedding));
        assert!(!temp_path_for(&path).exists());
    }

    #[tokio::test]
    async fn test_file_layout() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");

        let cache = EmbeddingCache::load(&path).await.unwrap();
        cache.put("doc0", "abc", vec![1.0, 0.5]).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let entry = &raw["doc0"];
        assert_eq!(entry["hash"], "abc");
        assert_eq!(entry["embedding"], serde_json::json!([1.0, 0.5]));
        assert!(entry["updated_at"].as_f64().unwrap() > 1_600_000_000.0);
        assert!(entry.get("model").is_none());
    }

    #[tokio::test]
    async fn test_loads_existing_store() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(
            &path,
            r#"{
  "doc3": {
    "hash": "ff00",
    "embedding": [0.5, -0.5],
    "updated_at": 1718000000.123
  }
}"#,
        )
        .unwrap();

        let cache = EmbeddingCache::load(&path).await.unwrap();
        assert_eq!(cache.get("doc3", "ff00").await, Some(vec![0.5, -0.5]));
    }

    #[tokio::test]
    async fn test_corrupt_store_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = EmbeddingCache::load(&path).await;
        assert!(matches!(result, Err(EmbeddingError::CacheCorruption { .. })));
    }

    #[tokio::test]
    async fn test_wrong_shape_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(&path, r#"{"doc0": {"hash": "h"}}"#).unwrap();

        let result = EmbeddingCache::load(&path).await;
        assert!(matches!(result, Err(EmbeddingError::CacheCorruption { .. })));
    }

    #[tokio::test]
    async fn test_unreadable_store_is_io_error() {
        let temp_dir = TempDir::new().unwrap();

        // A directory where the file should be cannot be read as a file.
        let result = EmbeddingCache::load(temp_dir.path()).await;
        assert!(matches!(result, Err(EmbeddingError::CacheIo { .. })));
    }

    #[tokio::test]
    async fn test_failed_write_through_restores_entry() {
        let temp_dir = TempDir::new().unwrap();
        let store_dir = temp_dir.path().join("store");
        let cache = EmbeddingCache::load(store_dir.join("cache.json"))
            .await
            .unwrap();
        cache.put("doc0", "h1", vec![1.0]).await.unwrap();

        // Replace the store directory with a plain file so the rewrite fails.
        std::fs::remove_dir_all(&store_dir).unwrap();
        std::fs::write(&store_dir, "not a directory").unwrap();

        let result = cache.put("doc0", "h2", vec![2.0]).await;
        assert!(matches!(result, Err(EmbeddingError::CacheIo { .. })));
        assert!(cache.put("doc1", "h", vec![3.0]).await.is_err());

        assert_eq!(cache.get("doc0", "h1").await, Some(vec![1.0]));
        assert!(cache.get("doc0", "h2").await.is_none());
        assert!(cache.get("doc1", "h").await.is_none());
        assert_eq!(cache.len().await, 1);
        assert!(!cache.stats().await.dirty);
    }

    #[tokio::test]
    async fn test_deferred_writes_need_flush() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        let options = CacheOptions::default().with_write_mode(WriteMode::Deferred);

        let cache = EmbeddingCache::load_with(&path, options).await.unwrap();
        cache.put("doc0", "h", vec![1.0]).await.unwrap();
        assert!(!path.exists());
        assert!(cache.stats().await.dirty);

        cache.flush().await.unwrap();
        assert!(!cache.stats().await.dirty);

        let reopened = EmbeddingCache::load(&path).await.unwrap();
        assert_eq!(reopened.get("doc0", "h").await, Some(vec![1.0]));
    }

    #[tokio::test]
    async fn test_model_scoped_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");

        let unscoped = EmbeddingCache::load(&path).await.unwrap();
        unscoped.put("legacy", "h", vec![1.0]).await.unwrap();

        let scoped = EmbeddingCache::load_with(&path, CacheOptions::default().with_model("m1"))
            .await
            .unwrap();
        assert!(scoped.get("legacy", "h").await.is_none());
        scoped.put("doc0", "h", vec![2.0]).await.unwrap();
        assert_eq!(scoped.get("doc0", "h").await, Some(vec![2.0]));
        assert_eq!(scoped.stats().await.models, vec!["m1".to_string()]);

        let other = EmbeddingCache::load_with(&path, CacheOptions::default().with_model("m2"))
            .await
            .unwrap();
        assert!(other.get("doc0", "h").await.is_none());

        // Without scoping the model tag is ignored.
        let plain = EmbeddingCache::load(&path).await.unwrap();
        assert_eq!(plain.get("doc0", "h").await, Some(vec![2.0]));
    }

    #[tokio::test]
    async fn test_concurrent_puts_on_one_instance() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        let cache = Arc::new(EmbeddingCache::load(&path).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache
                    .put(&format!("doc{i}"), "h", vec![i as f32])
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let reopened = EmbeddingCache::load(&path).await.unwrap();
        assert_eq!(reopened.len().await, 16);
    }

    #[tokio::test]
    async fn test_separate_instances_lose_updates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");

        let first = EmbeddingCache::load(&path).await.unwrap();
        let second = EmbeddingCache::load(&path).await.unwrap();

        first.put("a", "h", vec![1.0]).await.unwrap();
        second.put("b", "h", vec![2.0]).await.unwrap();

        // The second writer never saw "a", so its rewrite dropped it.
        let reopened = EmbeddingCache::load(&path).await.unwrap();
        assert!(reopened.get("a", "h").await.is_none());
        assert_eq!(reopened.get("b", "h").await, Some(vec![2.0]));
    }
}
