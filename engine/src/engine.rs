//! Search index implementation.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use docsearch_corpus::{CorpusConfig, CorpusScanner, DocumentLoader};
use docsearch_embeddings::{EmbeddingCache, EmbeddingProvider, SearchResult, VectorIndex};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// The searchable document index.
///
/// This is the main entry point of the engine. It coordinates:
/// - Corpus enumeration and document normalization
/// - Embedding reuse through the content-hash validated cache
/// - Fresh embeddings from the injected provider
/// - Exact cosine ranking of queries
///
/// `build` takes `&mut self`, so an index cannot be rebuilt while it is being
/// searched; once built it can be shared behind an `Arc` and searched from
/// many tasks.
pub struct SearchIndex {
    /// Embedding provider for documents and queries.
    provider: Arc<dyn EmbeddingProvider>,

    /// Persistent embedding cache.
    cache: EmbeddingCache,

    /// Corpus settings (the directory is supplied per build).
    corpus: CorpusConfig,

    /// Published vectors, in corpus order.
    vectors: VectorIndex,
}

impl SearchIndex {
    /// Create an empty index.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        cache: EmbeddingCache,
        corpus: CorpusConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            corpus,
            vectors: VectorIndex::new(),
        }
    }

    /// Open the configured cache and build the configured corpus.
    ///
    /// Fails if the cache store is unreadable or corrupt, or if any document
    /// fails to load or embed.
    pub async fn open(config: &EngineConfig, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        info!("Initializing search index");

        let options = config.cache_options(provider.model_id());
        let cache = EmbeddingCache::load_with(&config.cache.path, options).await?;

        let mut index = Self::new(provider, cache, config.corpus.clone());
        index.build(&config.corpus.path).await?;

        info!("Search index initialized");
        Ok(index)
    }

    /// Embed every document in `dir` and publish the result.
    ///
    /// Documents are processed one at a time in ascending path order. The
    /// first failure aborts the build and leaves the previously published
    /// vectors in place. Only vectors that fit the index are written to the
    /// cache; cached vectors that are malformed or of another dimension are
    /// treated as misses.
    pub async fn build(&mut self, dir: impl AsRef<Path>) -> Result<BuildReport> {
        let start = Instant::now();
        let dir = dir.as_ref();

        let mut corpus = self.corpus.clone();
        corpus.path = dir.to_path_buf();
        let loader = DocumentLoader::new(corpus.decode);
        let entries = CorpusScanner::new(corpus).scan()?;

        info!(
            "Building index for {} documents in {}",
            entries.len(),
            dir.display()
        );

        let mut vectors = VectorIndex::new();
        let mut cache_hits = 0;
        let mut embedded = 0;

        for entry in entries {
            let doc_id = entry.doc_id;
            let document = loader
                .load(&entry.path)
                .await
                .map_err(|source| EngineError::Load {
                    doc_id: doc_id.clone(),
                    source,
                })?;

            let cached = self
                .cache
                .get(&doc_id, &document.content_hash)
                .await
                .filter(|cached| {
                    let usable = validate(&doc_id, cached).is_ok()
                        && vectors.check_dimension(cached).is_ok();
                    if !usable {
                        warn!("Ignoring unusable cached embedding for {doc_id}");
                    }
                    usable
                });

            let embedding = match cached {
                Some(cached) => {
                    debug!("Using cached embedding for {doc_id}");
                    cache_hits += 1;
                    cached
                }
                None => {
                    debug!("Computing embedding for {doc_id}");
                    let fresh = self
                        .provider
                        .encode(&document.cleaned_text)
                        .await
                        .map_err(|source| EngineError::Embed {
                            doc_id: doc_id.clone(),
                            source,
                        })?;
                    validate(&doc_id, &fresh)?;
                    vectors
                        .check_dimension(&fresh)
                        .map_err(|source| EngineError::Embed {
                            doc_id: doc_id.clone(),
                            source,
                        })?;

                    self.cache
                        .put(&doc_id, &document.content_hash, fresh.clone())
                        .await
                        .map_err(|source| EngineError::Cache {
                            doc_id: doc_id.clone(),
                            source,
                        })?;
                    embedded += 1;
                    fresh
                }
            };

            vectors
                .push(doc_id.clone(), embedding)
                .map_err(|source| EngineError::Embed { doc_id, source })?;
        }

        self.cache.flush().await?;
        self.vectors = vectors;

        let report = BuildReport {
            documents: self.vectors.len(),
            cache_hits,
            embedded,
            elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        info!(
            "Indexed {} documents in {}ms (cached: {}, embedded: {})",
            report.documents, report.elapsed_ms, report.cache_hits, report.embedded
        );

        Ok(report)
    }

    /// Rank the indexed documents against `query` and return the best
    /// `top_k`.
    ///
    /// The query is encoded fresh on every call. An empty index or
    /// `top_k == 0` returns no results without calling the provider.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if top_k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Processing query: {query}");
        let query_embedding = self.provider.encode(query).await?;

        self.vectors
            .search(&query_embedding, top_k)
            .map_err(EngineError::from)
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Indexed document ids in corpus order.
    pub fn doc_ids(&self) -> &[String] {
        self.vectors.doc_ids()
    }

    /// The embedding cache.
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }
}

fn validate(doc_id: &str, embedding: &[f32]) -> Result<()> {
    let reason = if embedding.is_empty() {
        "provider returned an empty vector"
    } else if embedding.iter().any(|v| !v.is_finite()) {
        "provider returned a non-finite component"
    } else {
        return Ok(());
    };

    Err(EngineError::MalformedEmbedding {
        doc_id: doc_id.to_string(),
        reason: reason.to_string(),
    })
}

/// Statistics about a completed build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Number of documents in the published index.
    pub documents: usize,

    /// Documents whose cached embedding was reused.
    pub cache_hits: usize,

    /// Documents embedded by the provider.
    pub embedded: usize,

    /// Time taken in milliseconds.
    pub elapsed_ms: u64,
}
