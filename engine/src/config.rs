//! Configuration for the search engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docsearch_corpus::CorpusConfig;
use docsearch_embeddings::{
    CacheOptions, DEFAULT_DIMENSION, EmbeddingProvider, FastEmbedProvider, HashingProvider,
    OpenAIProvider, WriteMode,
};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Configuration for the search engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Document corpus.
    pub corpus: CorpusConfig,

    /// Embedding cache.
    pub cache: CacheConfig,

    /// Embedding provider configuration.
    pub provider: ProviderConfig,

    /// Query defaults.
    pub search: SearchConfig,
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new(docs_dir: impl Into<PathBuf>) -> Self {
        Self {
            corpus: CorpusConfig::new(docs_dir),
            ..Self::default()
        }
    }

    /// Parse a TOML configuration.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Set the cache file.
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache.path = path.into();
        self
    }

    /// Cache options for a provider with the given model id.
    pub fn cache_options(&self, model_id: &str) -> CacheOptions {
        let options = CacheOptions::default().with_write_mode(self.cache.write_mode);
        if self.cache.model_scoped {
            options.with_model(model_id)
        } else {
            options
        }
    }
}

/// Configuration for the embedding cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path of the JSON store.
    pub path: PathBuf,

    /// When writes reach disk.
    pub write_mode: WriteMode,

    /// Tag entries with the provider's model id and ignore entries from
    /// other models.
    pub model_scoped: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("embedding_cache.json"),
            write_mode: WriteMode::default(),
            model_scoped: false,
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Sentence-embedding model run locally, loaded on first use.
    #[default]
    Local,

    /// Offline feature hashing (lexical only, no model).
    Hashing,

    /// OpenAI-compatible embeddings API.
    #[serde(rename = "openai")]
    OpenAI,
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Which provider to use.
    pub kind: ProviderKind,

    /// Model name (local and OpenAI).
    pub model: Option<String>,

    /// API base URL (OpenAI only).
    pub base_url: Option<String>,

    /// Output dimension (hashing and OpenAI).
    pub dimension: Option<usize>,

    /// Where local models are downloaded.
    pub model_cache_dir: Option<PathBuf>,
}

impl ProviderConfig {
    /// Construct the configured provider.
    ///
    /// A local model is only validated here; it is loaded on the first
    /// encode. The OpenAI provider reads its key from `OPENAI_API_KEY`.
    pub fn build(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.kind {
            ProviderKind::Local => {
                let name = self
                    .model
                    .as_deref()
                    .unwrap_or(FastEmbedProvider::DEFAULT_MODEL);
                let mut provider = FastEmbedProvider::new(name)?;
                if let Some(dir) = &self.model_cache_dir {
                    provider = provider.with_cache_dir(dir);
                }
                Ok(Arc::new(provider))
            }
            ProviderKind::Hashing => Ok(Arc::new(HashingProvider::new(
                self.dimension.unwrap_or(DEFAULT_DIMENSION),
            ))),
            ProviderKind::OpenAI => {
                let mut provider = OpenAIProvider::from_env();
                if !provider.is_available() {
                    return Err(EngineError::Config(
                        "OPENAI_API_KEY must be set for the openai provider".to_string(),
                    ));
                }
                if let Some(model) = &self.model {
                    provider = provider.with_model(model);
                }
                if let Some(url) = &self.base_url {
                    provider = provider.with_base_url(url);
                }
                if let Some(dimension) = self.dimension {
                    provider = provider.with_dimensions(dimension);
                }
                Ok(Arc::new(provider))
            }
        }
    }
}

/// Query defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Results returned when a request does not say.
    pub default_top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_top_k: 5 }
    }
}
