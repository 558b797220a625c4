//! Local embedding models run through fastembed.
//!
//! The model is not loaded when the provider is constructed. The first call
//! to `encode` downloads (if needed) and initializes it; later calls reuse
//! the loaded model. Loading and inference are blocking, so both run on the
//! blocking thread pool.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{InitOptions, TextEmbedding};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;

/// Provider backed by a local sentence-embedding model.
pub struct FastEmbedProvider {
    model: fastembed::EmbeddingModel,
    model_id: String,
    cache_dir: Option<PathBuf>,

    /// fastembed's `embed` needs exclusive access.
    loaded: OnceCell<Arc<Mutex<TextEmbedding>>>,
}

impl FastEmbedProvider {
    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "all-MiniLM-L6-v2";

    /// Create a provider for `model_name` without loading it.
    pub fn new(model_name: &str) -> Result<Self> {
        Ok(Self {
            model: parse_model_name(model_name)?,
            model_id: model_name.to_string(),
            cache_dir: None,
            loaded: OnceCell::new(),
        })
    }

    /// Directory where model files are downloaded.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    #[cfg(test)]
    fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    async fn loaded_model(&self) -> Result<Arc<Mutex<TextEmbedding>>> {
        self.loaded
            .get_or_try_init(|| async {
                info!("Loading embedding model {}", self.model_id);

                let mut options =
                    InitOptions::new(self.model.clone()).with_show_download_progress(false);
                if let Some(dir) = &self.cache_dir {
                    options = options.with_cache_dir(dir.clone());
                }

                let model = tokio::task::spawn_blocking(move || TextEmbedding::try_new(options))
                    .await
                    .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?
                    .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;

                info!("Embedding model {} ready", self.model_id);
                Ok::<_, EmbeddingError>(Arc::new(Mutex::new(model)))
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn name(&self) -> &str {
        "fastembed"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn encode(&self, text: &str) -> Result<Embedding> {
        let model = self.loaded_model().await?;
        let text = text.to_string();
        debug!("Encoding {} bytes with {}", text.len(), self.model_id);

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| EmbeddingError::Model(format!("model lock poisoned: {e}")))?;

            model
                .embed(vec![text], None)
                .map_err(|e| EmbeddingError::Model(e.to_string()))?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    EmbeddingError::InvalidResponse("model returned no embedding".to_string())
                })
        })
        .await
        .map_err(|e| EmbeddingError::Model(e.to_string()))?
    }
}

fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l6-v2-q" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-small-en-v1.5-q" => Ok(fastembed::EmbeddingModel::BGESmallENV15Q),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-base-en-v1.5-q" => Ok(fastembed::EmbeddingModel::BGEBaseENV15Q),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "bge-large-en-v1.5-q" => Ok(fastembed::EmbeddingModel::BGELargeENV15Q),
        _ => Err(EmbeddingError::UnknownModel(name.to_string())),
    }
}
