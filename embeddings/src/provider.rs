//! Embedding providers.
//!
//! The search engine only depends on the [`EmbeddingProvider`] trait. A
//! provider is an explicitly owned service: construct it once, wrap it in an
//! `Arc` and hand it to whatever needs to encode text.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Trait for embedding providers.
///
/// Implementations must be deterministic: the same text under the same
/// `model_id` must always produce the same vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Identifier of the model (and version) producing the vectors.
    fn model_id(&self) -> &str;

    /// Encode text into an embedding.
    async fn encode(&self, text: &str) -> Result<Embedding>;
}

/// OpenAI-compatible embedding provider.
pub struct OpenAIProvider {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Model to request.
    model: String,

    /// Requested output dimensions (if supported by the model).
    dimensions: Option<usize>,
}

impl OpenAIProvider {
    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "text-embedding-3-small";

    /// Create a new OpenAI provider without credentials.
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            model: Self::DEFAULT_MODEL.to_string(),
            dimensions: None,
        }
    }

    /// Create a provider with the API key taken from `OPENAI_API_KEY`.
    pub fn from_env() -> Self {
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) => Self::new().with_api_key(key),
            Err(_) => Self::new(),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Check if the provider has credentials.
    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn encode(&self, text: &str) -> Result<Embedding> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(EmbeddingError::ProviderNotConfigured)?;

        debug!("Generating embedding with model: {}", self.model);

        let mut body = serde_json::json!({
            "input": text,
            "model": self.model
        });

        if let Some(dims) = self.dimensions {
            body["dimensions"] = serde_json::json!(dims);
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "API error ({status}): {error_text}"
            )));
        }

        let result: OpenAIEmbeddingResponse = response.json().await?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))?
            .embedding;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}

/// Offline provider based on signed FNV-1a feature hashing.
///
/// Each whitespace-separated token is hashed into one of `dimension` buckets
/// and adds +1 or -1 to it. No model is loaded, so vectors only capture
/// lexical overlap. Text without tokens encodes to the zero vector.
pub struct HashingProvider {
    dimension: usize,
    model_id: String,
}

impl HashingProvider {
    /// Create a hashing provider with the given dimension.
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model_id: format!("fnv1a-hashing-{dimension}"),
        }
    }

    /// Output dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn fnv1a(token: &str) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;

        token.bytes().fold(OFFSET, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(PRIME)
        })
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new(crate::DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn encode(&self, text: &str) -> Result<Embedding> {
        let mut embedding = vec![0.0f32; self.dimension];
        let buckets = self.dimension as u64;

        for token in text.split_whitespace() {
            let hash = Self::fnv1a(token);
            // Bucket from the low bits, sign from the top bit.
            let bucket = (hash % buckets) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        Ok(embedding)
    }
}

/// Provider backed by a fixed lookup table.
///
/// Used for fixtures and tests where exact vectors matter. Encoding text that
/// is not in the table fails. Every call is counted, including failures.
pub struct StaticProvider {
    vectors: HashMap<String, Embedding>,
    model_id: String,
    calls: AtomicUsize,
}

impl StaticProvider {
    /// Create an empty table.
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            vectors: HashMap::new(),
            model_id: model_id.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Register the vector returned for `text`.
    pub fn with(mut self, text: impl Into<String>, embedding: Embedding) -> Self {
        self.vectors.insert(text.into(), embedding);
        self
    }

    /// Number of `encode` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn encode(&self, text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::InvalidResponse(format!("no vector for {text:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_openai_provider_encode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_json(serde_json::json!({
                "input": "computer graphics",
                "model": "text-embedding-3-small"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [{"object": "embedding", "index": 0, "embedding": [0.25, -0.5, 1.0]}],
                "model": "text-embedding-3-small",
                "usage": {"prompt_tokens": 2, "total_tokens": 2}
            })))
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new()
            .with_api_key("test-key")
            .with_base_url(server.uri());

        let embedding = provider.encode("computer graphics").await.unwrap();
        assert_eq!(embedding, vec![0.25, -0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_openai_provider_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new()
            .with_api_key("test-key")
            .with_base_url(server.uri());

        let err = provider.encode("anything").await.unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::RateLimited {
                retry_after_secs: 7
            }
        ));
    }

    #[tokio::test]
    async fn test_openai_provider_empty_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": [], "model": "m"})),
            )
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new()
            .with_api_key("test-key")
            .with_base_url(server.uri());

        let err = provider.encode("anything").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_openai_provider_requires_key() {
        let provider = OpenAIProvider::new();
        assert!(!provider.is_available());
        assert!(matches!(
            provider.encode("text").await,
            Err(EmbeddingError::ProviderNotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_hashing_provider_is_deterministic() {
        let provider = HashingProvider::new(64);
        let a = provider.encode("computer graphics rendering").await.unwrap();
        let b = provider.encode("computer graphics rendering").await.unwrap();

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert_eq!(provider.model_id(), "fnv1a-hashing-64");
    }

    #[tokio::test]
    async fn test_hashing_provider_counts_tokens() {
        let provider = HashingProvider::new(16);
        let embedding = provider.encode("word word word").await.unwrap();

        let total: f32 = embedding.iter().map(|v| v.abs()).sum();
        assert_eq!(total, 3.0);
        assert!(provider.encode("").await.unwrap().iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_static_provider_counts_calls() {
        let provider = StaticProvider::new("fixture").with("a", vec![1.0, 0.0]);

        assert_eq!(provider.encode("a").await.unwrap(), vec![1.0, 0.0]);
        assert!(provider.encode("b").await.is_err());
        assert_eq!(provider.calls(), 2);
    }
}
