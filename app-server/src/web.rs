//! HTTP routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use docsearch_engine::{EmbeddingError, EngineError};
use serde_json::json;
use tracing::error;

use crate::handler::{HealthResponse, SearchHandler, SearchRequest, SearchResponse};

/// Build the application router.
pub fn router(handler: SearchHandler) -> Router {
    Router::new()
        .route("/search", post(search))
        .route("/health", get(health))
        .with_state(Arc::new(handler))
}

async fn search(
    State(handler): State<Arc<SearchHandler>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, HttpError> {
    Ok(Json(handler.search(request).await?))
}

async fn health(State(handler): State<Arc<SearchHandler>>) -> Json<HealthResponse> {
    Json(handler.health().await)
}

/// Engine failure surfaced to an HTTP client.
#[derive(Debug)]
pub struct HttpError(EngineError);

impl From<EngineError> for HttpError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        error!("Search failed: {}", self.0);

        let status = match &self.0 {
            EngineError::Embedding(
                EmbeddingError::ApiRequest(_)
                | EmbeddingError::Http(_)
                | EmbeddingError::InvalidResponse(_)
                | EmbeddingError::RateLimited { .. },
            ) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
