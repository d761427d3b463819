use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// ML resources (embedding model, vector index) are still loading.
    /// Retryable: callers should back off and retry, this is not a bug.
    #[error("Service not ready: {0}")]
    NotReady(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Graph store failure. Distinct from an empty result set, which is a
    /// legitimate success outcome.
    #[error("Graph store error: {0}")]
    Graph(#[from] sqlx::Error),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotReady(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "NOT_READY", msg.clone())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Graph(e) => {
                tracing::error!("Graph store error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "GRAPH_UNAVAILABLE",
                    "The taxonomy store is unavailable".to_string(),
                )
            }
            AppError::Embedding(msg) => {
                tracing::error!("Embedding error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EMBEDDING_ERROR",
                    "An embedding inference error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
