use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::orders::store::StoreError;

/// Rejections at the payment webhook trust boundary. None of these mutate an order.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Event carries no order reference")]
    MissingOrderReference,
}

/// Failures of the order pipeline. The caller of `advance` turns any of these
/// into a single `processing -> failed` transition.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Artifact unavailable: {0}")]
    ArtifactUnavailable(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Persist failed: {0}")]
    PersistFailed(String),
}

impl ProcessingError {
    /// Stable machine-readable code, used as a log field.
    pub fn code(&self) -> &'static str {
        match self {
            ProcessingError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            ProcessingError::ArtifactUnavailable(_) => "ARTIFACT_UNAVAILABLE",
            ProcessingError::ExtractionFailed(_) => "EXTRACTION_FAILED",
            ProcessingError::GenerationFailed(_) => "GENERATION_FAILED",
            ProcessingError::PersistFailed(_) => "PERSIST_FAILED",
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Webhook(e) => {
                tracing::warn!("Webhook rejected: {e}");
                let code = match e {
                    WebhookError::InvalidSignature(_) => "INVALID_SIGNATURE",
                    WebhookError::MalformedEvent(_) => "MALFORMED_EVENT",
                    WebhookError::MissingOrderReference => "MISSING_ORDER_REFERENCE",
                };
                (StatusCode::BAD_REQUEST, code, e.to_string())
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
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
