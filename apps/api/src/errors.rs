use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ai::AiError;
use crate::export::ExportError;
use crate::models::resume::ModelError;

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
    Model(#[from] ModelError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retryable = false;

        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Model(e) => match e {
                ModelError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
                ModelError::DuplicateId { .. } => {
                    (StatusCode::CONFLICT, "DUPLICATE_ID", e.to_string())
                }
                _ => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),
            },
            AppError::Export(e) => {
                tracing::error!("Export error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXPORT_ERROR",
                    e.user_message(),
                )
            }
            AppError::Ai(e) => {
                retryable = e.is_retryable();
                let (status, code) = match e {
                    AiError::MissingCredential => {
                        (StatusCode::SERVICE_UNAVAILABLE, "AI_NOT_CONFIGURED")
                    }
                    AiError::Auth => (StatusCode::BAD_GATEWAY, "AI_AUTH_FAILED"),
                    AiError::QuotaExceeded => (StatusCode::TOO_MANY_REQUESTS, "AI_QUOTA_EXCEEDED"),
                    AiError::MalformedResponse(_) => {
                        (StatusCode::BAD_GATEWAY, "AI_MALFORMED_RESPONSE")
                    }
                    AiError::Connectivity { .. } => (StatusCode::BAD_GATEWAY, "AI_UNREACHABLE"),
                    AiError::Api { .. } => (StatusCode::BAD_GATEWAY, "AI_ERROR"),
                    AiError::EmptyContent => (StatusCode::BAD_GATEWAY, "AI_EMPTY_RESPONSE"),
                    AiError::InvalidUpload(_) => (StatusCode::BAD_REQUEST, "INVALID_UPLOAD"),
                };
                if status.is_server_error() {
                    tracing::error!("AI error: {e}");
                } else {
                    tracing::warn!("AI error: {e}");
                }
                (status, code, e.user_message())
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

        let mut error = json!({
            "code": code,
            "message": message
        });
        if retryable {
            error["retryable"] = json!(true);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
