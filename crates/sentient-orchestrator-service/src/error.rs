//! Sentient orchestrator service: error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sentient_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the service.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is missing, malformed, or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    /// Migration, catalog, or other domain-level startup failure.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            DomainError::SessionNotActive(_) => (StatusCode::CONFLICT, "session_not_active"),
            DomainError::InvalidStateTransition { .. } => {
                (StatusCode::CONFLICT, "invalid_state_transition")
            }
            DomainError::ConcurrencyConflict { .. } => {
                (StatusCode::CONFLICT, "concurrency_conflict")
            }
            DomainError::Transport(_) => (StatusCode::SERVICE_UNAVAILABLE, "transport_error"),
            DomainError::Persistence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
