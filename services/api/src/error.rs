//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! kind is rendered as an HTTP response.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use course_progress_core::error::CoreError;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the core components or ports.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying schema migrations at startup.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Stable kind, e.g. `NOT_FOUND` or `SCORE_TOO_LOW`.
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Core(e) => match e {
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::AlreadyEnrolled { .. } | CoreError::Conflict(_) => StatusCode::CONFLICT,
                CoreError::ScoreTooLow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                CoreError::Unauthorized => StatusCode::UNAUTHORIZED,
                CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Core(e) => e.kind(),
            _ => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal details are logged, never echoed to the client.
        let message = if status.is_server_error() {
            error!(kind = self.kind(), "Request failed: {}", self);
            "An internal error occurred".to_string()
        } else {
            match &self {
                ApiError::Core(e) => e.to_string(),
                other => other.to_string(),
            }
        };
        let body = ErrorBody {
            error: self.kind().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
