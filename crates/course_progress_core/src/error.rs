//! crates/course_progress_core/src/error.rs
//!
//! The error type shared by the ports and the core components.
//! Every variant is a distinct, stable kind so callers can branch on it
//! without inspecting message text.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("User {user_id} is already enrolled in course {course_id}")]
    AlreadyEnrolled { user_id: Uuid, course_id: Uuid },
    #[error("Score {score} is below the passing score of {threshold}")]
    ScoreTooLow { score: i32, threshold: i32 },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// Unexpected failure of the persistent store. Never retried by the core.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// A stable, machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::AlreadyEnrolled { .. } => "ALREADY_ENROLLED",
            CoreError::ScoreTooLow { .. } => "SCORE_TOO_LOW",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::Unauthorized => "UNAUTHORIZED",
            CoreError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// A convenience type alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;
