use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The request collides with work already in progress.
    #[error("conflict: {0}")]
    Conflict(String),
    /// A spawned run ended without reporting its result.
    #[error("run aborted: {0}")]
    RunAborted(String),
}

/// Application-level errors that are converted to HTTP responses.
///
/// Malformed or invalid request bodies never get here: the `Valid<Json<_>>`
/// extractor rejects them with `400` first.
#[derive(Debug, Error)]
pub enum AppError {
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Request conflicts with the current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::RunAborted(message) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
