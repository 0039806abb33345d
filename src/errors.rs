use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sqlx::error::DatabaseError;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for AppError {
    /// Constraint violations surface as client errors, everything else as
    /// an opaque 500. Unique violations come from duplicate slugs/names;
    /// FK violations from creating against a missing parent or deleting a
    /// protected one.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return AppError::Validation(format!(
                    "Constraint violation: {}",
                    db_err.message()
                ));
            }
            if db_err.is_foreign_key_violation() {
                return AppError::Conflict(format!(
                    "Foreign key violation: {}",
                    db_err.message()
                ));
            }
            if db_err.is_check_violation() {
                return AppError::Validation(format!("Value out of range: {}", db_err.message()));
            }
        }
        AppError::DatabaseError(err)
    }
}

/// Failure taxonomy for the weather ingestion pipeline. Every variant is
/// reported to the caller and logged; none are retried within a run (the
/// next scheduled run retries naturally).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Missing or placeholder credential. Fails fast, no HTTP call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Timeout or connection failure.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx HTTP status or provider-reported error code in the body.
    /// `status` is the HTTP status when one was received.
    #[error("provider error: {detail}")]
    Provider { status: Option<u16>, detail: String },

    /// Malformed JSON or unexpected payload shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Constructed record violates a numeric range or ordering invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// The validated record could not be written.
    #[error("storage error: {0}")]
    Storage(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal database error".to_string(),
                )
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}
