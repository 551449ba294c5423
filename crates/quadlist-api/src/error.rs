use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use quadlist_db::DbError;

/// Request-boundary error taxonomy. Every data-access failure is caught here
/// and mapped to a status; message text is what the client sees, so internal
/// detail stays out of it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input shape, domain, or enum value.
    #[error("{0}")]
    Validation(String),
    /// Bad credential or unverified account. Deliberately generic.
    #[error("{0}")]
    Auth(String),
    /// Missing or expired session.
    #[error("Authentication required")]
    AuthRequired,
    /// Duplicate email.
    #[error("{0}")]
    Conflict(String),
    /// Missing resource — or one owned by someone else; the two are
    /// indistinguishable on purpose.
    #[error("{0}")]
    NotFound(String),
    /// Storage-layer failure. The cause is logged, never sent to the client.
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Conflict => ApiError::Conflict("Resource already exists".to_string()),
            DbError::Other(e) => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) | ApiError::Auth(_) | ApiError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::AuthRequired => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(cause) => {
                error!("internal error: {:#}", cause);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
