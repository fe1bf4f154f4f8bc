//! Error types for the Observer API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use liftsim_core::CallError;
use liftsim_db::DbError;
use tracing::warn;

/// Errors that can occur in the Observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was well-formed but its values were rejected.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request conflicts with the resource's current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// The entity store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CallError> for ObserverError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::UnknownBuilding(_) | CallError::UnknownCall(_) => {
                Self::NotFound(err.to_string())
            }
            CallError::InvalidFloor { .. } | CallError::InvalidBuilding(_) => {
                Self::InvalidRequest(err.to_string())
            }
            CallError::AlreadyHandled(_) => Self::Conflict(err.to_string()),
            CallError::Store { source } => source.into(),
        }
    }
}

impl From<DbError> for ObserverError {
    fn from(err: DbError) -> Self {
        warn!(error = %err, "Store request failed");
        Self::Unavailable(err.to_string())
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) | Self::InvalidUuid(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
