//! Error types for the canvas API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Caller
//! input errors become `400`; store failures become `500` and are logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use beli_db::StoreError;
use beli_types::CodecError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Coordinates or color rejected by the tile codec.
    #[error("{0}")]
    Codec(#[from] CodecError),

    /// The board store rejected or failed the operation.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The request body or query could not be parsed.
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// A server-side task failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Codec(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(e) if e.is_caller_error() => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
