//! HTTP error boundary: core error variants → status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use engram_core::Error;
use tracing::error;

/// Wrapper so core errors can flow out of handlers with `?`.
pub struct ApiError(pub Error);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::UnsupportedFormat(msg)
            | Error::EmptyInput(msg)
            | Error::InsufficientData(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Error::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            Error::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            Error::DimensionMismatch { .. } => {
                // A dimension mismatch inside a request path is a
                // programming error, not user input
                error!("Internal error: {}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string())
            }
            _ => {
                error!("Internal error: {}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}
