// Error handling module
// Defines error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::http_client::ClassroomError;

/// API errors that can occur during request processing
#[derive(Error, Debug)]
pub enum ApiError {
    /// Error from the Classroom API, surfaced with its own status
    #[error("An API error occurred: {status} - {reason}")]
    UpstreamError { status: u16, reason: String },

    /// Anything else: credential I/O, authorization flow, transport
    #[error("An unexpected server error occurred: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UpstreamError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ClassroomError> for ApiError {
    fn from(err: ClassroomError) -> Self {
        match err {
            ClassroomError::Api { status, reason } => ApiError::UpstreamError { status, reason },
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        match self {
            ApiError::UpstreamError { .. } => tracing::warn!("Upstream error: {}", detail),
            ApiError::Internal(ref err) => tracing::error!("Internal error: {:?}", err),
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
