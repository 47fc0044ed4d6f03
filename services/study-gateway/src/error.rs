//! Per-request error types
//!
//! Every failure a handler can hit maps to one HTTP status and one `type`
//! string in the JSON error body. Startup failures use `anyhow` in main.rs
//! and never reach this type.

use axum::http::StatusCode;
use thiserror::Error;

use crate::assistant::{AssistantError, PresentationError};
use crate::documents::SlideParseError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Assistant(#[from] AssistantError),

    /// The backend answered, but not in the shape the operation needs.
    #[error(transparent)]
    InvalidOutput(#[from] SlideParseError),
}

impl From<PresentationError> for ApiError {
    fn from(err: PresentationError) -> Self {
        match err {
            PresentationError::Assistant(e) => ApiError::Assistant(e),
            PresentationError::Slides(e) => ApiError::InvalidOutput(e),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Assistant(key_rotation::Error::DailyLimitReached) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Assistant(key_rotation::Error::AttemptsExhausted { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Assistant(key_rotation::Error::Backend(_)) | ApiError::InvalidOutput(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid_request",
            ApiError::InvalidOutput(_) => "invalid_model_output",
            ApiError::Assistant(key_rotation::Error::Backend(_)) => "backend_error",
            ApiError::Assistant(e) => e.kind(),
        }
    }
}
