//! Error types for backend calls

/// Errors from a single generation call.
///
/// `status()` and the Display text are what the retry layer inspects to tell
/// quota exhaustion and overload apart from everything else.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Backend answered with a non-success status. `body` is the raw response
    /// body, which carries the backend's own status string (e.g. `RESOURCE_EXHAUSTED`).
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid backend response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl BackendError {
    /// HTTP status of the failed call, when the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;
