//! HTTP error types

/// Error type for HTTP operations that the caller has to act on.
///
/// Per-call failures during a run are not errors: they are reported through
/// [`crate::CallOutcome`] and judged by the check engine.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Authentication failed (status {status}): {message}")]
    AuthError { status: u16, message: String },
}
