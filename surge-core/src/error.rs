//! Core error types for surge

use thiserror::Error;

/// Errors raised while setting up a run. Nothing in here is raised per call.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Reference data could not be used
    #[error("Reference data error: {0}")]
    ReferenceData(String),

    /// Dispatch table cannot select anything
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Histogram bounds rejected
    #[error("Metrics error: {0}")]
    Metrics(#[from] hdrhistogram::CreationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for surge-core
pub type Result<T> = std::result::Result<T, CoreError>;
