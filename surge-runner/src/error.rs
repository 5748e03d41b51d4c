//! Run error types

use thiserror::Error;

/// Failures that prevent a run from starting or its report from being written.
/// Anything that happens once load is flowing is recorded, not raised.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] surge_config::ConfigError),

    #[error("Authentication failed: {0}")]
    Auth(surge_http::HttpError),

    #[error("HTTP setup error: {0}")]
    Http(surge_http::HttpError),

    #[error("Setup error: {0}")]
    Setup(#[from] surge_core::CoreError),

    #[error("Failed to write report to {path}: {source}")]
    ReportIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    ReportJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RunError>;
