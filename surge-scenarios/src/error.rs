//! Scenario error types

use thiserror::Error;

/// Harness-internal failure that ends an iteration early.
///
/// API misbehaviour is never an error here; it is recorded as a failed check.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Reference data has no {0}")]
    MissingReferenceData(&'static str),
}

pub type Result<T> = std::result::Result<T, ScenarioError>;
