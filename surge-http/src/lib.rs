//! HTTP plumbing for surge
//!
//! [`HttpExecutor`] sends one tagged [`WorkflowRequest`] and reports what
//! happened as a [`CallOutcome`]; it never retries and never fails the
//! caller. [`Session`] owns the bearer token, and [`ApiClient`] ties the two
//! together for the scenario workflows.

pub mod client;
pub mod config;
pub mod errors;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use client::{ApiClient, HttpExecutor};
pub use config::build_client;
pub use errors::HttpError;
pub use session::{Session, REFRESH_BACKOFF};
pub use types::{CallFailure, CallOutcome, HttpMethod, RequestTags, WorkflowRequest};
