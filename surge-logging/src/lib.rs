//! Logging setup for surge
//!
//! All crates log through `tracing`; this crate installs the global
//! subscriber from [`surge_config::LoggingConfig`].

pub mod init;

pub use init::{build_filter, init_logging, init_simple_tracing, LoggingGuard};
