//! Run orchestration for surge
//!
//! An arrival-rate [`Scheduler`] starts scenario iterations on a pool of
//! reusable workers; [`lifecycle`] wraps it with setup and teardown and
//! produces a [`RunReport`].

pub mod error;
pub mod host;
pub mod iterations;
pub mod lifecycle;
pub mod report;
pub mod scheduler;
pub mod shutdown;

pub use error::{Result, RunError};
pub use iterations::{ScenarioIterations, ScenarioWorker};
pub use lifecycle::{execute, finalize_run, initialize_run, run_profile, RunContext};
pub use report::RunReport;
pub use scheduler::{IterationRunner, RateCurve, ScheduleSummary, Scheduler};
pub use shutdown::{Shutdown, StopReason};
