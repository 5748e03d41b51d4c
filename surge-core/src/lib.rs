//! Core run machinery for surge: reference data, scenario dispatch, metric
//! aggregation, checks, degradation tracking and the SLA verdict.

pub mod checks;
pub mod context;
pub mod degradation;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod reference;
pub mod thresholds;

pub use checks::{batch_passes, CheckCategory, CheckEngine, CheckTally, PassFail};
pub use context::TestContext;
pub use degradation::{BucketSummary, DegradationReport, DegradationTracker, HealthSnapshot, SeriesTrend};
pub use dispatch::{ScenarioTable, WeightedTable};
pub use error::{CoreError, Result};
pub use metrics::{IterationCounts, MetricsRegistry, OperationSummary, WorkerRecorder};
pub use reference::ReferenceData;
pub use thresholds::{ThresholdEvaluator, ThresholdResult, ThresholdStatus, Verdict};
