//! Run-owned metric aggregation
//!
//! Workers record into a private [`WorkerRecorder`] and merge into the
//! shared [`MetricsRegistry`] about once a second and when they retire, so
//! no lock is touched while a request is being timed.

use crate::checks::{CheckCategory, CheckTally};
use crate::degradation::DegradationTracker;
use crate::error::Result;
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use surge_config::Operation;
use surge_http::CallOutcome;
use tracing::warn;

/// Latencies are recorded in microseconds, 1µs to 60s, 3 significant digits
const LOWEST_MICROS: u64 = 1;
const HIGHEST_MICROS: u64 = 60_000_000;
const SIGNIFICANT_DIGITS: u8 = 3;

const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Value at `quantile`, reported as the low edge of its HDR bucket so a
/// sample under a ceiling is never reported above it
fn quantile_micros(histogram: &Histogram<u64>, quantile: f64) -> u64 {
    histogram.lowest_equivalent(histogram.value_at_quantile(quantile))
}

/// Samples of one operation tag
#[derive(Debug, Clone)]
struct OperationMetrics {
    histogram: Histogram<u64>,
    errors: u64,
    statuses: BTreeMap<u16, u64>,
}

impl OperationMetrics {
    fn new(template: &Histogram<u64>) -> Self {
        Self {
            histogram: Histogram::new_from(template),
            errors: 0,
            statuses: BTreeMap::new(),
        }
    }

    fn record(&mut self, outcome: &CallOutcome) {
        let micros = (outcome.elapsed.as_micros() as u64).clamp(LOWEST_MICROS, HIGHEST_MICROS);
        self.histogram.saturating_record(micros);
        if !outcome.is_success() {
            self.errors += 1;
        }
        *self.statuses.entry(outcome.status).or_insert(0) += 1;
    }

    fn merge_from(&mut self, other: &mut OperationMetrics) {
        if other.histogram.is_empty() && other.errors == 0 {
            return;
        }
        if let Err(e) = self.histogram.add(&other.histogram) {
            warn!(error = %e, "Dropping histogram partial that could not be merged");
        }
        self.errors += other.errors;
        for (status, count) in std::mem::take(&mut other.statuses) {
            *self.statuses.entry(status).or_insert(0) += count;
        }
        other.histogram.reset();
        other.errors = 0;
    }
}

/// Per-operation summary for reports
#[derive(Debug, Clone, Serialize)]
pub struct OperationSummary {
    pub operation: Operation,
    pub count: u64,
    pub errors: u64,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
    pub statuses: BTreeMap<u16, u64>,
}

/// Iteration counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IterationCounts {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub dropped: u64,
    /// Still running when the graceful-stop window closed
    pub abandoned: u64,
}

/// Metric aggregate owned by one run
#[derive(Debug)]
pub struct MetricsRegistry {
    started_at: Instant,
    template: Histogram<u64>,
    operations: Vec<Mutex<OperationMetrics>>,
    checks: Mutex<CheckTally>,
    degradation: Option<Arc<DegradationTracker>>,

    iterations_started: AtomicU64,
    iterations_completed: AtomicU64,
    iterations_failed: AtomicU64,
    iterations_dropped: AtomicU64,
    iterations_abandoned: AtomicU64,

    business_calls: AtomicU64,
    business_errors: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        Self::with_start(Instant::now(), None)
    }

    /// Registry whose elapsed-time origin is `started_at`, feeding `degradation` if set
    pub fn with_start(started_at: Instant, degradation: Option<Arc<DegradationTracker>>) -> Result<Self> {
        let template = Histogram::new_with_bounds(LOWEST_MICROS, HIGHEST_MICROS, SIGNIFICANT_DIGITS)?;
        let operations = Operation::ALL
            .iter()
            .map(|_| Mutex::new(OperationMetrics::new(&template)))
            .collect();

        Ok(Self {
            started_at,
            template,
            operations,
            checks: Mutex::new(CheckTally::default()),
            degradation,
            iterations_started: AtomicU64::new(0),
            iterations_completed: AtomicU64::new(0),
            iterations_failed: AtomicU64::new(0),
            iterations_dropped: AtomicU64::new(0),
            iterations_abandoned: AtomicU64::new(0),
            business_calls: AtomicU64::new(0),
            business_errors: AtomicU64::new(0),
        })
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn degradation(&self) -> Option<&Arc<DegradationTracker>> {
        self.degradation.as_ref()
    }

    pub fn iteration_started(&self) {
        self.iterations_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn iteration_completed(&self) {
        self.iterations_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn iteration_failed(&self) {
        self.iterations_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn iteration_dropped(&self) {
        self.iterations_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn iterations_abandoned(&self, count: u64) {
        self.iterations_abandoned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn iterations(&self) -> IterationCounts {
        IterationCounts {
            started: self.iterations_started.load(Ordering::Relaxed),
            completed: self.iterations_completed.load(Ordering::Relaxed),
            failed: self.iterations_failed.load(Ordering::Relaxed),
            dropped: self.iterations_dropped.load(Ordering::Relaxed),
            abandoned: self.iterations_abandoned.load(Ordering::Relaxed),
        }
    }

    /// Failed business calls / all business calls; 0 when nothing was called
    pub fn business_error_rate(&self) -> f64 {
        let calls = self.business_calls.load(Ordering::Relaxed);
        if calls == 0 {
            return 0.0;
        }
        self.business_errors.load(Ordering::Relaxed) as f64 / calls as f64
    }

    pub fn business_calls(&self) -> (u64, u64) {
        (
            self.business_calls.load(Ordering::Relaxed),
            self.business_errors.load(Ordering::Relaxed),
        )
    }

    /// Latency at `percentile` (0-100] over every merged sample of `operation`
    pub fn percentile(&self, operation: Operation, percentile: f64) -> Option<Duration> {
        let metrics = self.operations[operation.index()].lock();
        if metrics.histogram.is_empty() {
            return None;
        }
        let micros = quantile_micros(&metrics.histogram, percentile / 100.0);
        Some(Duration::from_micros(micros))
    }

    pub fn sample_count(&self, operation: Operation) -> u64 {
        self.operations[operation.index()].lock().histogram.len()
    }

    /// Summaries of every operation that has samples, in tag order
    pub fn summaries(&self) -> Vec<OperationSummary> {
        Operation::ALL
            .iter()
            .filter_map(|&operation| {
                let metrics = self.operations[operation.index()].lock();
                let h = &metrics.histogram;
                if h.is_empty() {
                    return None;
                }
                let ms = |micros: u64| micros as f64 / 1000.0;
                Some(OperationSummary {
                    operation,
                    count: h.len(),
                    errors: metrics.errors,
                    min_ms: ms(h.min()),
                    mean_ms: h.mean() / 1000.0,
                    p50_ms: ms(quantile_micros(h, 0.50)),
                    p90_ms: ms(quantile_micros(h, 0.90)),
                    p95_ms: ms(quantile_micros(h, 0.95)),
                    p99_ms: ms(quantile_micros(h, 0.99)),
                    max_ms: ms(h.max()),
                    statuses: metrics.statuses.clone(),
                })
            })
            .collect()
    }

    pub fn checks(&self) -> CheckTally {
        self.checks.lock().clone()
    }

    fn merge(&self, partial: &mut [OperationMetrics], checks: &mut CheckTally) {
        for (index, metrics) in partial.iter_mut().enumerate() {
            if metrics.histogram.is_empty() && metrics.errors == 0 {
                continue;
            }
            self.operations[index].lock().merge_from(metrics);
        }
        if !checks.is_empty() {
            self.checks.lock().merge(std::mem::take(checks));
        }
    }
}

/// Per-worker partial aggregate. Merged on [`flush`](Self::flush) and on drop.
#[derive(Debug)]
pub struct WorkerRecorder {
    registry: Arc<MetricsRegistry>,
    operations: Vec<OperationMetrics>,
    checks: CheckTally,
    last_flush: Instant,
}

impl WorkerRecorder {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        let operations = Operation::ALL
            .iter()
            .map(|_| OperationMetrics::new(&registry.template))
            .collect();
        Self {
            registry,
            operations,
            checks: CheckTally::default(),
            last_flush: Instant::now(),
        }
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    /// Elapsed time since the run started
    pub fn run_elapsed(&self) -> Duration {
        self.registry.started_at.elapsed()
    }

    /// Record the latency sample of one call
    pub fn observe(&mut self, outcome: &CallOutcome) {
        let operation = outcome.operation();
        self.operations[operation.index()].record(outcome);

        if operation.is_business() {
            self.registry.business_calls.fetch_add(1, Ordering::Relaxed);
            if !outcome.is_success() {
                self.registry.business_errors.fetch_add(1, Ordering::Relaxed);
            }
            if let Some(ref tracker) = self.registry.degradation {
                tracker.record(self.run_elapsed(), outcome.elapsed, !outcome.is_success());
            }
        }

        self.maybe_flush();
    }

    /// Record one named check outcome
    pub fn check(&mut self, category: CheckCategory, name: &str, passed: bool) {
        self.checks.record(category, name, passed);
    }

    /// Merge into the registry if the flush interval has passed
    pub fn maybe_flush(&mut self) {
        if self.last_flush.elapsed() >= FLUSH_INTERVAL {
            self.flush();
        }
    }

    pub fn flush(&mut self) {
        self.registry.merge(&mut self.operations, &mut self.checks);
        self.last_flush = Instant::now();
    }
}

impl Drop for WorkerRecorder {
    fn drop(&mut self) {
        self.flush();
    }
}
