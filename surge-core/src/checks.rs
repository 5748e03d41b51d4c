//! Check/assertion engine
//!
//! Every check is a named pass/fail in one category. The hard SLA check and
//! the client timeout guard are separate categories: a slow answer is an SLA
//! miss, no answer within the guard is a harness-level failure.

use crate::metrics::WorkerRecorder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use surge_config::{Operation, ThresholdTable};
use surge_http::CallOutcome;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    Status,
    Sla,
    TimeoutGuard,
    Transport,
    Shape,
    Batch,
}

impl CheckCategory {
    pub const ALL: [CheckCategory; 6] = [
        CheckCategory::Status,
        CheckCategory::Sla,
        CheckCategory::TimeoutGuard,
        CheckCategory::Transport,
        CheckCategory::Shape,
        CheckCategory::Batch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CheckCategory::Status => "status",
            CheckCategory::Sla => "sla",
            CheckCategory::TimeoutGuard => "timeout_guard",
            CheckCategory::Transport => "transport",
            CheckCategory::Shape => "shape",
            CheckCategory::Batch => "batch",
        }
    }
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pass and fail counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassFail {
    pub passed: u64,
    pub failed: u64,
}

impl PassFail {
    pub fn total(&self) -> u64 {
        self.passed + self.failed
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total() == 0 {
            return 1.0;
        }
        self.passed as f64 / self.total() as f64
    }

    fn add(&mut self, passed: bool) {
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Check outcomes by category and by name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckTally {
    pub by_category: BTreeMap<CheckCategory, PassFail>,
    pub by_name: BTreeMap<CheckCategory, BTreeMap<String, PassFail>>,
}

impl CheckTally {
    pub fn record(&mut self, category: CheckCategory, name: &str, passed: bool) {
        self.by_category.entry(category).or_default().add(passed);
        let names = self.by_name.entry(category).or_default();
        match names.get_mut(name) {
            Some(counts) => counts.add(passed),
            None => {
                let mut counts = PassFail::default();
                counts.add(passed);
                names.insert(name.to_string(), counts);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }

    pub fn category(&self, category: CheckCategory) -> PassFail {
        self.by_category.get(&category).copied().unwrap_or_default()
    }

    pub fn merge(&mut self, other: CheckTally) {
        for (category, counts) in other.by_category {
            let entry = self.by_category.entry(category).or_default();
            entry.passed += counts.passed;
            entry.failed += counts.failed;
        }
        for (category, names) in other.by_name {
            let mine = self.by_name.entry(category).or_default();
            for (name, counts) in names {
                let entry = mine.entry(name).or_default();
                entry.passed += counts.passed;
                entry.failed += counts.failed;
            }
        }
    }
}

/// `successes / total >= min_rate`; an empty batch never passes
pub fn batch_passes(successes: usize, total: usize, min_rate: f64) -> bool {
    if total == 0 {
        return false;
    }
    successes as f64 / total as f64 >= min_rate
}

/// Applies the active profile's SLA ceilings to call outcomes
#[derive(Debug, Clone)]
pub struct CheckEngine {
    ceilings: Vec<Option<Duration>>,
    timeout_guard: Duration,
}

impl CheckEngine {
    pub fn new(thresholds: &ThresholdTable, timeout_guard: Duration) -> Self {
        let ceilings = Operation::ALL
            .iter()
            .map(|&op| thresholds.sla_ceiling(op))
            .collect();
        Self {
            ceilings,
            timeout_guard,
        }
    }

    /// Registered SLA ceiling of `operation`, if any
    pub fn ceiling(&self, operation: Operation) -> Option<Duration> {
        self.ceilings[operation.index()]
    }

    pub fn timeout_guard(&self) -> Duration {
        self.timeout_guard
    }

    /// Check one call: timeout guard, transport, expected status and, for
    /// functionally successful calls with a ceiling, the SLA.
    ///
    /// Returns whether the call succeeded functionally (a response with an
    /// expected status), regardless of the SLA verdict.
    pub fn check_call(&self, recorder: &mut WorkerRecorder, outcome: &CallOutcome, expected: &[u16]) -> bool {
        let op = outcome.operation().as_str();

        let within_guard = !outcome.timed_out();
        recorder.check(CheckCategory::TimeoutGuard, &format!("{} within timeout guard", op), within_guard);
        if !within_guard {
            warn!(operation = op, elapsed_ms = outcome.elapsed.as_millis() as u64, "Call exceeded the timeout guard");
            return false;
        }

        if outcome.is_transport_failure() {
            recorder.check(CheckCategory::Transport, &format!("{} reached the API", op), false);
            warn!(operation = op, "Call failed before reaching the API");
            return false;
        }

        let status_ok = outcome.status_in(expected);
        recorder.check(CheckCategory::Status, &format!("{} status {:?}", op, expected), status_ok);
        if !status_ok {
            debug!(operation = op, status = outcome.status, ?expected, "Unexpected status");
        }

        if status_ok {
            if let Some(ceiling) = outcome.sla.or_else(|| self.ceiling(outcome.operation())) {
                recorder.check(
                    CheckCategory::Sla,
                    &format!("{} <= {}ms", op, ceiling.as_millis()),
                    outcome.elapsed <= ceiling,
                );
            }
        }

        status_ok
    }

    /// Record a response-shape check
    pub fn check_shape(&self, recorder: &mut WorkerRecorder, name: &str, passed: bool) -> bool {
        recorder.check(CheckCategory::Shape, name, passed);
        if !passed {
            warn!(check = name, "Response shape check failed");
        }
        passed
    }

    /// Check each call of a concurrent batch, then the batch success rate
    pub fn check_batch(
        &self,
        recorder: &mut WorkerRecorder,
        name: &str,
        outcomes: &[CallOutcome],
        expected: &[u16],
        min_success_rate: f64,
    ) -> bool {
        let successes = outcomes
            .iter()
            .filter(|outcome| self.check_call(recorder, outcome, expected))
            .count();
        let passed = batch_passes(successes, outcomes.len(), min_success_rate);
        recorder.check(CheckCategory::Batch, name, passed);
        if !passed {
            warn!(check = name, successes, total = outcomes.len(), "Batch below its success rate");
        }
        passed
    }
}
