//! Threshold evaluator and run verdict

use crate::metrics::MetricsRegistry;
use serde::Serialize;
use surge_config::{Operation, ThresholdDivergence, ThresholdTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdStatus {
    Pass,
    Fail,
    /// Registered but never exercised; counts as a failure
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub operation: Operation,
    pub percentile: f64,
    pub max_ms: u64,
    pub observed_ms: Option<f64>,
    pub samples: u64,
    pub status: ThresholdStatus,
}

impl ThresholdResult {
    pub fn passed(&self) -> bool {
        self.status == ThresholdStatus::Pass
    }
}

/// Compliance verdict over the whole run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub compliant: bool,
    pub thresholds: Vec<ThresholdResult>,
    pub business_calls: u64,
    pub business_errors: u64,
    pub error_rate: f64,
    pub max_error_rate: f64,
    pub error_rate_ok: bool,
    /// Entries of the profile table that differ from the published SLA
    pub divergences: Vec<ThresholdDivergence>,
}

impl Verdict {
    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.thresholds.iter().filter(|r| !r.passed())
    }
}

/// Compares full-run percentiles to a profile's threshold table
#[derive(Debug, Clone)]
pub struct ThresholdEvaluator {
    table: ThresholdTable,
}

impl ThresholdEvaluator {
    pub fn new(table: ThresholdTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ThresholdTable {
        &self.table
    }

    pub fn evaluate(&self, metrics: &MetricsRegistry) -> Verdict {
        let thresholds: Vec<ThresholdResult> = self
            .table
            .entries
            .iter()
            .map(|spec| {
                let samples = metrics.sample_count(spec.operation);
                let observed_ms = metrics
                    .percentile(spec.operation, spec.percentile)
                    .map(|d| d.as_secs_f64() * 1000.0);
                let status = match observed_ms {
                    None => ThresholdStatus::NoData,
                    Some(ms) if ms <= spec.max_ms as f64 => ThresholdStatus::Pass,
                    Some(_) => ThresholdStatus::Fail,
                };
                ThresholdResult {
                    operation: spec.operation,
                    percentile: spec.percentile,
                    max_ms: spec.max_ms,
                    observed_ms,
                    samples,
                    status,
                }
            })
            .collect();

        let (business_calls, business_errors) = metrics.business_calls();
        let error_rate = metrics.business_error_rate();
        let error_rate_ok = error_rate <= self.table.max_error_rate;
        let compliant = error_rate_ok && thresholds.iter().all(ThresholdResult::passed);

        Verdict {
            compliant,
            thresholds,
            business_calls,
            business_errors,
            error_rate,
            max_error_rate: self.table.max_error_rate,
            error_rate_ok,
            divergences: self.table.divergences(),
        }
    }
}
