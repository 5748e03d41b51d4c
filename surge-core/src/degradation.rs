//! Degradation tracker for endurance runs
//!
//! Samples land in the bucket `floor(elapsed / width)`. Buckets are created on
//! first use and hold atomic sums, so recording takes the index lock only in
//! read mode except once per bucket.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use surge_config::DegradationConfig;
use surge_http::CallOutcome;

/// Utilisations are stored as thousandths of a percentage point
const FIXED_POINT: f64 = 1000.0;

/// Target-side utilisation reported by `/system/health`, in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
    pub connection_pool: Option<f64>,
}

impl HealthSnapshot {
    /// Parse a health response; `None` when it carries no utilisation figure
    pub fn from_outcome(outcome: &CallOutcome) -> Option<Self> {
        let read = |names: &[&str]| names.iter().find_map(|n| outcome.f64_field(n));
        let snapshot = Self {
            cpu: read(&["cpuUtilization", "cpu"]),
            memory: read(&["memoryUtilization", "memory"]),
            connection_pool: read(&["connectionPoolUtilization", "connectionPool"]),
        };
        if snapshot.cpu.is_none() && snapshot.memory.is_none() && snapshot.connection_pool.is_none() {
            return None;
        }
        Some(snapshot)
    }
}

#[derive(Debug, Default)]
struct Gauge {
    samples: AtomicU64,
    sum: AtomicU64,
}

impl Gauge {
    fn add(&self, value: f64) {
        if !value.is_finite() || value < 0.0 {
            return;
        }
        self.sum.fetch_add((value * FIXED_POINT) as u64, Ordering::Relaxed);
        self.samples.fetch_add(1, Ordering::Relaxed);
    }

    fn mean(&self) -> Option<f64> {
        let samples = self.samples.load(Ordering::Relaxed);
        if samples == 0 {
            return None;
        }
        Some(self.sum.load(Ordering::Relaxed) as f64 / FIXED_POINT / samples as f64)
    }
}

#[derive(Debug, Default)]
struct Bucket {
    requests: AtomicU64,
    errors: AtomicU64,
    latency_micros: AtomicU64,
    cpu: Gauge,
    memory: Gauge,
    connection_pool: Gauge,
    host_cpu: Gauge,
    host_memory: Gauge,
}

/// Aggregate of one bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSummary {
    pub elapsed_minute: u64,
    pub throughput_count: u64,
    pub error_rate: f64,
    pub mean_latency_ms: f64,
    pub cpu_utilization: Option<f64>,
    pub memory_utilization: Option<f64>,
    pub connection_pool_utilization: Option<f64>,
    /// Load generator host, to tell a saturated harness from a saturated target
    pub harness_cpu: Option<f64>,
    pub harness_memory: Option<f64>,
}

/// Linear trend of one series across buckets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesTrend {
    pub series: &'static str,
    /// Least-squares slope per bucket
    pub slope: f64,
    /// Share of consecutive buckets where the value rose
    pub monotonic_fraction: f64,
    /// Slope above which the series is drifting; informational series have none
    pub limit: Option<f64>,
    pub drifting: bool,
}

/// Trend analysis at report time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradationReport {
    pub bucket_width_secs: u64,
    pub buckets: Vec<BucketSummary>,
    pub trends: Vec<SeriesTrend>,
    /// Fewer buckets than `min_buckets_for_trend` means trends were not judged
    pub judged: bool,
    pub drift_detected: bool,
}

#[derive(Debug)]
pub struct DegradationTracker {
    width: Duration,
    buckets: RwLock<BTreeMap<u64, Arc<Bucket>>>,
}

impl DegradationTracker {
    pub fn new(width: Duration) -> Self {
        Self {
            width: width.max(Duration::from_millis(1)),
            buckets: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn width(&self) -> Duration {
        self.width
    }

    /// Bucket index for a sample taken `elapsed` after run start
    pub fn bucket_index(&self, elapsed: Duration) -> u64 {
        (elapsed.as_nanos() / self.width.as_nanos()) as u64
    }

    fn bucket(&self, elapsed: Duration) -> Arc<Bucket> {
        let index = self.bucket_index(elapsed);
        if let Some(bucket) = self.buckets.read().get(&index) {
            return bucket.clone();
        }
        self.buckets.write().entry(index).or_default().clone()
    }

    pub fn record(&self, elapsed: Duration, latency: Duration, is_error: bool) {
        let bucket = self.bucket(elapsed);
        bucket.requests.fetch_add(1, Ordering::Relaxed);
        bucket
            .latency_micros
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
        if is_error {
            bucket.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_health(&self, elapsed: Duration, health: HealthSnapshot) {
        let bucket = self.bucket(elapsed);
        if let Some(cpu) = health.cpu {
            bucket.cpu.add(cpu);
        }
        if let Some(memory) = health.memory {
            bucket.memory.add(memory);
        }
        if let Some(pool) = health.connection_pool {
            bucket.connection_pool.add(pool);
        }
    }

    pub fn record_host(&self, elapsed: Duration, cpu: f64, memory: f64) {
        let bucket = self.bucket(elapsed);
        bucket.host_cpu.add(cpu);
        bucket.host_memory.add(memory);
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.read().len()
    }

    pub fn summaries(&self) -> Vec<BucketSummary> {
        self.buckets
            .read()
            .iter()
            .map(|(&index, bucket)| {
                let requests = bucket.requests.load(Ordering::Relaxed);
                let errors = bucket.errors.load(Ordering::Relaxed);
                let latency = bucket.latency_micros.load(Ordering::Relaxed);
                let (error_rate, mean_latency_ms) = if requests == 0 {
                    (0.0, 0.0)
                } else {
                    (
                        errors as f64 / requests as f64,
                        latency as f64 / requests as f64 / 1000.0,
                    )
                };
                BucketSummary {
                    elapsed_minute: index,
                    throughput_count: requests,
                    error_rate,
                    mean_latency_ms,
                    cpu_utilization: bucket.cpu.mean(),
                    memory_utilization: bucket.memory.mean(),
                    connection_pool_utilization: bucket.connection_pool.mean(),
                    harness_cpu: bucket.host_cpu.mean(),
                    harness_memory: bucket.host_memory.mean(),
                }
            })
            .collect()
    }

    /// Slopes and monotonicity per series, judged against `config` limits
    pub fn analyze(&self, config: &DegradationConfig) -> DegradationReport {
        let buckets = self.summaries();
        let judged = buckets.len() >= config.min_buckets_for_trend;

        let series: [(&'static str, Option<f64>, fn(&BucketSummary) -> Option<f64>); 7] = [
            ("mean_latency_ms", Some(config.max_latency_slope_ms), |b| {
                (b.throughput_count > 0).then_some(b.mean_latency_ms)
            }),
            ("error_rate", Some(config.max_error_rate_slope), |b| {
                (b.throughput_count > 0).then_some(b.error_rate)
            }),
            ("cpu_utilization", Some(config.max_cpu_slope_pct), |b| b.cpu_utilization),
            ("memory_utilization", Some(config.max_memory_slope_pct), |b| b.memory_utilization),
            ("connection_pool_utilization", None, |b| b.connection_pool_utilization),
            ("harness_cpu", None, |b| b.harness_cpu),
            ("harness_memory", None, |b| b.harness_memory),
        ];

        let trends: Vec<SeriesTrend> = series
            .iter()
            .filter_map(|(name, limit, extract)| {
                let points: Vec<(f64, f64)> = buckets
                    .iter()
                    .filter_map(|b| extract(b).map(|v| (b.elapsed_minute as f64, v)))
                    .collect();
                let slope = least_squares_slope(&points)?;
                let values: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
                Some(SeriesTrend {
                    series: *name,
                    slope,
                    monotonic_fraction: monotonic_fraction(&values),
                    limit: *limit,
                    drifting: judged && limit.is_some_and(|l| slope > l),
                })
            })
            .collect();

        let drift_detected = trends.iter().any(|t| t.drifting);
        DegradationReport {
            bucket_width_secs: self.width.as_secs(),
            buckets,
            trends,
            judged,
            drift_detected,
        }
    }
}

/// Slope of the least-squares line through `points`; `None` below two distinct x values
pub fn least_squares_slope(points: &[(f64, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (covariance, variance) = points.iter().fold((0.0, 0.0), |(cov, var), (x, y)| {
        let dx = x - mean_x;
        (cov + dx * (y - mean_y), var + dx * dx)
    });
    if variance == 0.0 {
        return None;
    }
    Some(covariance / variance)
}

/// Fraction of consecutive pairs where the value strictly increased
pub fn monotonic_fraction(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let rising = values.windows(2).filter(|w| w[1] > w[0]).count();
    rising as f64 / (values.len() - 1) as f64
}
