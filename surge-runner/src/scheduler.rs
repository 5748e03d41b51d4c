//! Open-model iteration scheduler
//!
//! Iteration starts follow the load profile's rate curve regardless of how
//! long iterations take. A start that finds every worker busy allocates a
//! new one up to `max_workers`; beyond that it is dropped and counted.

use crate::shutdown::{Shutdown, StopReason};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use surge_config::{LoadProfile, RateShape};
use surge_core::MetricsRegistry;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Resolution of the start loop
const TICK: Duration = Duration::from_millis(5);

/// Minimum spacing of dropped-iteration warnings
const DROP_WARNING_INTERVAL: Duration = Duration::from_secs(5);

/// In-flight cap applied after an interrupt when the profile sets none
const INTERRUPT_GRACE: Duration = Duration::from_secs(10);

/// One linear leg of the rate curve, in seconds and starts per second
#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    start: f64,
    end: f64,
    from: f64,
    to: f64,
}

impl Segment {
    fn slope(&self) -> f64 {
        let len = self.end - self.start;
        if len <= 0.0 {
            0.0
        } else {
            (self.to - self.from) / len
        }
    }

    fn rate_at(&self, t: f64) -> f64 {
        self.from + self.slope() * (t - self.start)
    }

    /// Starts between the segment's beginning and `until`
    fn area(&self, until: f64) -> f64 {
        let dt = until - self.start;
        dt * (self.from + self.rate_at(until)) / 2.0
    }
}

/// Iteration start rate as a piecewise-linear function of elapsed time
#[derive(Debug, Clone, PartialEq)]
pub struct RateCurve {
    segments: Vec<Segment>,
}

impl RateCurve {
    pub fn from_profile(profile: &LoadProfile) -> Self {
        let unit = profile.time_unit.as_secs_f64();
        let per_second = |rate: f64| if unit > 0.0 { rate / unit } else { 0.0 };

        let segments = match &profile.shape {
            RateShape::ConstantRate { rate, duration } => vec![Segment {
                start: 0.0,
                end: duration.as_secs_f64(),
                from: per_second(*rate),
                to: per_second(*rate),
            }],
            RateShape::RampingRate { start_rate, stages } => {
                let mut segments = Vec::with_capacity(stages.len());
                let mut t = 0.0;
                let mut from = per_second(*start_rate);
                for stage in stages {
                    let end = t + stage.duration.as_secs_f64();
                    let to = per_second(stage.target);
                    segments.push(Segment { start: t, end, from, to });
                    t = end;
                    from = to;
                }
                segments
            }
        };

        Self { segments }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.segments.last().map(|s| s.end).unwrap_or(0.0))
    }

    /// Instantaneous starts per second
    pub fn rate_at(&self, elapsed: Duration) -> f64 {
        let t = elapsed.as_secs_f64();
        self.segments
            .iter()
            .find(|s| t < s.end)
            .map(|s| s.rate_at(t))
            .unwrap_or(0.0)
    }

    /// Integral of the rate from zero to `elapsed`
    pub fn cumulative(&self, elapsed: Duration) -> f64 {
        let t = elapsed.as_secs_f64();
        let mut total = 0.0;
        for segment in &self.segments {
            if t <= segment.start {
                break;
            }
            total += segment.area(t.min(segment.end));
        }
        total
    }

    /// Whole iterations due by `elapsed`
    pub fn due(&self, elapsed: Duration) -> u64 {
        // Absorb float error so an exact integral is not rounded down
        (self.cumulative(elapsed) + 1e-9).floor().max(0.0) as u64
    }

    pub fn total_iterations(&self) -> u64 {
        self.due(self.duration())
    }
}

/// Work executed on behalf of the scheduler.
///
/// Workers are created lazily and reused; each owns whatever per-stream
/// state the iterations need.
#[async_trait]
pub trait IterationRunner: Send + Sync + 'static {
    type Worker: Send + 'static;

    fn create_worker(&self, id: usize) -> Self::Worker;

    /// Run one iteration to completion. Outcomes are recorded by the runner.
    async fn run_iteration(&self, worker: &mut Self::Worker);
}

/// What the scheduler did during a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScheduleSummary {
    /// Iterations the rate curve asked for up to the stop point
    pub scheduled: u64,
    pub started: u64,
    pub dropped: u64,
    /// In flight when the graceful-stop window closed
    pub abandoned: u64,
    pub workers_allocated: usize,
    pub peak_busy_workers: usize,
    pub elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_early: Option<String>,
}

/// Drives iteration starts for one load profile
#[derive(Debug)]
pub struct Scheduler {
    curve: RateCurve,
    preallocated_workers: usize,
    max_workers: usize,
    graceful_stop: Option<Duration>,
    registry: Arc<MetricsRegistry>,
}

struct Pool<W> {
    idle: Vec<W>,
    allocated: usize,
    in_flight: JoinSet<W>,
}

impl<W: Send + 'static> Pool<W> {
    fn retire(&mut self, joined: Result<W, JoinError>, registry: &MetricsRegistry) {
        match joined {
            Ok(worker) => self.idle.push(worker),
            Err(e) => {
                self.allocated = self.allocated.saturating_sub(1);
                if e.is_panic() {
                    error!(error = %e, "Iteration panicked, worker discarded");
                    registry.iteration_failed();
                }
            }
        }
    }
}

impl Scheduler {
    pub fn new(profile: &LoadProfile, registry: Arc<MetricsRegistry>) -> Self {
        let max_workers = profile.max_workers.max(1);
        Self {
            curve: RateCurve::from_profile(profile),
            preallocated_workers: profile.preallocated_workers.min(max_workers),
            max_workers,
            graceful_stop: profile.graceful_stop,
            registry,
        }
    }

    pub fn curve(&self) -> &RateCurve {
        &self.curve
    }

    pub async fn run<R: IterationRunner>(&self, runner: Arc<R>, shutdown: &Shutdown) -> ScheduleSummary {
        let duration = self.curve.duration();
        let total_due = self.curve.total_iterations();
        info!(
            duration_secs = duration.as_secs_f64(),
            scheduled = total_due,
            preallocated = self.preallocated_workers,
            max_workers = self.max_workers,
            "Starting iteration scheduler"
        );

        let mut pool = Pool {
            idle: (0..self.preallocated_workers).map(|id| runner.create_worker(id)).collect(),
            allocated: self.preallocated_workers,
            in_flight: JoinSet::new(),
        };
        let mut summary = ScheduleSummary::default();
        let mut issued = 0u64;
        let mut pending_drop_warning = 0u64;
        let mut last_drop_warning: Option<Instant> = None;

        let start = Instant::now();
        let mut ticker = interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let stop = shutdown.wait();
        tokio::pin!(stop);

        let stop_reason = loop {
            tokio::select! {
                biased;
                reason = &mut stop => break Some(reason),
                Some(joined) = pool.in_flight.join_next(), if !pool.in_flight.is_empty() => {
                    pool.retire(joined, &self.registry);
                }
                _ = ticker.tick() => {
                    let elapsed = start.elapsed();
                    let due = if elapsed >= duration { total_due } else { self.curve.due(elapsed).min(total_due) };

                    while issued < due {
                        issued += 1;
                        let worker = match pool.idle.pop() {
                            Some(worker) => Some(worker),
                            None if pool.allocated < self.max_workers => {
                                pool.allocated += 1;
                                debug!(workers = pool.allocated, "Allocating worker");
                                Some(runner.create_worker(pool.allocated - 1))
                            }
                            None => None,
                        };

                        match worker {
                            Some(mut worker) => {
                                self.registry.iteration_started();
                                summary.started += 1;
                                let runner = Arc::clone(&runner);
                                pool.in_flight.spawn(async move {
                                    runner.run_iteration(&mut worker).await;
                                    worker
                                });
                                summary.peak_busy_workers = summary.peak_busy_workers.max(pool.in_flight.len());
                            }
                            None => {
                                self.registry.iteration_dropped();
                                summary.dropped += 1;
                                pending_drop_warning += 1;
                            }
                        }
                    }

                    if pending_drop_warning > 0
                        && last_drop_warning.is_none_or(|at| at.elapsed() >= DROP_WARNING_INTERVAL)
                    {
                        warn!(
                            dropped = pending_drop_warning,
                            total_dropped = summary.dropped,
                            max_workers = self.max_workers,
                            "All workers busy, dropping iterations"
                        );
                        pending_drop_warning = 0;
                        last_drop_warning = Some(Instant::now());
                    }

                    if elapsed >= duration {
                        break None;
                    }
                }
            }
        };

        summary.scheduled = issued;
        summary.workers_allocated = pool.allocated;

        let grace = match stop_reason {
            Some(reason) => {
                warn!(%reason, started = summary.started, "Run stopped before the profile completed");
                summary.stopped_early = Some(reason.to_string());
                Some(self.graceful_stop.map_or(INTERRUPT_GRACE, |g| g.min(INTERRUPT_GRACE)))
            }
            None => self.graceful_stop,
        };
        summary.abandoned = self.drain(&mut pool, grace).await;
        summary.elapsed_secs = start.elapsed().as_secs_f64();

        // Retiring workers flush their partial metrics
        drop(pool);

        info!(
            started = summary.started,
            dropped = summary.dropped,
            abandoned = summary.abandoned,
            workers = summary.workers_allocated,
            "Iteration scheduler finished"
        );
        summary
    }

    /// Wait for in-flight iterations, abandoning any still running after `grace`
    async fn drain<W: Send + 'static>(&self, pool: &mut Pool<W>, grace: Option<Duration>) -> u64 {
        if pool.in_flight.is_empty() {
            return 0;
        }
        info!(in_flight = pool.in_flight.len(), "Waiting for in-flight iterations");

        let registry = Arc::clone(&self.registry);
        let finished = {
            let wait_all = async {
                while let Some(joined) = pool.in_flight.join_next().await {
                    pool.retire(joined, &registry);
                }
            };
            match grace {
                Some(limit) => timeout(limit, wait_all).await.is_ok(),
                None => {
                    wait_all.await;
                    true
                }
            }
        };
        if finished {
            return 0;
        }

        let abandoned = pool.in_flight.len() as u64;
        warn!(abandoned, "Graceful stop elapsed, abandoning in-flight iterations");
        pool.in_flight.abort_all();
        while pool.in_flight.join_next().await.is_some() {}
        self.registry.iterations_abandoned(abandoned);
        abandoned
    }
}
