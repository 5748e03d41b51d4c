//! Run setup, execution and teardown
//!
//! [`initialize_run`] resolves the environment, authenticates and loads
//! reference data into a [`RunContext`]; [`execute`] drives the scheduler;
//! [`finalize_run`] evaluates thresholds, analyses degradation and logs out.

use crate::error::{Result, RunError};
use crate::host;
use crate::iterations::ScenarioIterations;
use crate::report::RunReport;
use crate::scheduler::{ScheduleSummary, Scheduler};
use crate::shutdown::Shutdown;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use surge_config::{ProfileConfig, SurgeConfig, ThresholdDivergence};
use surge_core::{DegradationTracker, MetricsRegistry, ReferenceData, TestContext, ThresholdEvaluator};
use surge_http::{ApiClient, HttpExecutor, Session};
use tracing::{info, warn};

/// State threaded from setup to teardown
#[derive(Debug)]
pub struct RunContext {
    pub profile_name: String,
    pub profile: ProfileConfig,
    pub context: Arc<TestContext>,
    pub registry: Arc<MetricsRegistry>,
    pub divergences: Vec<ThresholdDivergence>,
    pub started_at: DateTime<Utc>,
    seed: Option<u64>,
}

impl RunContext {
    /// Seed every worker's random source for reproducible scenario draws
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

pub async fn initialize_run(config: &SurgeConfig, profile_name: &str) -> Result<RunContext> {
    let profile = config.profile(profile_name)?.clone();
    let environment = config.target.resolve()?;
    info!(
        profile = profile_name,
        environment = %environment.name,
        base_url = %environment.base_url,
        "Initializing run"
    );

    let executor = Arc::new(HttpExecutor::new(environment.base_url.clone(), &config.http).map_err(RunError::Http)?);
    let session = Arc::new(
        Session::login(Arc::clone(&executor), environment)
            .await
            .map_err(RunError::Auth)?,
    );

    let reference = ReferenceData::load_or_builtin(config.reference_data.path.as_deref())?;
    info!(
        securities = reference.securities.len(),
        counterparties = reference.counterparties.len(),
        books = reference.books.len(),
        "Reference data loaded"
    );

    let divergences = profile.thresholds.divergences();
    for divergence in &divergences {
        warn!(
            operation = %divergence.operation,
            documented_ms = divergence.documented_ms,
            configured_ms = ?divergence.configured_ms,
            "Profile threshold differs from the published SLA"
        );
    }

    let tracker = profile
        .degradation
        .as_ref()
        .map(|d| Arc::new(DegradationTracker::new(d.bucket_width)));
    let registry = Arc::new(MetricsRegistry::with_start(Instant::now(), tracker.clone())?);
    let context = TestContext::new(
        ApiClient::new(executor, session),
        Arc::new(reference),
        &profile,
        tracker,
    )?;

    Ok(RunContext {
        profile_name: profile_name.to_string(),
        profile,
        context: Arc::new(context),
        registry,
        divergences,
        started_at: Utc::now(),
        seed: None,
    })
}

/// Run the load profile to completion or until `shutdown` fires
pub async fn execute(run: &RunContext, shutdown: &Shutdown) -> ScheduleSummary {
    let load = &run.profile.load;
    info!(
        profile = %run.profile_name,
        executor = %load.executor_kind(),
        peak_rate = load.peak_rate(),
        duration_secs = load.total_duration().as_secs_f64(),
        "Starting load"
    );

    let host_sampler = run.context.degradation.as_ref().map(|tracker| {
        let every = tracker.width() / 6;
        host::spawn_sampler(Arc::clone(tracker), run.registry.started_at(), every)
    });

    let mut iterations = ScenarioIterations::new(Arc::clone(&run.context), Arc::clone(&run.registry));
    if let Some(seed) = run.seed {
        iterations = iterations.with_seed(seed);
    }
    let summary = Scheduler::new(load, Arc::clone(&run.registry))
        .run(Arc::new(iterations), shutdown)
        .await;

    if let Some(handle) = host_sampler {
        handle.abort();
    }
    summary
}

/// Evaluate, log out and assemble the report
pub async fn finalize_run(run: RunContext, schedule: ScheduleSummary) -> RunReport {
    let registry = &run.registry;
    let verdict = ThresholdEvaluator::new(run.profile.thresholds.clone()).evaluate(registry);

    let degradation = match (run.context.degradation.as_ref(), run.profile.degradation.as_ref()) {
        (Some(tracker), Some(config)) => {
            let report = tracker.analyze(config);
            if report.drift_detected {
                warn!(buckets = report.buckets.len(), "Performance drift detected");
            }
            Some(report)
        }
        _ => None,
    };

    let session = run.context.client.session();
    let logout = session.logout().await;
    let environment = session.environment();

    let report = RunReport {
        profile: run.profile_name.clone(),
        description: run.profile.description.clone(),
        environment: environment.name.clone(),
        base_url: environment.base_url.to_string(),
        executor: run.profile.load.executor_kind().to_string(),
        started_at: run.started_at,
        finished_at: Utc::now(),
        schedule,
        iterations: registry.iterations(),
        operations: registry.summaries(),
        checks: registry.checks(),
        verdict,
        degradation,
        token_refreshes: session.refresh_count(),
        logout_status: logout.status,
    };

    info!(
        compliant = report.verdict.compliant,
        error_rate = report.verdict.error_rate,
        failed_thresholds = report.verdict.failed_thresholds().count(),
        "Run finished"
    );
    report
}

/// Setup, load and teardown in one call
pub async fn run_profile(config: &SurgeConfig, profile_name: &str, shutdown: &Shutdown) -> Result<RunReport> {
    let run = initialize_run(config, profile_name).await?;
    let schedule = execute(&run, shutdown).await;
    Ok(finalize_run(run, schedule).await)
}
