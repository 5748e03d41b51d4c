//! Shared, read-only state of one run

use crate::checks::CheckEngine;
use crate::degradation::DegradationTracker;
use crate::dispatch::ScenarioTable;
use crate::error::Result;
use crate::reference::ReferenceData;
use std::sync::Arc;
use surge_config::{ProfileConfig, ScenarioMix};
use surge_http::ApiClient;

/// Everything a workflow iteration reads. Built once by run setup and
/// shared behind `Arc`; only the session token inside `client` changes.
#[derive(Debug)]
pub struct TestContext {
    pub client: ApiClient,
    pub environment: String,
    pub reference: Arc<ReferenceData>,
    pub mix: ScenarioMix,
    pub dispatch: ScenarioTable,
    pub checks: CheckEngine,
    /// Present for profiles that track degradation
    pub degradation: Option<Arc<DegradationTracker>>,
    /// Iterations between health samples, per worker
    pub health_sample_every: u64,
}

impl TestContext {
    pub fn new(
        client: ApiClient,
        reference: Arc<ReferenceData>,
        profile: &ProfileConfig,
        degradation: Option<Arc<DegradationTracker>>,
    ) -> Result<Self> {
        let environment = client.session().environment().name.clone();
        let checks = CheckEngine::new(&profile.thresholds, client.executor().timeout_guard());
        let dispatch = ScenarioTable::from_weights(&profile.scenarios.weights)?;
        let health_sample_every = profile
            .degradation
            .as_ref()
            .map(|d| d.health_sample_every)
            .unwrap_or(0);

        Ok(Self {
            client,
            environment,
            reference,
            mix: profile.scenarios.clone(),
            dispatch,
            checks,
            degradation,
            health_sample_every,
        })
    }
}
