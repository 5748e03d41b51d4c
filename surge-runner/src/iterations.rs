//! Scenario iterations run by the scheduler's workers

use crate::scheduler::IterationRunner;
use async_trait::async_trait;
use std::sync::Arc;
use surge_core::{MetricsRegistry, TestContext, WorkerRecorder};
use tracing::{trace, warn};

/// Per-worker state: a private metrics partial and random source
#[derive(Debug)]
pub struct ScenarioWorker {
    id: usize,
    recorder: WorkerRecorder,
    rng: fastrand::Rng,
    iterations: u64,
}

impl ScenarioWorker {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }
}

/// Runs one dispatched workflow per iteration against the shared context
#[derive(Debug)]
pub struct ScenarioIterations {
    ctx: Arc<TestContext>,
    registry: Arc<MetricsRegistry>,
    seed: Option<u64>,
}

impl ScenarioIterations {
    pub fn new(ctx: Arc<TestContext>, registry: Arc<MetricsRegistry>) -> Self {
        Self {
            ctx,
            registry,
            seed: None,
        }
    }

    /// Derive each worker's random source from `seed` for reproducible draws
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[async_trait]
impl IterationRunner for ScenarioIterations {
    type Worker = ScenarioWorker;

    fn create_worker(&self, id: usize) -> ScenarioWorker {
        let rng = match self.seed {
            Some(seed) => fastrand::Rng::with_seed(seed.wrapping_add(id as u64)),
            None => fastrand::Rng::new(),
        };
        ScenarioWorker {
            id,
            recorder: WorkerRecorder::new(Arc::clone(&self.registry)),
            rng,
            iterations: 0,
        }
    }

    async fn run_iteration(&self, worker: &mut ScenarioWorker) {
        let iteration = worker.iterations;
        worker.iterations += 1;

        match surge_scenarios::run_iteration(&self.ctx, &mut worker.recorder, &mut worker.rng, iteration).await {
            Ok(scenario) => {
                trace!(worker = worker.id, iteration, %scenario, "Iteration complete");
                self.registry.iteration_completed();
            }
            Err(e) => {
                warn!(worker = worker.id, iteration, error = %e, "Iteration aborted");
                self.registry.iteration_failed();
            }
        }
    }
}
