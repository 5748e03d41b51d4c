//! Business workflow choreographies for surge.
//!
//! Each workflow drives a fixed sequence of calls against the target and
//! reports only through metric samples and checks. API misbehaviour never
//! surfaces as an error; a [`ScenarioError`] means the harness itself could
//! not continue the iteration.

pub mod error;
pub mod health;
pub mod ingestion;
pub mod inventory;
pub mod locate;
pub mod mixed;
pub mod payloads;
pub mod position;
pub mod short_sell;
pub mod workflow;

pub use error::{Result, ScenarioError};
pub use locate::LocateResult;
pub use workflow::{Checked, Workflow};

use surge_config::ScenarioKind;
use surge_core::{TestContext, WorkerRecorder};

/// Drive one workflow to completion
pub async fn run_scenario(kind: ScenarioKind, wf: &mut Workflow<'_>) -> Result<()> {
    match kind {
        ScenarioKind::Locate => locate::run(wf).await,
        ScenarioKind::ShortSell => short_sell::run(wf).await,
        ScenarioKind::Position => position::run(wf).await,
        ScenarioKind::Inventory => inventory::run(wf).await,
        ScenarioKind::DataIngestion => ingestion::run(wf).await,
        ScenarioKind::Mixed => mixed::run(wf).await,
    }
}

/// One iteration: pick a scenario, run it, then pause for think time.
///
/// `worker_iteration` is the worker-local iteration number and paces health
/// sampling.
pub async fn run_iteration(
    ctx: &TestContext,
    recorder: &mut WorkerRecorder,
    rng: &mut fastrand::Rng,
    worker_iteration: u64,
) -> Result<ScenarioKind> {
    let kind = *ctx.dispatch.select(rng.f64());
    let mut wf = Workflow::new(ctx, recorder, rng, kind);

    if ctx.health_sample_every > 0 && worker_iteration % ctx.health_sample_every == 0 {
        health::sample(&mut wf).await;
    }

    let result = run_scenario(kind, &mut wf).await;
    wf.think().await;
    result.map(|_| kind)
}
