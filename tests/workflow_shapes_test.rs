//! Response-shape checks of the position, inventory and ingestion workflows
//! against a mock that can misbehave on purpose

mod support;

use anyhow::Result;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use surge_config::ScenarioKind;
use surge_core::{CheckCategory, CheckTally, PassFail, WorkerRecorder};
use surge_runner::{initialize_run, RunContext};
use surge_scenarios::{ingestion, inventory, locate, position, Workflow};
use support::{init_quiet_logging, MockApi};

fn shape(checks: &CheckTally, name: &str) -> PassFail {
    checks
        .by_name
        .get(&CheckCategory::Shape)
        .and_then(|names| names.get(name))
        .copied()
        .unwrap_or_default()
}

async fn setup() -> Result<(MockApi, RunContext)> {
    init_quiet_logging();
    let api = MockApi::start().await;
    let run = initialize_run(&api.config(), "smoke").await?;
    Ok((api, run))
}

/// Run one workflow iteration and return the recorded checks
async fn checks_after(run: &RunContext, kind: ScenarioKind, seed: u64) -> Result<CheckTally> {
    let mut recorder = WorkerRecorder::new(Arc::clone(&run.registry));
    let mut rng = fastrand::Rng::with_seed(seed);
    {
        let mut wf = Workflow::new(&run.context, &mut recorder, &mut rng, kind);
        match kind {
            ScenarioKind::Position => position::run(&mut wf).await?,
            ScenarioKind::Inventory => inventory::run(&mut wf).await?,
            ScenarioKind::DataIngestion => ingestion::run(&mut wf).await?,
            other => panic!("no shape test for {:?}", other),
        }
    }
    recorder.flush();
    Ok(run.registry.checks())
}

#[tokio::test]
async fn test_position_moves_by_signed_trade() -> Result<()> {
    let (_api, run) = setup().await?;
    let checks = checks_after(&run, ScenarioKind::Position, 11).await?;

    assert_eq!(shape(&checks, "position reflects booked trade"), PassFail { passed: 1, failed: 0 });
    assert_eq!(shape(&checks, "position reports quantity").failed, 0);
    assert_eq!(checks.category(CheckCategory::Status).failed, 0);
    Ok(())
}

#[tokio::test]
async fn test_position_ignoring_trade_fails_shape() -> Result<()> {
    let (api, run) = setup().await?;
    api.state.ignore_trades.store(true, Ordering::Relaxed);

    let checks = checks_after(&run, ScenarioKind::Position, 11).await?;

    assert_eq!(shape(&checks, "position reflects booked trade"), PassFail { passed: 0, failed: 1 });
    // The API answered every call as expected; only the content is wrong
    assert_eq!(checks.category(CheckCategory::Status).failed, 0);
    Ok(())
}

#[tokio::test]
async fn test_position_uses_seeded_pair() -> Result<()> {
    let (api, run) = setup().await?;
    let mut recorder = WorkerRecorder::new(Arc::clone(&run.registry));
    let mut rng = fastrand::Rng::with_seed(3);
    let mut wf = Workflow::new(&run.context, &mut recorder, &mut rng, ScenarioKind::Position);

    let (book, security) = wf.position_subject()?;
    let seeded = run
        .context
        .reference
        .positions
        .iter()
        .find(|p| p.book_id == book.id && p.security_id == security.id)
        .expect("subject is a seeded position");
    assert_eq!(api.state.position(&book.id, &security.id), seeded.quantity);
    Ok(())
}

#[tokio::test]
async fn test_inventory_locate_reduces_fan_out_baseline() -> Result<()> {
    let (api, run) = setup().await?;
    let checks = checks_after(&run, ScenarioKind::Inventory, 5).await?;

    assert_eq!(
        shape(&checks, "approved locate reduces availability"),
        PassFail { passed: 1, failed: 0 }
    );
    // Baseline comes from the fan-out, so for-loan is read once there and once after approval
    assert_eq!(api.state.request_count("GET /api/v1/inventory/for-loan"), 2);
    assert_eq!(api.state.request_count("GET /api/v1/locates/"), 1);
    Ok(())
}

#[tokio::test]
async fn test_inventory_unchanged_after_locate_fails_shape() -> Result<()> {
    let (api, run) = setup().await?;
    api.state.freeze_availability.store(true, Ordering::Relaxed);

    let checks = checks_after(&run, ScenarioKind::Inventory, 5).await?;

    assert_eq!(
        shape(&checks, "approved locate reduces availability"),
        PassFail { passed: 0, failed: 1 }
    );
    assert_eq!(checks.category(CheckCategory::Status).failed, 0);
    Ok(())
}

#[tokio::test]
async fn test_ingestion_read_back_matches_update() -> Result<()> {
    let (api, run) = setup().await?;
    let checks = checks_after(&run, ScenarioKind::DataIngestion, 9).await?;

    assert_eq!(
        shape(&checks, "security read-back reflects update"),
        PassFail { passed: 1, failed: 0 }
    );
    assert_eq!(api.state.request_count("GET /api/v1/securities/"), 1);
    Ok(())
}

#[tokio::test]
async fn test_ingestion_stale_read_back_fails_shape() -> Result<()> {
    let (api, run) = setup().await?;
    api.state.stale_reference.store(true, Ordering::Relaxed);

    let checks = checks_after(&run, ScenarioKind::DataIngestion, 9).await?;

    assert_eq!(
        shape(&checks, "security read-back reflects update"),
        PassFail { passed: 0, failed: 1 }
    );
    assert_eq!(checks.category(CheckCategory::Status).failed, 0);
    Ok(())
}

#[tokio::test]
async fn test_seeded_locate_status_is_served() -> Result<()> {
    let (_api, run) = setup().await?;
    let seeded = run.context.reference.locates[0].request_id.clone();

    let mut recorder = WorkerRecorder::new(Arc::clone(&run.registry));
    let mut rng = fastrand::Rng::with_seed(1);
    let status = {
        let mut wf = Workflow::new(&run.context, &mut recorder, &mut rng, ScenarioKind::Locate);
        locate::poll_status(&mut wf, &seeded).await
    };
    recorder.flush();

    assert_eq!(status.as_deref(), Some("APPROVED"));
    assert_eq!(shape(&run.registry.checks(), "locate status is known").passed, 1);
    Ok(())
}
