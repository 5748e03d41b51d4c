//! Locate choreography against the mock business API

mod support;

use anyhow::Result;
use std::sync::Arc;
use surge_config::ScenarioKind;
use surge_core::{CheckCategory, WorkerRecorder};
use surge_runner::initialize_run;
use surge_scenarios::{locate, Workflow};
use support::{init_quiet_logging, MockApi, INITIAL_AVAILABILITY};

#[tokio::test]
async fn test_locate_reduces_for_loan_availability() -> Result<()> {
    init_quiet_logging();
    let api = MockApi::start().await;
    let run = initialize_run(&api.config(), "smoke").await?;

    let reference = Arc::clone(&run.context.reference);
    let security = reference.find_security("SEC-EQ-001").expect("seed security");
    let client = reference
        .counterparties
        .iter()
        .find(|c| c.id == "CP001")
        .expect("seed counterparty");

    let mut recorder = WorkerRecorder::new(Arc::clone(&run.registry));
    let mut rng = fastrand::Rng::with_seed(42);
    let result = {
        let mut wf = Workflow::new(&run.context, &mut recorder, &mut rng, ScenarioKind::Locate);
        locate::run_with(&mut wf, security, client, 5000).await?
    };
    recorder.flush();

    let request_id = result.request_id.as_deref().unwrap_or_default();
    assert!(request_id.starts_with("LOC-"), "unexpected request id {:?}", request_id);
    assert!(result.approved());
    assert_eq!(result.available_before, Some(INITIAL_AVAILABILITY as f64));
    assert_eq!(result.available_after, Some((INITIAL_AVAILABILITY - 5000) as f64));
    assert_eq!(api.state.availability("SEC-EQ-001"), INITIAL_AVAILABILITY - 5000);

    let checks = run.registry.checks();
    assert_eq!(checks.category(CheckCategory::Status).failed, 0);
    assert_eq!(checks.category(CheckCategory::Shape).failed, 0);
    assert!(checks.category(CheckCategory::Shape).passed >= 3);

    // Every business call carried a correlation id
    let correlation_ids = api.state.correlation_ids.lock().unwrap().clone();
    assert!(correlation_ids.len() >= 4);
    assert!(correlation_ids.iter().all(|id| uuid::Uuid::parse_str(id).is_ok()));
    Ok(())
}

#[tokio::test]
async fn test_rejected_locate_skips_recheck() -> Result<()> {
    init_quiet_logging();
    let api = MockApi::start().await;
    let run = initialize_run(&api.config(), "smoke").await?;

    let reference = Arc::clone(&run.context.reference);
    let security = reference.find_security("SEC-EQ-002").expect("seed security");
    let client = &reference.counterparties[0];

    let mut recorder = WorkerRecorder::new(Arc::clone(&run.registry));
    let mut rng = fastrand::Rng::with_seed(7);
    let result = {
        let mut wf = Workflow::new(&run.context, &mut recorder, &mut rng, ScenarioKind::Locate);
        locate::run_with(&mut wf, security, client, (INITIAL_AVAILABILITY + 1) as u64).await?
    };

    assert_eq!(result.status.as_deref(), Some("REJECTED"));
    assert!(result.available_after.is_none());
    assert_eq!(api.state.request_count("GET /api/v1/inventory/for-loan"), 1);
    Ok(())
}
