//! SLA, timeout-guard and batch checks against real round trips

mod support;

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use surge_config::{Operation, ScenarioKind};
use surge_core::{CheckCategory, WorkerRecorder};
use surge_http::WorkflowRequest;
use surge_runner::initialize_run;
use surge_scenarios::{short_sell, Workflow};
use support::{init_quiet_logging, MockApi};

fn validate_order() -> WorkflowRequest {
    WorkflowRequest::post(
        Operation::ValidateOrder,
        "/api/v1/orders/validate",
        json!({"securityId": "SEC-EQ-001", "quantity": 100}),
    )
    .sub_tag(short_sell::SUB_TAG)
}

#[tokio::test]
async fn test_slow_short_sell_fails_sla_but_passes_status() -> Result<()> {
    init_quiet_logging();
    let api = MockApi::start().await;
    let run = initialize_run(&api.config(), "smoke").await?;
    let mut recorder = WorkerRecorder::new(Arc::clone(&run.registry));
    let mut rng = fastrand::Rng::with_seed(1);

    {
        let mut wf = Workflow::new(&run.context, &mut recorder, &mut rng, ScenarioKind::ShortSell);

        api.state.set_validate_delay(Duration::from_millis(100));
        let fast = wf.call(validate_order(), &[200]).await;
        assert!(fast.ok);

        api.state.set_validate_delay(Duration::from_millis(180));
        let slow = wf.call(validate_order(), &[200]).await;
        assert!(slow.ok, "a slow 200 still passes its status check");
        assert!(slow.outcome.elapsed >= Duration::from_millis(180));
    }
    recorder.flush();

    let checks = run.registry.checks();
    let sla = checks.category(CheckCategory::Sla);
    assert_eq!(sla.passed, 1);
    assert_eq!(sla.failed, 1);
    assert_eq!(checks.category(CheckCategory::Status).failed, 0);
    assert_eq!(run.registry.sample_count(Operation::ValidateOrder), 2);
    Ok(())
}

#[tokio::test]
async fn test_timeout_guard_records_transport_sample() -> Result<()> {
    init_quiet_logging();
    let api = MockApi::start().await;
    let mut config = api.config();
    config.http.timeout = Duration::from_millis(250);
    config.http.connect_timeout = Duration::from_millis(100);

    let run = initialize_run(&config, "smoke").await?;
    let mut recorder = WorkerRecorder::new(Arc::clone(&run.registry));
    let mut rng = fastrand::Rng::with_seed(1);

    api.state.set_validate_delay(Duration::from_millis(600));
    let checked = {
        let mut wf = Workflow::new(&run.context, &mut recorder, &mut rng, ScenarioKind::ShortSell);
        wf.call(validate_order(), &[200]).await
    };
    recorder.flush();

    assert!(!checked.ok);
    assert!(checked.outcome.timed_out());
    assert_eq!(checked.outcome.status, 0);

    let checks = run.registry.checks();
    assert_eq!(checks.category(CheckCategory::TimeoutGuard).failed, 1);
    assert_eq!(checks.category(CheckCategory::Sla).total(), 0);
    // Failed calls still feed the error rate
    assert_eq!(run.registry.business_calls(), (1, 1));
    Ok(())
}

#[tokio::test]
async fn test_limit_batch_after_approval() -> Result<()> {
    init_quiet_logging();
    let api = MockApi::start().await;
    let run = initialize_run(&api.config(), "smoke").await?;
    let mut recorder = WorkerRecorder::new(Arc::clone(&run.registry));
    let mut rng = fastrand::Rng::with_seed(3);

    {
        let mut wf = Workflow::new(&run.context, &mut recorder, &mut rng, ScenarioKind::ShortSell);
        short_sell::run(&mut wf).await?;
    }
    recorder.flush();

    assert_eq!(api.state.request_count("GET /api/v1/limits/client/"), 1);
    assert_eq!(api.state.request_count("GET /api/v1/limits/aggregation-unit/"), 1);

    let checks = run.registry.checks();
    assert_eq!(checks.category(CheckCategory::Batch).passed, 1);
    assert_eq!(checks.category(CheckCategory::Shape).failed, 0);
    Ok(())
}
