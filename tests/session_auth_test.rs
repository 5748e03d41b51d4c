//! Session authentication, 401 handling and teardown

mod support;

use anyhow::Result;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use surge_config::Operation;
use surge_http::{ApiClient, HttpExecutor, Session, WorkflowRequest, REFRESH_BACKOFF};
use support::{init_quiet_logging, MockApi};

async fn client_for(api: &MockApi) -> Result<ApiClient> {
    let config = api.config();
    let environment = config.target.resolve()?;
    let executor = Arc::new(HttpExecutor::new(environment.base_url.clone(), &config.http)?);
    let session = Arc::new(Session::login(Arc::clone(&executor), environment).await?);
    Ok(ApiClient::new(executor, session))
}

fn health() -> WorkflowRequest {
    WorkflowRequest::get(Operation::SystemHealth, "/api/v1/system/health")
}

#[tokio::test]
async fn test_rejected_token_triggers_single_reauthentication() -> Result<()> {
    init_quiet_logging();
    let api = MockApi::start().await;
    let client = client_for(&api).await?;
    assert_eq!(api.state.logins.load(Ordering::Relaxed), 1);

    assert_eq!(client.call(&health()).await.status, 200);

    api.state.revoke_token();
    // The rejected call is reported as-is, never replayed
    let rejected = client.call(&health()).await;
    assert_eq!(rejected.status, 401);
    assert!(client.session().needs_refresh());

    let outcomes = futures_calls(&client, 8).await;
    assert!(outcomes.iter().all(|status| *status == 200));
    assert_eq!(api.state.logins.load(Ordering::Relaxed), 2);
    assert_eq!(client.session().refresh_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_refresh_is_not_repeated_by_waiting_callers() -> Result<()> {
    init_quiet_logging();
    let api = MockApi::start().await;
    let client = client_for(&api).await?;
    assert_eq!(api.state.login_attempts.load(Ordering::Relaxed), 1);

    api.state.login_unavailable.store(true, Ordering::Relaxed);
    api.state.revoke_token();
    assert_eq!(client.call(&health()).await.status, 401);

    let statuses = futures_calls(&client, 10).await;
    assert!(statuses.iter().all(|status| *status == 401));
    assert_eq!(api.state.login_attempts.load(Ordering::Relaxed), 2);
    assert_eq!(client.session().refresh_count(), 0);

    // Still inside the backoff window: no new attempt
    assert_eq!(client.call(&health()).await.status, 401);
    assert_eq!(api.state.login_attempts.load(Ordering::Relaxed), 2);

    api.state.login_unavailable.store(false, Ordering::Relaxed);
    tokio::time::sleep(REFRESH_BACKOFF + Duration::from_millis(100)).await;
    assert_eq!(client.call(&health()).await.status, 200);
    assert_eq!(api.state.login_attempts.load(Ordering::Relaxed), 3);
    assert_eq!(client.session().refresh_count(), 1);
    Ok(())
}

async fn futures_calls(client: &ApiClient, n: usize) -> Vec<u16> {
    let mut handles = Vec::with_capacity(n);
    for _ in 0..n {
        let client = client.clone();
        handles.push(tokio::spawn(async move { client.call(&health()).await.status }));
    }
    let mut statuses = Vec::with_capacity(n);
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }
    statuses
}

#[tokio::test]
async fn test_token_path_fallback() -> Result<()> {
    init_quiet_logging();
    let api = MockApi::start().await;
    api.state.login_path_missing.store(true, Ordering::Relaxed);

    let client = client_for(&api).await?;
    assert_eq!(client.call(&health()).await.status, 200);
    assert_eq!(api.state.request_count("POST /api/v1/auth/login"), 1);
    assert_eq!(api.state.request_count("POST /api/v1/auth/token"), 1);
    Ok(())
}

#[tokio::test]
async fn test_bad_credentials_fail_login() {
    init_quiet_logging();
    let api = MockApi::start().await;
    let mut config = api.config();
    config.target.selected_mut().credentials.password = "wrong".to_string();

    let err = surge_runner::initialize_run(&config, "smoke").await.unwrap_err();
    assert!(matches!(err, surge_runner::RunError::Auth(_)), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_logout_on_teardown() -> Result<()> {
    init_quiet_logging();
    let api = MockApi::start().await;
    let client = client_for(&api).await?;

    let outcome = client.session().logout().await;
    assert_eq!(outcome.status, 200);
    assert_eq!(api.state.logouts.load(Ordering::Relaxed), 1);
    Ok(())
}
