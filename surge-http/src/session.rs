//! Session authenticator: credential exchange, token refresh, logout

use crate::client::HttpExecutor;
use crate::errors::HttpError;
use crate::types::{CallOutcome, WorkflowRequest};
use parking_lot::RwLock;
use serde_json::{json, Value as JsonValue};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use surge_config::{Operation, ResolvedEnvironment};
use tokio::sync::Mutex;
use tracing::{info, warn};

const TOKEN_FIELDS: [&str; 3] = ["token", "accessToken", "access_token"];
const EXPIRY_FIELDS: [&str; 2] = ["expiresIn", "expires_in"];

/// Pause after a failed refresh before the next login attempt
pub const REFRESH_BACKOFF: Duration = Duration::from_secs(2);

struct TokenState {
    token: String,
    issued_at: Instant,
    ttl: Duration,
    /// Set after the API rejected the token with 401
    stale: bool,
    /// No login attempt before this instant after a failed refresh
    retry_after: Option<Instant>,
}

impl TokenState {
    fn fresh(token: String, ttl: Duration) -> Self {
        Self {
            token,
            issued_at: Instant::now(),
            ttl,
            stale: false,
            retry_after: None,
        }
    }

    fn needs_refresh(&self) -> bool {
        self.stale || self.issued_at.elapsed() >= self.ttl
    }

    fn backing_off(&self) -> bool {
        self.retry_after.is_some_and(|at| Instant::now() < at)
    }

    /// Needs a refresh and no recent attempt failed
    fn should_refresh(&self) -> bool {
        self.needs_refresh() && !self.backing_off()
    }
}

/// Bearer token shared by every worker of a run.
///
/// Reads are lock-free in practice (a read lock held only to clone the
/// token). Refresh is serialized so a burst of expired readers produces one
/// login call, and a failed refresh holds off further logins for
/// [`REFRESH_BACKOFF`].
pub struct Session {
    executor: Arc<HttpExecutor>,
    environment: ResolvedEnvironment,
    state: RwLock<TokenState>,
    refresh_lock: Mutex<()>,
    /// Completed refresh attempts, successful or not
    attempts: AtomicU64,
    refreshes: AtomicU64,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("environment", &self.environment.name)
            .field("token", &"<redacted>")
            .field("refreshes", &self.refresh_count())
            .finish()
    }
}

impl Session {
    /// Exchange the environment's credentials for a token
    pub async fn login(executor: Arc<HttpExecutor>, environment: ResolvedEnvironment) -> Result<Self, HttpError> {
        let (token, ttl) = authenticate(&executor, &environment).await?;
        info!(
            environment = %environment.name,
            user = %environment.credentials.username,
            ttl_secs = ttl.as_secs(),
            "Authenticated"
        );

        Ok(Self {
            executor,
            environment,
            state: RwLock::new(TokenState::fresh(token, ttl)),
            refresh_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
        })
    }

    pub fn environment(&self) -> &ResolvedEnvironment {
        &self.environment
    }

    /// Current token, re-authenticating first if it expired or was rejected.
    ///
    /// A failed refresh is logged and the previous token returned; the calls
    /// made with it will fail their status checks. Callers that queued
    /// behind an attempt reuse its result instead of logging in again.
    pub async fn bearer(&self) -> String {
        let observed = {
            let state = self.state.read();
            if !state.should_refresh() {
                return state.token.clone();
            }
            self.attempts.load(Ordering::Acquire)
        };

        let _guard = self.refresh_lock.lock().await;
        if self.attempts.load(Ordering::Acquire) != observed || !self.state.read().should_refresh() {
            return self.state.read().token.clone();
        }

        match authenticate(&self.executor, &self.environment).await {
            Ok((token, ttl)) => {
                *self.state.write() = TokenState::fresh(token, ttl);
                let count = self.refreshes.fetch_add(1, Ordering::Relaxed) + 1;
                info!(environment = %self.environment.name, refreshes = count, "Token refreshed");
            }
            Err(e) => {
                self.state.write().retry_after = Some(Instant::now() + REFRESH_BACKOFF);
                warn!(
                    environment = %self.environment.name,
                    error = %e,
                    retry_in_secs = REFRESH_BACKOFF.as_secs(),
                    "Token refresh failed"
                );
            }
        }
        self.attempts.fetch_add(1, Ordering::Release);

        self.state.read().token.clone()
    }

    /// Force re-authentication before the next call
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        if !state.stale {
            warn!(environment = %self.environment.name, "Token rejected with 401, will re-authenticate");
            state.stale = true;
        }
    }

    pub fn needs_refresh(&self) -> bool {
        self.state.read().needs_refresh()
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// End the session. The outcome is returned for the teardown report.
    pub async fn logout(&self) -> CallOutcome {
        let token = self.state.read().token.clone();
        let request = WorkflowRequest::post(
            Operation::AuthLogout,
            self.environment.auth.logout_path.clone(),
            json!({}),
        );
        let outcome = self.executor.send(&request, Some(&token)).await;
        if outcome.is_success() {
            info!(environment = %self.environment.name, "Logged out");
        } else {
            warn!(environment = %self.environment.name, status = outcome.status, "Logout was not acknowledged");
        }
        outcome
    }
}

async fn authenticate(
    executor: &HttpExecutor,
    environment: &ResolvedEnvironment,
) -> Result<(String, Duration), HttpError> {
    let body = json!({
        "username": environment.credentials.username,
        "password": environment.credentials.password,
    });

    let auth = &environment.auth;
    let mut outcome = executor
        .send(&WorkflowRequest::post(Operation::AuthLogin, auth.login_path.clone(), body.clone()), None)
        .await;

    if outcome.status == 404 {
        if let Some(ref token_path) = auth.token_path {
            outcome = executor
                .send(&WorkflowRequest::post(Operation::AuthLogin, token_path.clone(), body), None)
                .await;
        }
    }

    if let Some(ref failure) = outcome.failure {
        return Err(HttpError::AuthError {
            status: 0,
            message: format!("{:?}", failure),
        });
    }
    if !outcome.is_success() {
        return Err(HttpError::AuthError {
            status: outcome.status,
            message: outcome
                .str_field("message")
                .unwrap_or("login rejected")
                .to_string(),
        });
    }

    let token = extract_token(&outcome).ok_or_else(|| HttpError::AuthError {
        status: outcome.status,
        message: "login response carried no token".to_string(),
    })?;

    let ttl = EXPIRY_FIELDS
        .iter()
        .find_map(|f| outcome.f64_field(f))
        .filter(|secs| *secs > 0.0)
        .map(|secs| Duration::from_secs_f64(secs).min(auth.token_ttl))
        .unwrap_or(auth.token_ttl);

    Ok((token, ttl))
}

fn extract_token(outcome: &CallOutcome) -> Option<String> {
    TOKEN_FIELDS
        .iter()
        .find_map(|f| outcome.str_field(f))
        .map(str::to_string)
        .or_else(|| match outcome.body {
            // Some gateways answer with the bare token string
            Some(JsonValue::String(ref s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
}
