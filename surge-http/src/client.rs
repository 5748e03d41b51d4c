//! Request executor

use crate::config::build_client;
use crate::errors::HttpError;
use crate::session::Session;
use crate::types::{CallFailure, CallOutcome, WorkflowRequest};
use futures::future::join_all;
use reqwest::header::HeaderName;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::{Duration, Instant};
use surge_config::HttpConfig;
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

/// Sends tagged requests against one environment and measures them.
///
/// Every call gets a fresh correlation id. Latency covers the request and the
/// full response body. Nothing is retried: a timeout or transport error comes
/// back as a [`CallOutcome`] with status 0.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    base_url: Url,
    correlation_header: HeaderName,
    timeout: Duration,
}

impl HttpExecutor {
    pub fn new(base_url: Url, config: &HttpConfig) -> Result<Self, HttpError> {
        let correlation_header = HeaderName::from_bytes(config.correlation_header.as_bytes())
            .map_err(|_| HttpError::InvalidHeader(config.correlation_header.clone()))?;

        Ok(Self {
            client: build_client(config)?,
            base_url,
            correlation_header,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Client-side timeout guard applied to every call
    pub fn timeout_guard(&self) -> Duration {
        self.timeout
    }

    /// Resolve an API path against the base URL, keeping any path prefix the base carries
    pub fn url_for(&self, path: &str) -> Result<Url, HttpError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| HttpError::InvalidUrl(format!("{}: {}", joined, e)))
    }

    /// Send one request. Never fails; see [`CallOutcome::failure`].
    pub async fn send(&self, request: &WorkflowRequest, bearer: Option<&str>) -> CallOutcome {
        let correlation_id = Uuid::new_v4();

        let url = match self.url_for(&request.path) {
            Ok(url) => url,
            Err(e) => {
                return CallOutcome::failed(
                    request,
                    correlation_id,
                    Duration::ZERO,
                    CallFailure::Transport(e.to_string()),
                )
            }
        };

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .header(self.correlation_header.clone(), correlation_id.to_string());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        trace!(
            operation = %request.tags.operation,
            method = %request.method,
            path = %request.path,
            correlation_id = %correlation_id,
            "Sending request"
        );

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let elapsed = started.elapsed();
                debug!(
                    operation = %request.tags.operation,
                    correlation_id = %correlation_id,
                    error = %e,
                    "Request failed before a response arrived"
                );
                return CallOutcome::failed(request, correlation_id, elapsed, classify(&e));
            }
        };

        let status = response.status().as_u16();
        let bytes = response.bytes().await;
        let elapsed = started.elapsed();

        let body = match bytes {
            Ok(bytes) if bytes.is_empty() => None,
            Ok(bytes) => Some(
                serde_json::from_slice::<JsonValue>(&bytes)
                    .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(&bytes).into_owned())),
            ),
            Err(e) => {
                return CallOutcome::failed(request, correlation_id, elapsed, classify(&e));
            }
        };

        debug!(
            operation = %request.tags.operation,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            correlation_id = %correlation_id,
            "Request completed"
        );

        CallOutcome {
            tags: request.tags,
            status,
            elapsed,
            body,
            failure: None,
            correlation_id,
            sla: request.sla,
        }
    }

    /// Send independent requests concurrently. Outcomes keep the input order.
    pub async fn send_batch(&self, requests: &[WorkflowRequest], bearer: Option<&str>) -> Vec<CallOutcome> {
        join_all(requests.iter().map(|request| self.send(request, bearer))).await
    }
}

fn classify(error: &reqwest::Error) -> CallFailure {
    if error.is_timeout() {
        CallFailure::Timeout
    } else {
        CallFailure::Transport(error.to_string())
    }
}

/// Authenticated executor handed to the workflows
#[derive(Debug, Clone)]
pub struct ApiClient {
    executor: Arc<HttpExecutor>,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(executor: Arc<HttpExecutor>, session: Arc<Session>) -> Self {
        Self { executor, session }
    }

    pub fn executor(&self) -> &Arc<HttpExecutor> {
        &self.executor
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Send one request with the current bearer token.
    ///
    /// A 401 marks the token stale so the next call re-authenticates; the
    /// rejected call itself is reported as-is.
    pub async fn call(&self, request: &WorkflowRequest) -> CallOutcome {
        let token = self.session.bearer().await;
        let outcome = self.executor.send(request, Some(&token)).await;
        if outcome.status == 401 {
            self.session.invalidate();
        }
        outcome
    }

    /// Concurrent batch sharing one token
    pub async fn batch(&self, requests: &[WorkflowRequest]) -> Vec<CallOutcome> {
        let token = self.session.bearer().await;
        let outcomes = self.executor.send_batch(requests, Some(&token)).await;
        if outcomes.iter().any(|o| o.status == 401) {
            self.session.invalidate();
        }
        outcomes
    }
}
