//! Request and outcome types shared by the executor and the workflows

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;
use surge_config::{Operation, ScenarioKind};
use uuid::Uuid;

/// HTTP methods the business API uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
}

impl HttpMethod {
    /// Get the string representation of the HTTP method
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        }
    }
}

/// Labels attached to a call. `operation` keys latency samples and thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequestTags {
    pub operation: Operation,
    pub scenario: Option<ScenarioKind>,
    /// Finer label inside an operation, e.g. `shortSellValidation`
    pub sub_tag: Option<&'static str>,
}

impl RequestTags {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            scenario: None,
            sub_tag: None,
        }
    }
}

/// One HTTP call a workflow wants made
#[derive(Debug, Clone)]
pub struct WorkflowRequest {
    pub method: HttpMethod,
    /// Path relative to the environment base URL, starting with '/'
    pub path: String,
    pub query: Vec<(String, String)>,
    pub tags: RequestTags,
    pub body: Option<JsonValue>,
    /// Latency ceiling for this call only; otherwise the profile table decides
    pub sla: Option<Duration>,
}

impl WorkflowRequest {
    pub fn new(method: HttpMethod, operation: Operation, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            tags: RequestTags::new(operation),
            body: None,
            sla: None,
        }
    }

    pub fn get(operation: Operation, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, operation, path)
    }

    pub fn post(operation: Operation, path: impl Into<String>, body: JsonValue) -> Self {
        Self::new(HttpMethod::Post, operation, path).json(body)
    }

    pub fn put(operation: Operation, path: impl Into<String>, body: JsonValue) -> Self {
        Self::new(HttpMethod::Put, operation, path).json(body)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    pub fn scenario(mut self, scenario: ScenarioKind) -> Self {
        self.tags.scenario = Some(scenario);
        self
    }

    pub fn sub_tag(mut self, sub_tag: &'static str) -> Self {
        self.tags.sub_tag = Some(sub_tag);
        self
    }

    pub fn with_sla(mut self, ceiling: Duration) -> Self {
        self.sla = Some(ceiling);
        self
    }
}

/// Why a call produced no HTTP status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailure {
    /// The client-side timeout guard fired
    Timeout,
    /// Connection refused, reset, TLS, DNS, unreadable body, bad URL
    Transport(String),
}

/// What happened to one call. Status is 0 when no response arrived.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub tags: RequestTags,
    pub status: u16,
    pub elapsed: Duration,
    pub body: Option<JsonValue>,
    pub failure: Option<CallFailure>,
    pub correlation_id: Uuid,
    pub sla: Option<Duration>,
}

impl CallOutcome {
    /// Outcome with a status and no body. Used by tests and by the check engine's callers
    /// to describe calls that were never sent through the executor.
    pub fn synthetic(operation: Operation, status: u16, elapsed: Duration) -> Self {
        Self {
            tags: RequestTags::new(operation),
            status,
            elapsed,
            body: None,
            failure: None,
            correlation_id: Uuid::new_v4(),
            sla: None,
        }
    }

    pub(crate) fn failed(
        request: &WorkflowRequest,
        correlation_id: Uuid,
        elapsed: Duration,
        failure: CallFailure,
    ) -> Self {
        Self {
            tags: request.tags,
            status: 0,
            elapsed,
            body: None,
            failure: Some(failure),
            correlation_id,
            sla: request.sla,
        }
    }

    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    pub fn operation(&self) -> Operation {
        self.tags.operation
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn status_in(&self, expected: &[u16]) -> bool {
        expected.contains(&self.status)
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.failure, Some(CallFailure::Timeout))
    }

    pub fn is_transport_failure(&self) -> bool {
        matches!(self.failure, Some(CallFailure::Transport(_)))
    }

    /// Field from the JSON body, looked up at the top level and then under `data`
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        let body = self.body.as_ref()?;
        body.get(name)
            .or_else(|| body.get("data").and_then(|data| data.get(name)))
            .filter(|v| !v.is_null())
    }

    /// Non-empty string field
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Numeric field, accepting numbers encoded as strings
    pub fn f64_field(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(|v| match v {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.field(name).and_then(|v| v.as_bool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_method_to_reqwest() {
        assert_eq!(reqwest::Method::from(HttpMethod::Get), reqwest::Method::GET);
        assert_eq!(reqwest::Method::from(HttpMethod::Post), reqwest::Method::POST);
        assert_eq!(reqwest::Method::from(HttpMethod::Put), reqwest::Method::PUT);
        assert_eq!(HttpMethod::Put.to_string(), "PUT");
    }

    #[test]
    fn test_request_builder_tags() {
        let request = WorkflowRequest::post(
            Operation::ValidateOrder,
            "/api/v1/orders/validate",
            json!({"side": "SHORT"}),
        )
        .scenario(ScenarioKind::ShortSell)
        .sub_tag("shortSellValidation")
        .query("dryRun", false);

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.tags.operation, Operation::ValidateOrder);
        assert_eq!(request.tags.scenario, Some(ScenarioKind::ShortSell));
        assert_eq!(request.tags.sub_tag, Some("shortSellValidation"));
        assert_eq!(request.query, vec![("dryRun".to_string(), "false".to_string())]);
        assert!(request.body.is_some());
    }

    #[test]
    fn test_outcome_field_lookup() {
        let outcome = CallOutcome::synthetic(Operation::LocateSubmit, 201, Duration::from_millis(40))
            .with_body(json!({"data": {"requestId": "LOC-1", "approvedQuantity": "5000"}, "status": ""}));

        assert!(outcome.is_success());
        assert_eq!(outcome.str_field("requestId"), Some("LOC-1"));
        assert_eq!(outcome.f64_field("approvedQuantity"), Some(5000.0));
        // Empty strings do not count as present
        assert_eq!(outcome.str_field("status"), None);
        assert_eq!(outcome.str_field("missing"), None);
    }

    #[test]
    fn test_failure_classification() {
        let request = WorkflowRequest::get(Operation::PositionQuery, "/api/v1/positions");
        let timeout = CallOutcome::failed(&request, Uuid::new_v4(), Duration::from_secs(5), CallFailure::Timeout);
        assert!(timeout.timed_out());
        assert!(!timeout.is_transport_failure());
        assert_eq!(timeout.status, 0);
        assert!(!timeout.is_success());

        let refused = CallOutcome::failed(
            &request,
            Uuid::new_v4(),
            Duration::from_millis(3),
            CallFailure::Transport("connection refused".to_string()),
        );
        assert!(refused.is_transport_failure());
    }
}
