//! In-process mock of the back-office business API

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use surge_config::{LoadProfile, ProfileConfig, ScenarioMix, SurgeConfig, ThinkTime};
use surge_core::ReferenceData;
use tokio::net::TcpListener;

pub const INITIAL_AVAILABILITY: i64 = 1_000_000;

/// Mutable state behind the mock endpoints
#[derive(Default)]
pub struct MockState {
    token: Mutex<String>,
    pub logins: AtomicU64,
    pub logouts: AtomicU64,
    pub unauthorized: AtomicU64,
    /// Answer 404 on the login path so clients fall back to the token path
    pub login_path_missing: AtomicBool,
    /// Answer 503 on login, as during an identity-provider outage
    pub login_unavailable: AtomicBool,
    pub login_attempts: AtomicU64,
    /// Book trades without moving the position
    pub ignore_trades: AtomicBool,
    /// Approve locates without reserving availability
    pub freeze_availability: AtomicBool,
    /// Accept security updates without storing them
    pub stale_reference: AtomicBool,
    validate_delay_ms: AtomicU64,
    availability: Mutex<HashMap<String, i64>>,
    locates: Mutex<HashMap<String, MockLocate>>,
    positions: Mutex<HashMap<(String, String), i64>>,
    securities: Mutex<HashMap<String, Value>>,
    pub requests: Mutex<Vec<String>>,
    pub correlation_ids: Mutex<Vec<String>>,
}

impl MockState {
    /// Invalidate the issued token; the next authenticated call gets 401
    pub fn revoke_token(&self) {
        *self.token.lock().unwrap() = format!("revoked-{}", uuid::Uuid::new_v4());
    }

    pub fn set_validate_delay(&self, delay: Duration) {
        self.validate_delay_ms.store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn availability(&self, security_id: &str) -> i64 {
        *self
            .availability
            .lock()
            .unwrap()
            .get(security_id)
            .unwrap_or(&INITIAL_AVAILABILITY)
    }

    pub fn position(&self, book_id: &str, security_id: &str) -> i64 {
        *self
            .positions
            .lock()
            .unwrap()
            .get(&(book_id.to_string(), security_id.to_string()))
            .unwrap_or(&0)
    }

    /// Load the built-in corpus's seeded positions and locates
    fn seed(&self, reference: &ReferenceData) {
        let mut positions = self.positions.lock().unwrap();
        for p in &reference.positions {
            positions.insert((p.book_id.clone(), p.security_id.clone()), p.quantity);
        }
        let mut locates = self.locates.lock().unwrap();
        for l in &reference.locates {
            locates.insert(
                l.request_id.clone(),
                MockLocate {
                    security_id: l.security_id.clone(),
                    quantity: l.quantity as i64,
                    status: Some("APPROVED"),
                },
            );
        }
    }

    pub fn request_count(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }

    fn issue_token(&self) -> String {
        let token = format!("tok-{}", uuid::Uuid::new_v4());
        *self.token.lock().unwrap() = token.clone();
        self.logins.fetch_add(1, Ordering::Relaxed);
        token
    }
}

struct MockLocate {
    security_id: String,
    quantity: i64,
    /// Decided on the first status read
    status: Option<&'static str>,
}

type Shared = Arc<MockState>;

pub struct MockApi {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl MockApi {
    pub async fn start() -> MockApi {
        let state: Shared = Arc::new(MockState::default());
        state.seed(&ReferenceData::builtin());

        let business = Router::new()
            .route("/api/v1/auth/logout", post(logout))
            .route("/api/v1/inventory/{kind}", get(inventory).post(accepted))
            .route("/api/v1/locates", post(submit_locate))
            .route("/api/v1/locates/{id}", get(locate_status))
            .route("/api/v1/orders/validate", post(validate_order))
            .route("/api/v1/limits/client/{id}", get(limit))
            .route("/api/v1/limits/aggregation-unit/{id}", get(limit))
            .route("/api/v1/positions", get(position))
            .route("/api/v1/positions/calculate", post(accepted))
            .route("/api/v1/positions/settlement-ladder", get(settlement_ladder))
            .route("/api/v1/trades", post(book_trade))
            .route("/api/v1/securities/{id}", get(security).put(update_security))
            .route("/api/v1/counterparties/{id}", put(updated))
            .route("/api/v1/market-data", post(accepted))
            .route("/api/v1/market-data/prices", post(accepted))
            .route("/api/v1/system/health", get(health))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

        let app = Router::new()
            .route("/api/v1/auth/login", post(login))
            .route("/api/v1/auth/token", post(token))
            .merge(business)
            .layer(middleware::from_fn_with_state(state.clone(), record_request))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockApi { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Configuration aimed at this mock with pauses shortened for tests
    pub fn config(&self) -> SurgeConfig {
        let mut config = SurgeConfig::default();
        config.target.environment = "local".to_string();
        config.target.selected_mut().base_url = self.base_url();
        config.report.console = false;

        let profile = config.profiles.get_mut("smoke").unwrap();
        profile.scenarios = fast_mix();
        config
    }
}

pub fn fast_mix() -> ScenarioMix {
    ScenarioMix {
        think_time: ThinkTime::none(),
        settle_delay: Duration::ZERO,
        locate_poll_delay: Duration::from_millis(10),
        ..ScenarioMix::default()
    }
}

/// Short constant-rate profile against the mock
pub fn quick_profile(rate: f64, duration: Duration) -> ProfileConfig {
    ProfileConfig {
        description: "integration".to_string(),
        load: LoadProfile::constant(rate, duration, 4, 32),
        thresholds: Default::default(),
        scenarios: fast_mix(),
        degradation: None,
    }
}

pub fn init_quiet_logging() {
    let _ = surge_logging::init_simple_tracing("warn");
}

async fn record_request(State(state): State<Shared>, request: Request, next: Next) -> Response {
    state
        .requests
        .lock()
        .unwrap()
        .push(format!("{} {}", request.method(), request.uri().path()));
    if let Some(id) = request.headers().get("x-correlation-id").and_then(|v| v.to_str().ok()) {
        state.correlation_ids.lock().unwrap().push(id.to_string());
    }
    next.run(request).await
}

async fn require_token(State(state): State<Shared>, headers: HeaderMap, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", state.token.lock().unwrap());
    let presented = headers.get("authorization").and_then(|v| v.to_str().ok());
    if presented != Some(expected.as_str()) {
        state.unauthorized.fetch_add(1, Ordering::Relaxed);
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "invalid token"}))).into_response();
    }
    next.run(request).await
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(credentials): Json<Credentials>) -> Response {
    state.login_attempts.fetch_add(1, Ordering::Relaxed);
    if state.login_unavailable.load(Ordering::Relaxed) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"message": "identity provider down"}))).into_response();
    }
    if state.login_path_missing.load(Ordering::Relaxed) {
        return StatusCode::NOT_FOUND.into_response();
    }
    token(State(state), Json(credentials)).await
}

async fn token(State(state): State<Shared>, Json(credentials): Json<Credentials>) -> Response {
    if credentials.username.is_empty() || credentials.password != "loadtest" {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "bad credentials"}))).into_response();
    }
    let token = state.issue_token();
    Json(json!({"accessToken": token, "expiresIn": 3600})).into_response()
}

async fn logout(State(state): State<Shared>) -> StatusCode {
    state.logouts.fetch_add(1, Ordering::Relaxed);
    StatusCode::OK
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecurityQuery {
    security_id: Option<String>,
}

async fn inventory(
    State(state): State<Shared>,
    Path(kind): Path<String>,
    Query(query): Query<SecurityQuery>,
) -> Json<Value> {
    let security_id = query.security_id.unwrap_or_default();
    Json(json!({
        "securityId": security_id,
        "calculationType": kind,
        "availableQuantity": state.availability(&security_id),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocateRequest {
    security_id: String,
    quantity: i64,
}

async fn submit_locate(State(state): State<Shared>, Json(request): Json<LocateRequest>) -> (StatusCode, Json<Value>) {
    let request_id = format!("LOC-{}", uuid::Uuid::new_v4());
    state.locates.lock().unwrap().insert(
        request_id.clone(),
        MockLocate {
            security_id: request.security_id,
            quantity: request.quantity,
            status: None,
        },
    );
    (
        StatusCode::CREATED,
        Json(json!({"requestId": request_id, "status": "PENDING"})),
    )
}

/// Locates are decided on first status read, reserving the quantity when approved
async fn locate_status(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut locates = state.locates.lock().unwrap();
    let Some(locate) = locates.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let status = match locate.status {
        Some(status) => status,
        None => {
            let mut availability = state.availability.lock().unwrap();
            let available = availability
                .entry(locate.security_id.clone())
                .or_insert(INITIAL_AVAILABILITY);
            let status = if locate.quantity <= *available {
                if !state.freeze_availability.load(Ordering::Relaxed) {
                    *available -= locate.quantity;
                }
                "APPROVED"
            } else {
                "REJECTED"
            };
            locate.status = Some(status);
            status
        }
    };
    Json(json!({"data": {"requestId": id, "status": status, "approvedQuantity": locate.quantity}})).into_response()
}

async fn validate_order(State(state): State<Shared>) -> Json<Value> {
    let delay = state.validate_delay_ms.load(Ordering::Relaxed);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    Json(json!({"approved": true, "status": "APPROVED"}))
}

async fn limit(Path(id): Path<String>) -> Json<Value> {
    Json(json!({"id": id, "limit": 50_000_000, "utilization": 0.42}))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionQuery {
    book_id: Option<String>,
    security_id: Option<String>,
}

async fn position(State(state): State<Shared>, Query(query): Query<PositionQuery>) -> Json<Value> {
    let key = (query.book_id.unwrap_or_default(), query.security_id.unwrap_or_default());
    let quantity = *state.positions.lock().unwrap().get(&key).unwrap_or(&0);
    Json(json!({"bookId": key.0, "securityId": key.1, "quantity": quantity}))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Trade {
    book_id: String,
    security_id: String,
    side: String,
    quantity: i64,
}

async fn book_trade(State(state): State<Shared>, Json(trade): Json<Trade>) -> (StatusCode, Json<Value>) {
    if state.ignore_trades.load(Ordering::Relaxed) {
        return (StatusCode::CREATED, Json(json!({"status": "BOOKED"})));
    }
    let signed = if trade.side == "SELL" { -trade.quantity } else { trade.quantity };
    *state
        .positions
        .lock()
        .unwrap()
        .entry((trade.book_id, trade.security_id))
        .or_insert(0) += signed;
    (StatusCode::CREATED, Json(json!({"status": "BOOKED"})))
}

async fn security(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    match state.securities.lock().unwrap().get(&id) {
        Some(stored) => Json(json!({"data": stored})).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn update_security(State(state): State<Shared>, Path(id): Path<String>, Json(body): Json<Value>) -> StatusCode {
    let mut securities = state.securities.lock().unwrap();
    if state.stale_reference.load(Ordering::Relaxed) {
        // Update dropped; reads keep returning the old record
        securities
            .entry(id.clone())
            .or_insert_with(|| json!({"securityId": id, "lastPrice": 0.0}));
    } else {
        securities.insert(id, body);
    }
    StatusCode::OK
}

async fn settlement_ladder() -> Json<Value> {
    Json(json!({"ladder": []}))
}

async fn accepted() -> StatusCode {
    StatusCode::ACCEPTED
}

async fn updated() -> StatusCode {
    StatusCode::OK
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "UP",
        "cpuUtilization": 35.0,
        "memoryUtilization": 52.5,
        "connectionPoolUtilization": 18.0,
    }))
}
