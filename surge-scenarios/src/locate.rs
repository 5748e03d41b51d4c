//! Locate workflow: availability baseline, submission, status poll and
//! post-approval availability recheck. Occasionally polls a seeded locate.

use crate::error::Result;
use crate::payloads::{self, AVAILABLE_FIELDS, FOR_LOAN, LOCATE_TYPES};
use crate::workflow::{Workflow, CREATED, OK};
use surge_config::Operation;
use surge_core::reference::{Counterparty, Security};
use surge_http::{CallOutcome, WorkflowRequest};
use tracing::debug;

pub const APPROVED: &str = "APPROVED";

const LOCATE_STATUSES: [&str; 5] = ["PENDING", "APPROVED", "PARTIAL", "REJECTED", "EXPIRED"];

/// Probability of also polling a locate that existed before the run
const SEEDED_POLL_PROBABILITY: f64 = 0.25;

/// Result of one locate attempt, for callers that chain on it
#[derive(Debug, Clone, Default)]
pub struct LocateResult {
    pub request_id: Option<String>,
    pub status: Option<String>,
    pub available_before: Option<f64>,
    pub available_after: Option<f64>,
}

impl LocateResult {
    pub fn approved(&self) -> bool {
        self.status.as_deref() == Some(APPROVED)
    }
}

pub async fn run(wf: &mut Workflow<'_>) -> Result<()> {
    let security = wf.security()?;
    let client = wf.counterparty()?;
    let quantity = wf.quantity();
    run_with(wf, security, client, quantity).await?;

    if wf.chance(SEEDED_POLL_PROBABILITY) {
        if let Some(seeded) = wf.seeded_locate() {
            poll_status(wf, &seeded.request_id).await;
        }
    }
    Ok(())
}

pub(crate) fn available_quantity(outcome: &CallOutcome) -> Option<f64> {
    AVAILABLE_FIELDS.iter().find_map(|f| outcome.f64_field(f))
}

pub(crate) async fn query_for_loan(wf: &mut Workflow<'_>, security: &Security) -> Option<f64> {
    let request = WorkflowRequest::get(Operation::InventoryQuery, payloads::inventory(FOR_LOAN))
        .query("securityId", &security.id);
    let checked = wf.call(request, OK).await;
    if !checked.ok {
        return None;
    }
    let available = available_quantity(&checked.outcome);
    wf.shape("inventory reports availability", available.is_some());
    available
}

/// Submit a locate and return its request id when the response carried one
pub(crate) async fn submit(
    wf: &mut Workflow<'_>,
    security: &Security,
    client: &Counterparty,
    quantity: u64,
) -> Option<String> {
    let locate_type = LOCATE_TYPES[(wf.draw() * LOCATE_TYPES.len() as f64) as usize % LOCATE_TYPES.len()];
    let body = payloads::locate_request(security, client, quantity, locate_type);
    let checked = wf
        .call(WorkflowRequest::post(Operation::LocateSubmit, payloads::LOCATES, body), CREATED)
        .await;
    if !checked.ok {
        return None;
    }

    let request_id = checked
        .outcome
        .str_field("requestId")
        .or_else(|| checked.outcome.str_field("locateId"))
        .map(str::to_string);
    wf.shape("locate returns requestId", request_id.is_some());
    request_id
}

/// Poll a locate and return its upper-cased status
pub async fn poll_status(wf: &mut Workflow<'_>, request_id: &str) -> Option<String> {
    let checked = wf
        .call(
            WorkflowRequest::get(Operation::LocateStatus, payloads::locate_status(request_id)),
            OK,
        )
        .await;
    if !checked.ok {
        return None;
    }
    let status = checked.outcome.str_field("status").map(str::to_uppercase);
    wf.shape(
        "locate status is known",
        status.as_deref().is_some_and(|s| LOCATE_STATUSES.contains(&s)),
    );
    status
}

/// Run the full locate choreography for a fixed security, client and quantity
pub async fn run_with(
    wf: &mut Workflow<'_>,
    security: &Security,
    client: &Counterparty,
    quantity: u64,
) -> Result<LocateResult> {
    let available_before = query_for_loan(wf, security).await;
    Ok(run_from_baseline(wf, security, client, quantity, available_before).await)
}

/// Submit, poll and, once approved, confirm availability dropped below
/// `available_before`
pub(crate) async fn run_from_baseline(
    wf: &mut Workflow<'_>,
    security: &Security,
    client: &Counterparty,
    quantity: u64,
    available_before: Option<f64>,
) -> LocateResult {
    let mut result = LocateResult {
        available_before,
        ..LocateResult::default()
    };

    let Some(request_id) = submit(wf, security, client, quantity).await else {
        debug!(security = %security.id, "locate submission gave no request id, skipping status poll");
        return result;
    };
    result.request_id = Some(request_id.clone());

    wf.locate_poll_wait().await;
    result.status = poll_status(wf, &request_id).await;

    if result.approved() {
        result.available_after = query_for_loan(wf, security).await;
        if let (Some(before), Some(after)) = (result.available_before, result.available_after) {
            wf.shape("approved locate reduces availability", after < before);
        }
    }

    result
}
