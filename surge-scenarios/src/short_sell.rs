//! Short-sell validation with client and aggregation-unit limit lookups

use crate::error::Result;
use crate::payloads;
use crate::workflow::{Workflow, OK};
use surge_config::Operation;
use surge_http::{CallOutcome, WorkflowRequest};

pub const SUB_TAG: &str = "shortSellValidation";

/// Approval decision carried by a validation response
pub fn decision(outcome: &CallOutcome) -> Option<bool> {
    if let Some(approved) = outcome.bool_field("approved") {
        return Some(approved);
    }
    match outcome.str_field("status")?.to_uppercase().as_str() {
        "APPROVED" | "ACCEPTED" | "PASSED" => Some(true),
        "REJECTED" | "DENIED" | "FAILED" => Some(false),
        _ => None,
    }
}

pub async fn run(wf: &mut Workflow<'_>) -> Result<()> {
    let security = wf.security()?;
    let client = wf.counterparty()?;
    let book = wf.book()?;
    let quantity = wf.quantity();
    let price = wf.jitter_price(security.price, 0.01);

    let order = payloads::short_sell_order(security, client, book, quantity, price);
    let checked = wf
        .call(
            WorkflowRequest::post(Operation::ValidateOrder, payloads::VALIDATE_ORDER, order).sub_tag(SUB_TAG),
            OK,
        )
        .await;
    if !checked.ok {
        return Ok(());
    }

    let approved = decision(&checked.outcome);
    wf.shape("short sell returns a decision", approved.is_some());
    if approved != Some(true) {
        return Ok(());
    }

    let unit = wf.aggregation_unit(book)?;
    let min_rate = wf.ctx().mix.batch.min_success_rate;
    wf.batch(
        "limit lookups",
        vec![
            WorkflowRequest::get(Operation::ClientLimit, payloads::client_limit(&client.id)),
            WorkflowRequest::get(
                Operation::AggregationUnitLimit,
                payloads::aggregation_unit_limit(&unit.id),
            ),
        ],
        OK,
        min_rate,
    )
    .await;

    Ok(())
}
