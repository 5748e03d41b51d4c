//! Position query, trade booking and recalculation

use crate::error::Result;
use crate::payloads;
use crate::workflow::{Workflow, ACCEPTED, CREATED, OK};
use surge_config::Operation;
use surge_core::reference::{Book, Security};
use surge_http::{CallOutcome, WorkflowRequest};

const QUANTITY_FIELDS: [&str; 3] = ["quantity", "netQuantity", "settledQuantity"];

pub fn position_quantity(outcome: &CallOutcome) -> Option<f64> {
    QUANTITY_FIELDS.iter().find_map(|f| outcome.f64_field(f))
}

pub(crate) async fn query(wf: &mut Workflow<'_>, book: &Book, security: &Security) -> Option<f64> {
    let request = WorkflowRequest::get(Operation::PositionQuery, payloads::POSITIONS)
        .query("bookId", &book.id)
        .query("securityId", &security.id);
    let checked = wf.call(request, OK).await;
    if !checked.ok {
        return None;
    }
    let quantity = position_quantity(&checked.outcome);
    wf.shape("position reports quantity", quantity.is_some());
    quantity
}

/// Whether the position moved by exactly the booked signed quantity
pub fn reflects_trade(before: f64, after: f64, signed_quantity: i64) -> bool {
    (after - before - signed_quantity as f64).abs() < 0.5
}

pub async fn run(wf: &mut Workflow<'_>) -> Result<()> {
    let (book, security) = wf.position_subject()?;
    let client = wf.counterparty()?;

    let before = query(wf, book, security).await;

    let magnitude = wf.quantity() as i64;
    let signed = if wf.chance(0.5) { magnitude } else { -magnitude };
    let price = wf.jitter_price(security.price, 0.005);
    let trade = payloads::trade(book, security, client, signed, price);
    let booked = wf
        .call(WorkflowRequest::post(Operation::TradeSubmit, payloads::TRADES, trade), CREATED)
        .await;

    if booked.ok {
        wf.settle().await;
        let after = query(wf, book, security).await;
        if let (Some(before), Some(after)) = (before, after) {
            wf.shape("position reflects booked trade", reflects_trade(before, after, signed));
        }
    }

    wf.call(
        WorkflowRequest::post(
            Operation::PositionCalculate,
            payloads::POSITION_CALCULATE,
            payloads::position_calculation(book, security),
        ),
        ACCEPTED,
    )
    .await;

    let ladder = WorkflowRequest::get(Operation::SettlementLadder, payloads::SETTLEMENT_LADDER)
        .query("bookId", &book.id)
        .query("securityId", &security.id);
    wf.call(ladder, OK).await;

    Ok(())
}
