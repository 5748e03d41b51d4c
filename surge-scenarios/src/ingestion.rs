//! Reference-data and market-data ingestion

use crate::error::Result;
use crate::payloads;
use crate::position;
use crate::workflow::{Workflow, ACCEPTED, OK, UPDATED};
use surge_config::Operation;
use surge_core::reference::Security;
use surge_http::{CallOutcome, WorkflowRequest};

/// How a market-data update was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketDataMode {
    Single,
    /// One request carrying every price
    Batched,
    /// Many single requests in flight at once
    Concurrent,
}

/// `batch_draw` selects batching, `mode_draw` the batched flavour
pub fn market_data_mode(batched_probability: f64, batch_draw: f64, mode_draw: f64) -> MarketDataMode {
    if batch_draw >= batched_probability {
        MarketDataMode::Single
    } else if mode_draw < 0.5 {
        MarketDataMode::Batched
    } else {
        MarketDataMode::Concurrent
    }
}

/// Whether a security read-back carries the price just written
pub fn reflects_price(outcome: &CallOutcome, price: f64) -> bool {
    outcome
        .f64_field("lastPrice")
        .or_else(|| outcome.f64_field("price"))
        .is_some_and(|read| (read - price).abs() < 0.005)
}

async fn read_back(wf: &mut Workflow<'_>, security: &Security, price: f64) {
    let checked = wf
        .call(WorkflowRequest::get(Operation::SecurityQuery, payloads::security(&security.id)), OK)
        .await;
    if checked.ok {
        wf.shape("security read-back reflects update", reflects_price(&checked.outcome, price));
    }
}

async fn market_data(wf: &mut Workflow<'_>, security: &Security, price: f64) -> Result<()> {
    let batch = wf.ctx().mix.batch;
    let batch_draw = wf.draw();
    let mode_draw = wf.draw();

    match market_data_mode(batch.batched_probability, batch_draw, mode_draw) {
        MarketDataMode::Single => {
            let volume = wf.quantity();
            wf.call(
                WorkflowRequest::post(
                    Operation::MarketDataUpdate,
                    payloads::MARKET_DATA,
                    payloads::market_price(security, price, volume),
                ),
                ACCEPTED,
            )
            .await;
        }
        MarketDataMode::Batched => {
            let mut prices = Vec::with_capacity(batch.market_data_batch_size);
            for _ in 0..batch.market_data_batch_size {
                let item = wf.security()?;
                let item_price = wf.jitter_price(item.price, 0.02);
                let volume = wf.quantity();
                prices.push(payloads::market_price(item, item_price, volume));
            }
            wf.call(
                WorkflowRequest::post(
                    Operation::MarketDataBatch,
                    payloads::MARKET_DATA_BATCH,
                    payloads::market_price_batch(prices),
                ),
                ACCEPTED,
            )
            .await;
        }
        MarketDataMode::Concurrent => {
            let mut requests = Vec::with_capacity(batch.market_data_batch_size);
            for _ in 0..batch.market_data_batch_size {
                let item = wf.security()?;
                let item_price = wf.jitter_price(item.price, 0.02);
                let volume = wf.quantity();
                requests.push(WorkflowRequest::post(
                    Operation::MarketDataUpdate,
                    payloads::MARKET_DATA,
                    payloads::market_price(item, item_price, volume),
                ));
            }
            wf.batch("market data submissions", requests, ACCEPTED, batch.min_success_rate)
                .await;
        }
    }
    Ok(())
}

pub async fn run(wf: &mut Workflow<'_>) -> Result<()> {
    let security = wf.security()?;
    let counterparty = wf.counterparty()?;
    let price = wf.jitter_price(security.price, 0.02);

    let updated = wf
        .call(
            WorkflowRequest::put(
                Operation::SecurityUpdate,
                payloads::security(&security.id),
                payloads::security_update(security, price),
            ),
            UPDATED,
        )
        .await;
    if updated.ok {
        read_back(wf, security, price).await;
    }

    wf.call(
        WorkflowRequest::put(
            Operation::CounterpartyUpdate,
            payloads::counterparty(&counterparty.id),
            payloads::counterparty_update(counterparty),
        ),
        UPDATED,
    )
    .await;

    market_data(wf, security, price).await?;

    let book = wf.book()?;
    position::query(wf, book, security).await;
    Ok(())
}
