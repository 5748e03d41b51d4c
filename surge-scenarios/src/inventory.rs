//! Inventory fan-out across calculation types, optional recalculation and
//! a locate's effect on for-loan availability.

use crate::error::Result;
use crate::locate;
use crate::payloads::{self, FOR_LOAN};
use crate::workflow::{Workflow, ACCEPTED, OK};
use surge_config::Operation;
use surge_http::{CallOutcome, WorkflowRequest};

/// Probability of forcing a recalculation of one inventory type
const RECALCULATE_PROBABILITY: f64 = 0.2;

/// For-loan availability from a fan-out, when that type was queried and answered
pub fn for_loan_in_batch(types: &[String], outcomes: &[CallOutcome]) -> Option<Option<f64>> {
    types
        .iter()
        .zip(outcomes)
        .find(|(ty, outcome)| ty.as_str() == FOR_LOAN && outcome.status_in(OK))
        .map(|(_, outcome)| locate::available_quantity(outcome))
}

pub async fn run(wf: &mut Workflow<'_>) -> Result<()> {
    let security = wf.security()?;
    let client = wf.counterparty()?;
    let mix = &wf.ctx().mix;
    let types = mix.inventory_types.clone();
    let min_rate = mix.batch.min_success_rate;

    let requests = types
        .iter()
        .map(|ty| WorkflowRequest::get(Operation::InventoryQuery, payloads::inventory(ty)).query("securityId", &security.id))
        .collect();
    let (outcomes, _) = wf.batch("inventory types", requests, OK, min_rate).await;

    let baseline = match for_loan_in_batch(&types, &outcomes) {
        Some(available) => {
            wf.shape("inventory reports availability", available.is_some());
            available
        }
        None => locate::query_for_loan(wf, security).await,
    };

    if wf.chance(RECALCULATE_PROBABILITY) {
        let index = ((wf.draw() * types.len() as f64) as usize).min(types.len() - 1);
        let ty = &types[index];
        wf.call(
            WorkflowRequest::post(
                Operation::InventoryCalculate,
                payloads::inventory(ty),
                payloads::inventory_calculation(security, ty),
            ),
            ACCEPTED,
        )
        .await;
    }

    let quantity = wf.quantity();
    locate::run_from_baseline(wf, security, client, quantity, baseline).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn inventory(status: u16, available: u64) -> CallOutcome {
        CallOutcome::synthetic(Operation::InventoryQuery, status, Duration::from_millis(4))
            .with_body(json!({"availableQuantity": available}))
    }

    #[test]
    fn test_for_loan_baseline_taken_from_batch() {
        let types = vec!["for-pledge".to_string(), FOR_LOAN.to_string()];
        let outcomes = vec![inventory(200, 7), inventory(200, 900)];
        assert_eq!(for_loan_in_batch(&types, &outcomes), Some(Some(900.0)));
    }

    #[test]
    fn test_failed_or_missing_for_loan_needs_requery() {
        let types = vec!["for-pledge".to_string(), FOR_LOAN.to_string()];
        let outcomes = vec![inventory(200, 7), inventory(503, 900)];
        assert_eq!(for_loan_in_batch(&types, &outcomes), None);

        let types = vec!["for-pledge".to_string()];
        assert_eq!(for_loan_in_batch(&types, &outcomes[..1]), None);
    }
}
