//! System health sampling for degradation tracking

use crate::workflow::{Workflow, OK};
use surge_config::Operation;
use surge_core::HealthSnapshot;
use surge_http::WorkflowRequest;
use tracing::trace;

/// Fetch system health and fold utilisation into the degradation tracker
pub async fn sample(wf: &mut Workflow<'_>) -> Option<HealthSnapshot> {
    let checked = wf
        .call(WorkflowRequest::get(Operation::SystemHealth, crate::payloads::SYSTEM_HEALTH), OK)
        .await;
    if !checked.ok {
        return None;
    }

    let snapshot = HealthSnapshot::from_outcome(&checked.outcome)?;
    if let Some(tracker) = wf.ctx().degradation.as_ref() {
        tracker.record_health(wf.run_elapsed(), snapshot);
    }
    trace!(?snapshot, "health sample");
    Some(snapshot)
}
