//! Per-iteration harness shared by every workflow

use crate::error::{Result, ScenarioError};
use std::time::Duration;
use surge_config::ScenarioKind;
use surge_core::reference::{AggregationUnit, Book, Counterparty, SeedLocate, Security};
use surge_core::{ReferenceData, TestContext, WorkerRecorder};
use surge_http::{CallOutcome, WorkflowRequest};

/// Expected statuses for reads
pub const OK: &[u16] = &[200];
/// Expected statuses for creates
pub const CREATED: &[u16] = &[200, 201];
/// Expected statuses for asynchronous recalculations
pub const ACCEPTED: &[u16] = &[200, 202];
/// Expected statuses for updates
pub const UPDATED: &[u16] = &[200, 204];

/// A call together with its functional verdict
#[derive(Debug)]
pub struct Checked {
    pub outcome: CallOutcome,
    /// Expected status received (SLA misses do not clear this)
    pub ok: bool,
}

/// One scenario iteration's view of the run: shared context, the worker's
/// recorder and random source.
pub struct Workflow<'a> {
    ctx: &'a TestContext,
    recorder: &'a mut WorkerRecorder,
    rng: &'a mut fastrand::Rng,
    scenario: ScenarioKind,
}

impl<'a> Workflow<'a> {
    pub fn new(
        ctx: &'a TestContext,
        recorder: &'a mut WorkerRecorder,
        rng: &'a mut fastrand::Rng,
        scenario: ScenarioKind,
    ) -> Self {
        Self {
            ctx,
            recorder,
            rng,
            scenario,
        }
    }

    pub fn ctx(&self) -> &'a TestContext {
        self.ctx
    }

    pub fn scenario(&self) -> ScenarioKind {
        self.scenario
    }

    pub fn run_elapsed(&self) -> Duration {
        self.recorder.run_elapsed()
    }

    /// Send, record the latency sample and run the call checks
    pub async fn call(&mut self, request: WorkflowRequest, expected: &[u16]) -> Checked {
        let request = request.scenario(self.scenario);
        let outcome = self.ctx.client.call(&request).await;
        self.recorder.observe(&outcome);
        let ok = self.ctx.checks.check_call(self.recorder, &outcome, expected);
        Checked { outcome, ok }
    }

    /// Send independent requests concurrently; each is checked, then the batch rate
    pub async fn batch(
        &mut self,
        name: &str,
        requests: Vec<WorkflowRequest>,
        expected: &[u16],
        min_success_rate: f64,
    ) -> (Vec<CallOutcome>, bool) {
        let requests: Vec<_> = requests.into_iter().map(|r| r.scenario(self.scenario)).collect();
        let outcomes = self.ctx.client.batch(&requests).await;
        for outcome in &outcomes {
            self.recorder.observe(outcome);
        }
        let passed = self
            .ctx
            .checks
            .check_batch(self.recorder, name, &outcomes, expected, min_success_rate);
        (outcomes, passed)
    }

    /// Record a response-shape check
    pub fn shape(&mut self, name: &str, passed: bool) -> bool {
        self.ctx.checks.check_shape(self.recorder, name, passed)
    }

    pub fn draw(&mut self) -> f64 {
        self.rng.f64()
    }

    /// True with probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.f64() < p
    }

    pub async fn think(&mut self) {
        let pause = self.ctx.mix.think_time.at(self.rng.f64());
        sleep(pause).await;
    }

    pub async fn settle(&self) {
        sleep(self.ctx.mix.settle_delay).await;
    }

    pub async fn locate_poll_wait(&self) {
        sleep(self.ctx.mix.locate_poll_delay).await;
    }

    pub fn security(&mut self) -> Result<&'a Security> {
        let ctx = self.ctx;
        ctx.reference
            .security(self.rng.f64())
            .ok_or(ScenarioError::MissingReferenceData("securities"))
    }

    pub fn counterparty(&mut self) -> Result<&'a Counterparty> {
        let ctx = self.ctx;
        ctx.reference
            .counterparty(self.rng.f64())
            .ok_or(ScenarioError::MissingReferenceData("counterparties"))
    }

    pub fn book(&mut self) -> Result<&'a Book> {
        let ctx = self.ctx;
        ctx.reference
            .book(self.rng.f64())
            .ok_or(ScenarioError::MissingReferenceData("books"))
    }

    pub fn aggregation_unit(&mut self, book: &Book) -> Result<&'a AggregationUnit> {
        let ctx = self.ctx;
        ctx.reference
            .aggregation_unit_for(book, self.rng.f64())
            .ok_or(ScenarioError::MissingReferenceData("aggregation units"))
    }

    /// Book and security of a seeded position, or a random pair when nothing is seeded
    pub fn position_subject(&mut self) -> Result<(&'a Book, &'a Security)> {
        let ctx = self.ctx;
        let reference: &'a ReferenceData = &ctx.reference;
        let seeded = reference.position(self.rng.f64()).and_then(|p| {
            Some((reference.find_book(&p.book_id)?, reference.find_security(&p.security_id)?))
        });
        match seeded {
            Some(subject) => Ok(subject),
            None => Ok((self.book()?, self.security()?)),
        }
    }

    pub fn seeded_locate(&mut self) -> Option<&'a SeedLocate> {
        let ctx = self.ctx;
        ctx.reference.locate(self.rng.f64())
    }

    /// Quantity in the configured range, rounded down to whole lots
    pub fn quantity(&mut self) -> u64 {
        let range = self.ctx.mix.quantity;
        let lot = range.lot.max(1);
        let lots_min = range.min.div_ceil(lot).max(1);
        let lots_max = (range.max / lot).max(lots_min);
        self.rng.u64(lots_min..=lots_max) * lot
    }

    /// Price within ±`spread` of `reference`
    pub fn jitter_price(&mut self, reference: f64, spread: f64) -> f64 {
        let factor = 1.0 + spread * (self.rng.f64() * 2.0 - 1.0);
        (reference * factor * 100.0).round() / 100.0
    }
}

async fn sleep(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
