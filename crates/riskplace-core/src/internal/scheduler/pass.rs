use serde::Serialize;

use crate::internal::common::error::PlacementError;
use crate::internal::core::Core;
use crate::internal::request::Request;
use crate::internal::scheduler::cost::ObjectiveBreakdown;
use crate::internal::scheduler::repair::{RepairOutcome, solve_with_shedding};
use crate::internal::solver::LpBackend;
use crate::{Map, NodeId, RequestId, SimTime, hours};

/// Summary of one batch pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    /// Simulated time of the commit, in hours.
    pub at: f64,
    pub reclaimed: usize,
    pub committed: Vec<(RequestId, NodeId)>,
    pub shed: Vec<RequestId>,
    pub breakdown: ObjectiveBreakdown,
    pub risk: f64,
    pub electricity: f64,
    pub objective: f64,
    pub submissions: u32,
    /// Seconds spent inside the solver.
    pub solve_time: f64,
}

/// Periodic scheduler: solves whole batches and carries shed cohorts over
/// to the next pass.
pub struct BatchScheduler<B> {
    backend: B,
    carry_over: Vec<Request>,
}

impl<B: LpBackend> BatchScheduler<B> {
    pub fn new(backend: B) -> Self {
        BatchScheduler {
            backend,
            carry_over: Vec::new(),
        }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Requests shed by earlier passes and not yet placed.
    #[inline]
    pub fn carry_over(&self) -> &[Request] {
        &self.carry_over
    }

    /// Batch of the next pass: the carry-over followed by the new arrivals.
    pub fn assemble(&mut self, arrivals: Vec<Request>) -> Vec<Request> {
        let mut batch = std::mem::take(&mut self.carry_over);
        batch.extend(arrivals);
        batch
    }

    /// Reserves every placement of a solved batch with timestamp `at` and
    /// queues the shed requests for the next pass.
    pub fn commit(
        &mut self,
        core: &mut Core,
        outcome: RepairOutcome,
        at: SimTime,
    ) -> crate::Result<PassReport> {
        let RepairOutcome {
            assignment,
            survivors,
            shed,
            submissions,
            solve_time,
        } = outcome;

        let mut report = PassReport {
            at: hours(at),
            shed: shed.iter().map(|r| r.id()).collect(),
            submissions,
            solve_time: solve_time.as_secs_f64(),
            ..Default::default()
        };
        self.carry_over.extend(shed);

        if let Some(assignment) = assignment {
            let mut pending: Map<RequestId, Request> =
                survivors.into_iter().map(|r| (r.id(), r)).collect();
            for &(request_id, node_id) in &assignment.placements {
                let request = pending
                    .remove(&request_id)
                    .ok_or(PlacementError::RequestNotFound(request_id))?;
                core.admit(request, node_id, at)?;
            }
            report.committed = assignment.placements;
            report.breakdown = assignment.breakdown;
            report.risk = assignment.breakdown.risk();
            report.electricity = assignment.breakdown.electricity();
            report.objective = assignment.objective;
        }

        log::info!(
            "Pass at {:.3} h: {} committed, {} shed, {} carried over, {} submission(s), risk {:.4}, electricity {:.4}",
            report.at,
            report.committed.len(),
            report.shed.len(),
            self.carry_over.len(),
            report.submissions,
            report.risk,
            report.electricity
        );
        Ok(report)
    }

    /// One complete pass at `now`: reclaim expired allocations, solve the
    /// carry-over plus the arrivals, commit.
    pub fn run_pass(
        &mut self,
        core: &mut Core,
        arrivals: Vec<Request>,
        now: SimTime,
    ) -> crate::Result<PassReport> {
        let reclaimed = core.reclaim_expired(now)?;
        let batch = self.assemble(arrivals);
        let outcome = solve_with_shedding(core, &self.backend, batch)?;
        let mut report = self.commit(core, outcome, now)?;
        report.reclaimed = reclaimed.len();
        Ok(report)
    }
}
