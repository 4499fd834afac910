use std::time::{Duration, Instant};

use crate::internal::common::error::PlacementError;
use crate::internal::core::Core;
use crate::internal::request::{Request, RequestQueue};
use crate::internal::scheduler::batch::{BatchAssignment, BatchFormulator};
use crate::internal::solver::{LpBackend, LpStatus};

/// Outcome of solving a batch, shedding cohorts until the rest fits.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    /// `None` when every cohort had to be shed (or the batch was empty).
    pub assignment: Option<BatchAssignment>,
    /// Requests of the final, feasible batch, in batch order.
    pub survivors: Vec<Request>,
    /// Shed requests, newest cohort first.
    pub shed: Vec<Request>,
    pub submissions: u32,
    /// Time spent inside the solver.
    pub solve_time: Duration,
}

impl RepairOutcome {
    fn empty(shed: Vec<Request>, submissions: u32, solve_time: Duration) -> Self {
        RepairOutcome {
            assignment: None,
            survivors: Vec::new(),
            shed,
            submissions,
            solve_time,
        }
    }
}

/// Solves the batch; while the model is infeasible, removes every request
/// of the newest cohort and retries. Terminates after at most one iteration
/// per distinct group id.
pub fn solve_with_shedding<B: LpBackend + ?Sized>(
    core: &Core,
    backend: &B,
    requests: Vec<Request>,
) -> crate::Result<RepairOutcome> {
    let formulator = BatchFormulator::new(core);
    let mut queue: RequestQueue = requests.into_iter().collect();
    let mut shed = Vec::new();
    let mut submissions = 0;
    let mut solve_time = Duration::ZERO;
    log::debug!(
        "Solving batch of {} request(s) in {} group(s)",
        queue.len(),
        queue.group_count()
    );

    loop {
        if queue.is_empty() {
            if !shed.is_empty() {
                log::warn!("All {} request(s) of the batch were shed", shed.len());
            }
            return Ok(RepairOutcome::empty(shed, submissions, solve_time));
        }

        let model = formulator.formulate(core.ledger(), queue.as_slice());
        if !model.is_trivially_infeasible() {
            submissions += 1;
            let start = Instant::now();
            let outcome = backend.solve(model.lp());
            solve_time += start.elapsed();
            match &outcome.status {
                LpStatus::Optimal => {
                    let assignment = model.interpret(&outcome)?;
                    log::debug!(
                        "Batch of {} request(s) solved after {submissions} submission(s), objective {}",
                        queue.len(),
                        assignment.objective
                    );
                    return Ok(RepairOutcome {
                        assignment: Some(assignment),
                        survivors: queue.into_vec(),
                        shed,
                        submissions,
                        solve_time,
                    });
                }
                LpStatus::Infeasible => {}
                LpStatus::Failed(message) => {
                    return Err(PlacementError::SolverError(message.clone()));
                }
            }
        }

        let group = queue.max_group();
        let cohort = queue.remove_newest_group();
        log::warn!(
            "Batch infeasible, shedding group {} ({} request(s), {} left)",
            group.map_or_else(|| "-".to_string(), |g| g.to_string()),
            cohort.len(),
            queue.len()
        );
        shed.extend(cohort);
    }
}
