use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use riskplace_core::request::{Request, RequestQueue};
use riskplace_core::scheduler::{BatchScheduler, PassReport, solve_with_shedding};
use riskplace_core::solver::LpBackend;
use riskplace_core::{Core, Map, RequestId, SimTime, hours};

use crate::simulation::drain_and_check;

/// One non-empty collection window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowReport {
    pub window: u32,
    /// End of the collection window, in hours.
    pub window_end: f64,
    #[serde(flatten)]
    pub pass: PassReport,
    pub served: usize,
    /// Queueing delay of the served requests, in hours.
    pub mean_delay: f64,
    pub max_delay: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub windows: u32,
    pub passes: u32,
    pub served: usize,
    /// Shed events; a request shed in several passes counts once per pass.
    pub shed: usize,
    /// Requests not placed when the simulation stopped.
    pub unserved: usize,
    pub mean_delay: f64,
    /// Sums of the normalized per-pass components.
    pub risk: f64,
    pub electricity: f64,
    pub submissions: u32,
    pub solve_time: f64,
    pub conserved: bool,
}

/// Windowed batch simulation: requests are collected for one window, solved
/// as one batch, and committed once the solver has returned.
pub struct BatchSimulation {
    core: Core,
    scheduler: BatchScheduler<Arc<dyn LpBackend>>,
    pending: RequestQueue,
    window: Duration,
    until: SimTime,
}

impl BatchSimulation {
    pub fn new(
        core: Core,
        backend: Arc<dyn LpBackend>,
        requests: Vec<Request>,
        window: Duration,
        until: SimTime,
    ) -> Self {
        BatchSimulation {
            core,
            scheduler: BatchScheduler::new(backend),
            pending: requests.into_iter().collect(),
            window,
            until,
        }
    }

    /// Runs until the simulated clock reaches `until`, handing each window
    /// report to `on_window`.
    pub async fn run(
        self,
        mut on_window: impl FnMut(&WindowReport) -> crate::Result<()>,
    ) -> crate::Result<BatchSummary> {
        let BatchSimulation {
            mut core,
            mut scheduler,
            mut pending,
            window,
            until,
        } = self;
        let mut summary = BatchSummary::default();
        let mut total_delay = 0.0;
        let mut clock = SimTime::ZERO;
        let mut collected_until = SimTime::ZERO;

        while clock < until {
            let window_end = clock + window;
            summary.windows += 1;
            let reclaimed = core.reclaim_expired(clock)?;
            let arrivals = pending.take_arrived(collected_until, window_end);
            collected_until = window_end;

            let batch = scheduler.assemble(arrivals);
            if batch.is_empty() {
                log::debug!("Window {} is empty", summary.windows);
                clock = window_end;
                continue;
            }
            let arrived_at: Map<RequestId, SimTime> =
                batch.iter().map(|r| (r.id(), r.arrival())).collect();

            // The solve owns the core; nothing else touches it meanwhile.
            let backend = scheduler.backend().clone();
            let (returned, outcome) = tokio::task::spawn_blocking(move || {
                let outcome = solve_with_shedding(&core, &backend, batch);
                (core, outcome)
            })
            .await?;
            core = returned;
            let outcome = outcome?;

            let commit_at = window_end + outcome.solve_time;
            let mut pass = scheduler.commit(&mut core, outcome, commit_at)?;
            pass.reclaimed = reclaimed.len();
            clock = commit_at;

            let delays: Vec<f64> = pass
                .committed
                .iter()
                .filter_map(|(id, _)| arrived_at.get(id))
                .map(|arrival| hours(window_end.saturating_sub(*arrival)))
                .collect();
            let served = delays.len();
            let delay_sum: f64 = delays.iter().sum();
            total_delay += delay_sum;

            summary.passes += 1;
            summary.served += served;
            summary.shed += pass.shed.len();
            summary.risk += pass.risk;
            summary.electricity += pass.electricity;
            summary.submissions += pass.submissions;
            summary.solve_time += pass.solve_time;

            let report = WindowReport {
                window: summary.windows,
                window_end: hours(window_end),
                served,
                mean_delay: if served > 0 {
                    delay_sum / served as f64
                } else {
                    0.0
                },
                max_delay: delays.iter().copied().fold(0.0, f64::max),
                pass,
            };
            on_window(&report)?;
        }

        summary.unserved = scheduler.carry_over().len() + pending.len();
        if summary.served > 0 {
            summary.mean_delay = total_delay / summary.served as f64;
        }
        summary.conserved = drain_and_check(&mut core)?;
        log::info!(
            "Batch simulation finished: {} pass(es), {} served, {} unserved",
            summary.passes,
            summary.served,
            summary.unserved
        );
        Ok(summary)
    }
}
