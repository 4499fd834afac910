use serde::Serialize;

use riskplace_core::clock::TokioClock;
use riskplace_core::request::Request;
use riskplace_core::scheduler::{GreedyMetrics, GreedyScheduler, ObjectiveBreakdown};
use riskplace_core::{Core, SimTime};

use crate::simulation::drain_and_check;

#[derive(Debug, Clone, Serialize)]
pub struct GreedySummary {
    #[serde(flatten)]
    pub metrics: GreedyMetrics,
    pub breakdown: ObjectiveBreakdown,
    pub risk: f64,
    pub electricity: f64,
    pub objective: f64,
    pub conserved: bool,
}

/// Continuous simulation on the current `LocalSet`. Simulated time is
/// `tokio::time`, so under a paused runtime the run takes no wall-clock time.
pub async fn simulate(
    core: Core,
    requests: Vec<Request>,
    until: Option<SimTime>,
) -> crate::Result<GreedySummary> {
    let weights = core.config().weights;
    let scheduler = GreedyScheduler::new(core, TokioClock::start());
    let metrics = scheduler.run(requests, until).await?;

    let breakdown = metrics.breakdown();
    let conserved = drain_and_check(scheduler.state().get_mut().core_mut())?;
    Ok(GreedySummary {
        risk: breakdown.risk(),
        electricity: breakdown.electricity(),
        objective: breakdown.objective(weights),
        breakdown,
        metrics,
        conserved,
    })
}

/// Runs [`simulate`] on its own paused current-thread runtime.
pub fn run_greedy(
    core: Core,
    requests: Vec<Request>,
    until: Option<SimTime>,
) -> crate::Result<GreedySummary> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, simulate(core, requests, until))
}
