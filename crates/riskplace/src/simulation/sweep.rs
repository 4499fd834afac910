use serde::Serialize;

use riskplace_core::config::Weights;
use riskplace_core::{Core, SimTime};
use riskplace_core::request::Request;
use riskplace_core::scheduler::solve_with_shedding;
use riskplace_core::solver::LpBackend;

use crate::simulation::greedy::run_greedy;

/// One point of the risk/electricity trade-off.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SweepPoint {
    pub theta_risk: f64,
    pub theta_electricity: f64,
    pub f_risk: f64,
    pub f_el: f64,
    pub objective: f64,
    pub served: usize,
    pub shed: usize,
    pub solve_time: f64,
    /// Another point places at least as many requests and is no worse in
    /// both components.
    pub dominated: bool,
}

impl SweepPoint {
    fn dominates(&self, other: &SweepPoint) -> bool {
        self.served >= other.served
            && self.f_risk <= other.f_risk
            && self.f_el <= other.f_el
            && (self.f_risk < other.f_risk || self.f_el < other.f_el)
    }
}

pub fn mark_dominated(points: &mut [SweepPoint]) {
    let dominated: Vec<bool> = points
        .iter()
        .map(|p| points.iter().any(|q| q.dominates(p)))
        .collect();
    for (point, dominated) in points.iter_mut().zip(dominated) {
        point.dominated = dominated;
    }
}

/// `steps + 1` evenly spaced risk weights from 0 to 1.
fn risk_weights(steps: u32) -> crate::Result<impl Iterator<Item = Weights>> {
    if steps == 0 {
        return Err(crate::Error::InvalidInput(
            "a sweep needs at least one step".into(),
        ));
    }
    Ok((0..=steps).map(move |step| Weights::from_risk(f64::from(step) / f64::from(steps))))
}

fn log_point(point: &SweepPoint) {
    log::debug!(
        "theta_risk {:.3}: f_risk {:.4}, f_el {:.4}, {} served",
        point.theta_risk,
        point.f_risk,
        point.f_el,
        point.served
    );
}

/// Solves the same batch for `steps + 1` evenly spaced risk weights, each on
/// a fresh copy of the ledger.
pub fn sweep<B: LpBackend + ?Sized>(
    core: &Core,
    backend: &B,
    requests: &[Request],
    steps: u32,
) -> crate::Result<Vec<SweepPoint>> {
    let mut points = Vec::with_capacity(steps as usize + 1);
    for weights in risk_weights(steps)? {
        let mut core = core.clone();
        core.set_weights(weights);

        let outcome = solve_with_shedding(&core, backend, requests.to_vec())?;
        let mut point = SweepPoint {
            theta_risk: weights.risk,
            theta_electricity: weights.electricity,
            shed: outcome.shed.len(),
            solve_time: outcome.solve_time.as_secs_f64(),
            ..Default::default()
        };
        if let Some(assignment) = &outcome.assignment {
            point.f_risk = assignment.breakdown.risk();
            point.f_el = assignment.breakdown.electricity();
            point.objective = assignment.objective;
            point.served = assignment.placements.len();
        }
        log_point(&point);
        points.push(point);
    }
    mark_dominated(&mut points);
    Ok(points)
}

/// Runs the continuous simulation for `steps + 1` evenly spaced risk
/// weights, each on a fresh copy of the ledger. Requests still waiting at
/// `until` count as shed.
pub fn sweep_greedy(
    core: &Core,
    requests: &[Request],
    until: Option<SimTime>,
    steps: u32,
) -> crate::Result<Vec<SweepPoint>> {
    let mut points = Vec::with_capacity(steps as usize + 1);
    for weights in risk_weights(steps)? {
        let mut core = core.clone();
        core.set_weights(weights);
        let summary = run_greedy(core, requests.to_vec(), until)?;
        let point = SweepPoint {
            theta_risk: weights.risk,
            theta_electricity: weights.electricity,
            f_risk: summary.risk,
            f_el: summary.electricity,
            objective: summary.objective,
            served: summary.metrics.admitted() as usize,
            shed: summary.metrics.unserved as usize,
            ..Default::default()
        };
        log_point(&point);
        points.push(point);
    }
    mark_dominated(&mut points);
    Ok(points)
}
