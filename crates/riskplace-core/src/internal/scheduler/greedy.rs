use serde::Serialize;
use tokio::task::JoinSet;

use crate::internal::clock::SimClock;
use crate::internal::common::error::PlacementError;
use crate::internal::core::Core;
use crate::internal::ledger::Tier;
use crate::internal::request::Request;
use crate::internal::scheduler::cost::{CostModel, CostTotals, ObjectiveBreakdown};
use crate::{AllocationId, Map, NodeId, RequestId, SimTime, WrappedRcRefCell};

/// Running totals of the continuous scheduler.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GreedyMetrics {
    pub admitted_cloud: u32,
    pub admitted_edge: u32,
    /// Cloud nodes woken up by an admission.
    pub activations: u32,
    pub failed_attempts: u64,
    /// Requests still waiting when the simulation stopped.
    pub unserved: u32,
    pub raw_risk: f64,
    pub raw_electricity: f64,
    #[serde(skip)]
    totals: CostTotals,
}

impl GreedyMetrics {
    #[inline]
    pub fn admitted(&self) -> u32 {
        self.admitted_cloud + self.admitted_edge
    }

    /// Totals normalized by the worst cases of the admitted requests.
    pub fn breakdown(&self) -> ObjectiveBreakdown {
        self.totals.breakdown()
    }

    fn record(&mut self, placement: &Placement) {
        match placement.tier {
            Tier::Cloud => self.admitted_cloud += 1,
            Tier::Edge => self.admitted_edge += 1,
        }
        if placement.activation > 0.0 {
            self.activations += 1;
        }
        self.raw_risk += placement.risk;
        self.raw_electricity += placement.cost + placement.activation;
        self.totals
            .add_placement(placement.tier, placement.risk, placement.cost);
        self.totals.activation += placement.activation;
        self.totals
            .add_scale(placement.tier, placement.max_risk, placement.worst_cost);
    }
}

struct Placement {
    tier: Tier,
    risk: f64,
    cost: f64,
    activation: f64,
    max_risk: f64,
    worst_cost: f64,
}

/// State of the continuous scheduler behind one `Rc<RefCell<_>>`.
pub struct GreedyCore {
    core: Core,
    cost: CostModel,
    metrics: GreedyMetrics,
    failed_attempts: Map<RequestId, u32>,
}

impl GreedyCore {
    pub fn new(core: Core) -> Self {
        let cost = CostModel::new(core.config(), core.ledger());
        let metrics = GreedyMetrics {
            totals: CostTotals {
                activation_scale: cost.activation_scale(),
                ..Default::default()
            },
            ..Default::default()
        };
        GreedyCore {
            core,
            cost,
            metrics,
            failed_attempts: Map::default(),
        }
    }

    #[inline]
    pub fn core(&self) -> &Core {
        &self.core
    }

    #[inline]
    pub fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    #[inline]
    pub fn metrics(&self) -> &GreedyMetrics {
        &self.metrics
    }

    pub fn failed_attempts(&self, request_id: RequestId) -> u32 {
        self.failed_attempts.get(&request_id).copied().unwrap_or(0)
    }

    fn note_failure(&mut self, request_id: RequestId) -> u32 {
        self.metrics.failed_attempts += 1;
        let count = self.failed_attempts.entry(request_id).or_default();
        *count += 1;
        *count
    }

    /// Eligible nodes ordered by ascending score, ties by node id.
    pub fn ranked_nodes(&self, request: &Request) -> Vec<NodeId> {
        let ledger = self.core.ledger();
        let mut ranked: Vec<(f64, NodeId)> = self
            .core
            .filter()
            .eligible_nodes(request, ledger)
            .into_iter()
            .filter_map(|id| ledger.node(id).ok())
            .map(|n| (self.cost.greedy_score(n), n.id()))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        ranked.into_iter().map(|(_, id)| id).collect()
    }

    /// One placement attempt at `now`. Returns `Ok(None)` when every eligible
    /// node lacks residual capacity and `NoEligibleNode` when there is no
    /// eligible node at all.
    pub fn try_place(
        &mut self,
        request: &Request,
        now: SimTime,
    ) -> crate::Result<Option<(AllocationId, NodeId)>> {
        self.core.reclaim_expired(now)?;
        let ranked = self.ranked_nodes(request);
        if ranked.is_empty() {
            self.core
                .filter()
                .log_no_eligible(request, self.core.ledger());
            return Err(PlacementError::NoEligibleNode(request.id()));
        }

        let ledger = self.core.ledger();
        let Some(node) = ranked
            .iter()
            .filter_map(|id| ledger.node(*id).ok())
            .find(|n| n.has_free(request.cpu(), request.memory()))
        else {
            return Ok(None);
        };
        let node_id = node.id();
        let placement = Placement {
            tier: request.tier(),
            risk: node.risk(),
            cost: self.cost.assignment_cost(request, node),
            activation: self.cost.activation_cost(node),
            max_risk: self.cost.max_risk(request.tier()),
            worst_cost: self.cost.worst_assignment_cost(request, ledger),
        };

        let allocation_id = self.core.admit(request.clone(), node_id, now)?;
        self.metrics.record(&placement);
        Ok(Some((allocation_id, node_id)))
    }
}

/// Online scheduler placing requests one at a time, retrying with an
/// exponential backoff when nothing fits.
///
/// Must run inside a `tokio::task::LocalSet`.
#[derive(Clone)]
pub struct GreedyScheduler<C> {
    state: WrappedRcRefCell<GreedyCore>,
    clock: C,
}

impl<C: SimClock> GreedyScheduler<C> {
    pub fn new(core: Core, clock: C) -> Self {
        GreedyScheduler {
            state: WrappedRcRefCell::wrap(GreedyCore::new(core)),
            clock,
        }
    }

    #[inline]
    pub fn state(&self) -> &WrappedRcRefCell<GreedyCore> {
        &self.state
    }

    pub fn metrics(&self) -> GreedyMetrics {
        self.state.get().metrics().clone()
    }

    /// Places the request, waiting as long as it takes. The allocation is
    /// released `lease` after its placement by a local task.
    pub async fn admit(&self, request: Request) -> crate::Result<AllocationId> {
        let retry = self.state.get().core().config().retry;
        loop {
            let now = self.clock.now();
            let attempt = self.state.get_mut().try_place(&request, now);
            match attempt {
                Ok(Some((allocation_id, _))) => {
                    self.schedule_release(allocation_id, now + request.lease());
                    return Ok(allocation_id);
                }
                Ok(None) => {}
                Err(error) if !error.is_fatal() => {}
                Err(error) => return Err(error),
            }
            let failures = self.state.get_mut().note_failure(request.id());
            let delay = retry.delay(failures);
            log::debug!(
                "Request {} not placed (attempt {failures}), retrying in {delay:?}",
                request.id()
            );
            self.clock.sleep_until(now + delay).await;
        }
    }

    fn schedule_release(&self, allocation_id: AllocationId, at: SimTime) {
        let state = self.state.clone();
        let sleep = self.clock.sleep_until(at);
        tokio::task::spawn_local(async move {
            sleep.await;
            if let Err(error) = state.get_mut().core_mut().release_if_live(allocation_id) {
                log::error!("Releasing allocation {allocation_id} failed: {error}");
            }
        });
    }

    /// Runs a whole continuous simulation: every request is offered at its
    /// arrival time. With `until`, requests still waiting at that time are
    /// counted as unserved.
    pub async fn run(
        &self,
        mut requests: Vec<Request>,
        until: Option<SimTime>,
    ) -> crate::Result<GreedyMetrics> {
        requests.sort_by_key(|r| (r.arrival(), r.id()));
        let mut admissions = JoinSet::new();
        for request in requests {
            if until.is_some_and(|u| request.arrival() > u) {
                continue;
            }
            let this = self.clone();
            admissions.spawn_local(async move {
                this.clock.sleep_until(request.arrival()).await;
                match until {
                    Some(until) => {
                        tokio::select! {
                            r = this.admit(request) => r.map(Some),
                            _ = this.clock.sleep_until(until) => Ok(None),
                        }
                    }
                    None => this.admit(request).await.map(Some),
                }
            });
        }

        let mut unserved = 0;
        while let Some(joined) = admissions.join_next().await {
            match joined {
                Ok(Ok(Some(_))) => {}
                Ok(Ok(None)) => unserved += 1,
                Ok(Err(error)) => return Err(error),
                Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
                Err(error) => log::warn!("Admission task cancelled: {error}"),
            }
        }
        let mut state = self.state.get_mut();
        state.metrics.unserved = unserved;
        log::info!(
            "Greedy run finished: {} admitted, {} unserved, {} failed attempt(s)",
            state.metrics.admitted(),
            unserved,
            state.metrics.failed_attempts
        );
        Ok(state.metrics.clone())
    }
}
