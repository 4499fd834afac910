use crate::internal::config::SchedulerConfig;
use crate::internal::ledger::ResourceLedger;
use crate::internal::lifecycle::{AllocationLifecycle, Reclaimed};
use crate::internal::request::Request;
use crate::internal::scheduler::eligibility::EligibilityFilter;
use crate::{AllocationId, NodeId, Set, SimTime};

/// State owned by the scheduling turn: the ledger and the live allocations.
#[derive(Debug, Clone)]
pub struct Core {
    config: SchedulerConfig,
    filter: EligibilityFilter,
    ledger: ResourceLedger,
    lifecycle: AllocationLifecycle,
    // Cloud nodes switched on in the infrastructure description that have not
    // hosted anything yet.
    preactivated: Set<NodeId>,
}

impl Core {
    pub fn new(config: SchedulerConfig, ledger: ResourceLedger) -> crate::Result<Self> {
        config.validate()?;
        let preactivated = ledger
            .nodes()
            .filter(|n| n.is_cloud() && n.is_active())
            .map(|n| n.id())
            .collect();
        Ok(Core {
            preactivated,
            filter: EligibilityFilter::new(config.eligibility),
            config,
            ledger,
            lifecycle: AllocationLifecycle::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Replaces the objective weights, e.g. for a sweep over the trade-off.
    pub fn set_weights(&mut self, weights: crate::internal::config::Weights) {
        self.config.weights = weights;
    }

    #[inline]
    pub fn filter(&self) -> &EligibilityFilter {
        &self.filter
    }

    #[inline]
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    #[inline]
    pub fn lifecycle(&self) -> &AllocationLifecycle {
        &self.lifecycle
    }

    /// Releases expired allocations. Runs at the start of every pass, before
    /// any admission.
    pub fn reclaim_expired(&mut self, now: SimTime) -> crate::Result<Vec<Reclaimed>> {
        let reclaimed = self.lifecycle.reclaim_expired(&mut self.ledger, now)?;
        if !reclaimed.is_empty() {
            log::debug!("{} allocation(s) expired at {:?}", reclaimed.len(), now);
        }
        Ok(reclaimed)
    }

    #[inline]
    pub fn admit(
        &mut self,
        request: Request,
        node_id: NodeId,
        now: SimTime,
    ) -> crate::Result<AllocationId> {
        let id = self
            .lifecycle
            .admit(&mut self.ledger, request, node_id, now)?;
        self.preactivated.remove(&node_id);
        Ok(id)
    }

    #[inline]
    pub fn release_if_live(
        &mut self,
        allocation_id: AllocationId,
    ) -> crate::Result<Option<Reclaimed>> {
        self.lifecycle
            .release_if_live(&mut self.ledger, allocation_id)
    }

    pub fn drain(&mut self) -> crate::Result<Vec<Reclaimed>> {
        self.lifecycle.drain_all(&mut self.ledger)
    }

    /// Every cloud node is active iff it hosts a live allocation (or was
    /// switched on at load time and never used), resource totals match and no
    /// counter is out of range.
    pub fn is_consistent(&self) -> bool {
        let activation_ok = self
            .ledger
            .nodes()
            .filter(|n| n.is_cloud())
            .all(|n| {
                let hosting = self.lifecycle.live_on(n.id()) > 0;
                n.is_active() == (hosting || self.preactivated.contains(&n.id()))
            });
        let hosting_ok = self
            .lifecycle
            .live()
            .iter()
            .all(|a| self.ledger.node(a.node_id()).is_ok_and(|n| n.is_active() || !n.is_cloud()));
        let ((r_cpu, r_mem), (f_cpu, f_mem)) = self.lifecycle.totals();
        let totals_ok = self.ledger.total_reserved() == (r_cpu - f_cpu, r_mem - f_mem);
        activation_ok && hosting_ok && totals_ok && self.ledger.check_invariants()
    }
}
