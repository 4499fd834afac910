use crate::internal::ledger::{ResourceLedger, Tier};
use crate::internal::request::Request;
use crate::{AllocationId, Map, NodeId, SimTime};

/// A request placed on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    id: AllocationId,
    request: Request,
    node_id: NodeId,
    start: SimTime,
}

impl Allocation {
    #[inline]
    pub fn id(&self) -> AllocationId {
        self.id
    }

    #[inline]
    pub fn request(&self) -> &Request {
        &self.request
    }

    #[inline]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    #[inline]
    pub fn start(&self) -> SimTime {
        self.start
    }

    #[inline]
    fn expires_at(&self) -> SimTime {
        self.start + self.request.lease()
    }

    /// The lease is over once the allocation is strictly older than it.
    #[inline]
    pub fn is_expired(&self, now: SimTime) -> bool {
        now > self.expires_at()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reclaimed {
    pub allocation: Allocation,
    /// The release switched the hosting node off.
    pub deactivated: bool,
}

/// Live allocations and the bookkeeping needed to give their resources back.
#[derive(Debug, Clone, Default)]
pub struct AllocationLifecycle {
    live: Map<AllocationId, Allocation>,
    live_per_node: Map<NodeId, u32>,
    id_counter: u64,
    reserved_cpu: u64,
    reserved_memory: u64,
    released_cpu: u64,
    released_memory: u64,
}

impl AllocationLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    #[inline]
    pub fn live_on(&self, node_id: NodeId) -> u32 {
        self.live_per_node.get(&node_id).copied().unwrap_or(0)
    }

    #[inline]
    pub fn get(&self, allocation_id: AllocationId) -> Option<&Allocation> {
        self.live.get(&allocation_id)
    }

    /// Live allocations ordered by id.
    pub fn live(&self) -> Vec<&Allocation> {
        let mut live: Vec<_> = self.live.values().collect();
        live.sort_unstable_by_key(|a| a.id);
        live
    }

    /// Total (cpu, memory) reserved and released through this lifecycle so far.
    pub fn totals(&self) -> ((u64, u64), (u64, u64)) {
        (
            (self.reserved_cpu, self.reserved_memory),
            (self.released_cpu, self.released_memory),
        )
    }

    /// Reserves the request demand on the node, switches the node on and
    /// records the allocation.
    pub fn admit(
        &mut self,
        ledger: &mut ResourceLedger,
        request: Request,
        node_id: NodeId,
        now: SimTime,
    ) -> crate::Result<AllocationId> {
        ledger.reserve(node_id, request.cpu(), request.memory())?;
        ledger.set_activation(node_id, true)?;

        self.id_counter += 1;
        let id = AllocationId::new(self.id_counter);
        self.reserved_cpu += u64::from(request.cpu());
        self.reserved_memory += request.memory();
        *self.live_per_node.entry(node_id).or_default() += 1;
        log::debug!(
            "Request {} placed on node {node_id} at {:?} (lease {:?})",
            request.id(),
            now,
            request.lease()
        );
        self.live.insert(
            id,
            Allocation {
                id,
                request,
                node_id,
                start: now,
            },
        );
        Ok(id)
    }

    /// Releases every allocation whose lease is over.
    ///
    /// Expired allocations are collected before any of them is removed.
    pub fn reclaim_expired(
        &mut self,
        ledger: &mut ResourceLedger,
        now: SimTime,
    ) -> crate::Result<Vec<Reclaimed>> {
        let mut expired: Vec<AllocationId> = self
            .live
            .values()
            .filter(|a| a.is_expired(now))
            .map(|a| a.id)
            .collect();
        expired.sort_unstable();
        self.release_all(ledger, expired)
    }

    /// Releases the allocation if it is still live.
    pub fn release_if_live(
        &mut self,
        ledger: &mut ResourceLedger,
        allocation_id: AllocationId,
    ) -> crate::Result<Option<Reclaimed>> {
        match self.live.remove(&allocation_id) {
            Some(allocation) => self.release(ledger, allocation).map(Some),
            None => Ok(None),
        }
    }

    fn release_all(
        &mut self,
        ledger: &mut ResourceLedger,
        ids: Vec<AllocationId>,
    ) -> crate::Result<Vec<Reclaimed>> {
        let mut reclaimed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(allocation) = self.live.remove(&id) {
                reclaimed.push(self.release(ledger, allocation)?);
            }
        }
        Ok(reclaimed)
    }

    /// Gives back the resources of an allocation already removed from the
    /// live set. On failure the allocation is put back.
    fn release(
        &mut self,
        ledger: &mut ResourceLedger,
        allocation: Allocation,
    ) -> crate::Result<Reclaimed> {
        let node_id = allocation.node_id;
        let (cpu, memory) = (allocation.request.cpu(), allocation.request.memory());
        if let Err(error) = ledger.release(node_id, cpu, memory) {
            self.live.insert(allocation.id, allocation);
            return Err(error);
        }

        self.released_cpu += u64::from(cpu);
        self.released_memory += memory;
        let remaining = {
            let count = self.live_per_node.entry(node_id).or_default();
            *count = count.saturating_sub(1);
            *count
        };
        if remaining == 0 {
            self.live_per_node.remove(&node_id);
        }

        let node = ledger.node(node_id)?;
        let tier = node.tier();
        let deactivate = node.is_active() && (tier == Tier::Edge || remaining == 0);
        if deactivate {
            ledger.set_activation(node_id, false)?;
        }
        if tier == Tier::Cloud && remaining == 0 {
            log::debug!("Cloud node {node_id} is empty");
        }
        log::debug!(
            "Request {} released from node {node_id}",
            allocation.request.id()
        );
        Ok(Reclaimed {
            allocation,
            deactivated: deactivate,
        })
    }

    /// Releases all live allocations, regardless of their leases.
    pub fn drain_all(&mut self, ledger: &mut ResourceLedger) -> crate::Result<Vec<Reclaimed>> {
        let mut ids: Vec<_> = self.live.keys().copied().collect();
        ids.sort_unstable();
        self.release_all(ledger, ids)
    }
}
