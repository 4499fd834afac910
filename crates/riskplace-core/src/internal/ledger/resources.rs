use crate::internal::common::error::PlacementError;
use crate::internal::ledger::{Node, NodeRecord, Tier};
use crate::{Cores, MemoryGb, NodeId};

/// Registry of all nodes and their live capacity counters.
///
/// The ledger has exactly one writer at a time: whoever holds `&mut` to it
/// owns the current scheduling turn.
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    nodes: Vec<Node>,
}

impl ResourceLedger {
    pub fn new(records: impl IntoIterator<Item = NodeRecord>) -> Self {
        let nodes = records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| Node::new(NodeId::new(idx as u32), record))
            .collect();
        ResourceLedger { nodes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn node(&self, node_id: NodeId) -> crate::Result<&Node> {
        self.nodes
            .get(node_id.as_usize())
            .ok_or(PlacementError::NodeNotFound(node_id))
    }

    #[inline]
    fn node_mut(&mut self, node_id: NodeId) -> crate::Result<&mut Node> {
        self.nodes
            .get_mut(node_id.as_usize())
            .ok_or(PlacementError::NodeNotFound(node_id))
    }

    #[inline]
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn nodes_of_tier(&self, tier: Tier) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.tier() == tier)
    }

    /// Deducts `cpu` cores and `memory` GB from the node. Nothing is deducted
    /// when either dimension is short.
    pub fn reserve(&mut self, node_id: NodeId, cpu: Cores, memory: MemoryGb) -> crate::Result<()> {
        let node = self.node_mut(node_id)?;
        if !node.has_free(cpu, memory) {
            return Err(PlacementError::InsufficientResources {
                node_id,
                cpu,
                memory,
                available_cpu: node.available_cpu(),
                available_memory: node.available_memory(),
            });
        }
        node.take(cpu, memory);
        log::trace!(
            "Node {node_id}: reserved {cpu} cores/{memory} GB, free {} cores/{} GB",
            node.available_cpu(),
            node.available_memory()
        );
        Ok(())
    }

    /// Returns previously reserved resources to the node. Releasing more than
    /// is reserved is reported and leaves the node untouched.
    pub fn release(&mut self, node_id: NodeId, cpu: Cores, memory: MemoryGb) -> crate::Result<()> {
        let node = self.node_mut(node_id)?;
        if cpu > node.reserved_cpu() || memory > node.reserved_memory() {
            return Err(PlacementError::ReleaseMismatch {
                node_id,
                cpu,
                memory,
                reserved_cpu: node.reserved_cpu(),
                reserved_memory: node.reserved_memory(),
            });
        }
        node.give_back(cpu, memory);
        log::trace!(
            "Node {node_id}: released {cpu} cores/{memory} GB, free {} cores/{} GB",
            node.available_cpu(),
            node.available_memory()
        );
        Ok(())
    }

    pub fn set_activation(&mut self, node_id: NodeId, value: bool) -> crate::Result<()> {
        let node = self.node_mut(node_id)?;
        if node.is_active() != value {
            log::debug!(
                "{} node {node_id} {}",
                node.tier(),
                if value { "activated" } else { "deactivated" }
            );
        }
        node.set_active(value);
        Ok(())
    }

    pub fn count(&self, tier: Tier) -> usize {
        self.nodes_of_tier(tier).count()
    }

    /// Highest risk among the nodes of the tier, 0 when the tier is empty.
    pub fn max_risk(&self, tier: Tier) -> f64 {
        self.nodes_of_tier(tier)
            .map(|n| n.risk())
            .fold(0.0, f64::max)
    }

    /// Highest power draw (W) among the nodes of the tier.
    pub fn max_power(&self, tier: Tier) -> f64 {
        self.nodes_of_tier(tier)
            .map(|n| n.power())
            .fold(0.0, f64::max)
    }

    /// Highest electricity price in the whole infrastructure.
    pub fn max_price(&self) -> f64 {
        self.nodes.iter().map(|n| n.price()).fold(0.0, f64::max)
    }

    pub fn total_reserved(&self) -> (u64, u64) {
        self.nodes.iter().fold((0, 0), |(cpu, mem), n| {
            (cpu + u64::from(n.reserved_cpu()), mem + n.reserved_memory())
        })
    }

    /// `0 <= available <= total` holds for both dimensions of every node.
    pub fn check_invariants(&self) -> bool {
        self.nodes.iter().all(|n| {
            n.available_cpu() <= n.total_cpu() && n.available_memory() <= n.total_memory()
        })
    }
}
