use crate::{Cores, MemoryGb, NodeId, RequestId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error(
        "Insufficient resources on node {node_id}: requested {cpu} cores/{memory} GB, available {available_cpu} cores/{available_memory} GB"
    )]
    InsufficientResources {
        node_id: NodeId,
        cpu: Cores,
        memory: MemoryGb,
        available_cpu: Cores,
        available_memory: MemoryGb,
    },
    #[error(
        "Release of {cpu} cores/{memory} GB on node {node_id} exceeds the reserved amount ({reserved_cpu} cores/{reserved_memory} GB)"
    )]
    ReleaseMismatch {
        node_id: NodeId,
        cpu: Cores,
        memory: MemoryGb,
        reserved_cpu: Cores,
        reserved_memory: MemoryGb,
    },
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),
    #[error("Request {0} not found")]
    RequestNotFound(RequestId),
    #[error("No eligible node for request {0}")]
    NoEligibleNode(RequestId),
    #[error("Solver reported an infeasible model")]
    SolverInfeasible,
    #[error("Solver error: {0}")]
    SolverError(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PlacementError {
    /// Errors that mean the ledger or the model diverged from reality; the run
    /// has to stop.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PlacementError::NoEligibleNode(_) | PlacementError::SolverInfeasible
        )
    }
}
