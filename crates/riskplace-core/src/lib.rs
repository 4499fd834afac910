#![deny(clippy::await_holding_refcell_ref)]

#[macro_use]
pub mod internal;

pub use crate::internal::common::WrappedRcRefCell;
pub use crate::internal::common::ids::{AllocationId, GroupId, NodeId, RequestId};
pub use crate::internal::common::time::{SimTime, duration_from_hours, hours};
pub use crate::internal::common::{Map, Set};

pub use crate::internal::core::Core;

pub type Error = internal::common::error::PlacementError;
pub type Result<T> = std::result::Result<T, Error>;

/// Number of CPU cores.
pub type Cores = u32;
/// Amount of main memory in GB.
pub type MemoryGb = u64;

pub mod config {
    pub use crate::internal::config::{
        EdgeActivation, EligibilityConfig, NormalizationConfig, RetryPolicy, RiskComparison,
        SchedulerConfig, UsageIndicators, Weights,
    };
}

pub mod ledger {
    pub use crate::internal::ledger::{Node, NodeRecord, ResourceLedger, Tier};
}

pub mod request {
    pub use crate::internal::request::{Request, RequestQueue, RequestRecord};
}

pub mod scheduler {
    pub use crate::internal::scheduler::batch::{
        BatchAssignment, BatchFormulator, BatchModel, CandidatePair,
    };
    pub use crate::internal::scheduler::cost::{CostModel, ObjectiveBreakdown};
    pub use crate::internal::scheduler::eligibility::{
        EligibilityFilter, EligibleNodes, Ineligibility,
    };
    pub use crate::internal::scheduler::greedy::{GreedyCore, GreedyMetrics, GreedyScheduler};
    pub use crate::internal::scheduler::pass::{BatchScheduler, PassReport};
    pub use crate::internal::scheduler::repair::{RepairOutcome, solve_with_shedding};
}

pub mod solver {
    pub use crate::internal::solver::microlp::MicrolpBackend;
    pub use crate::internal::solver::{
        ConstraintType, LpBackend, LpModel, LpOutcome, LpStatus, Variable,
    };
}

pub mod lifecycle {
    pub use crate::internal::lifecycle::{Allocation, AllocationLifecycle, Reclaimed};
}

pub mod clock {
    pub use crate::internal::clock::{SimClock, TokioClock};
}
