use crate::internal::ledger::Tier;
use crate::{Cores, GroupId, MemoryGb, RequestId, SimTime};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parsed description of a pod, as delivered by the workload loader.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub id: RequestId,
    pub tier: Tier,
    pub cores: Cores,
    pub memory: MemoryGb,
    /// Highest node risk the pod accepts.
    pub risk_ceiling: f64,
    /// Required region, 0 means any.
    #[serde(default)]
    pub region: u32,
    pub lease: Duration,
    pub arrival: SimTime,
    pub group: GroupId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    id: RequestId,
    tier: Tier,
    cpu: Cores,
    memory: MemoryGb,
    risk_ceiling: f64,
    region: u32,
    lease: Duration,
    arrival: SimTime,
    group: GroupId,
}

impl From<RequestRecord> for Request {
    fn from(record: RequestRecord) -> Self {
        Request {
            id: record.id,
            tier: record.tier,
            cpu: record.cores,
            memory: record.memory,
            risk_ceiling: record.risk_ceiling,
            region: record.region,
            lease: record.lease,
            arrival: record.arrival,
            group: record.group,
        }
    }
}

impl Request {
    #[inline]
    pub fn id(&self) -> RequestId {
        self.id
    }

    #[inline]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    #[inline]
    pub fn cpu(&self) -> Cores {
        self.cpu
    }

    #[inline]
    pub fn memory(&self) -> MemoryGb {
        self.memory
    }

    #[inline]
    pub fn risk_ceiling(&self) -> f64 {
        self.risk_ceiling
    }

    #[inline]
    pub fn region(&self) -> u32 {
        self.region
    }

    #[inline]
    pub fn accepts_any_region(&self) -> bool {
        self.region == 0
    }

    #[inline]
    pub fn lease(&self) -> Duration {
        self.lease
    }

    #[inline]
    pub fn arrival(&self) -> SimTime {
        self.arrival
    }

    #[inline]
    pub fn group(&self) -> GroupId {
        self.group
    }
}
