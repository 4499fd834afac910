use std::time::Duration;

use crate::internal::ledger::Tier;
use crate::internal::request::{Request, RequestRecord};
use crate::{Cores, GroupId, MemoryGb, RequestId};

pub struct RequestBuilder {
    record: RequestRecord,
}

impl RequestBuilder {
    pub fn new(id: u32, tier: Tier, cores: Cores, memory: MemoryGb) -> Self {
        RequestBuilder {
            record: RequestRecord {
                id: RequestId::new(id),
                tier,
                cores,
                memory,
                risk_ceiling: 1.0,
                region: 0,
                lease: Duration::from_secs(3600),
                arrival: Duration::ZERO,
                group: GroupId::new(0),
            },
        }
    }

    pub fn cloud(id: u32, cores: Cores, memory: MemoryGb) -> Self {
        Self::new(id, Tier::Cloud, cores, memory)
    }

    pub fn edge(id: u32, cores: Cores, memory: MemoryGb) -> Self {
        Self::new(id, Tier::Edge, cores, memory)
    }

    pub fn risk_ceiling(mut self, value: f64) -> Self {
        self.record.risk_ceiling = value;
        self
    }

    pub fn region(mut self, value: u32) -> Self {
        self.record.region = value;
        self
    }

    pub fn lease(mut self, value: Duration) -> Self {
        self.record.lease = value;
        self
    }

    pub fn arrival_secs(mut self, secs: u64) -> Self {
        self.record.arrival = Duration::from_secs(secs);
        self
    }

    pub fn group(mut self, value: u32) -> Self {
        self.record.group = GroupId::new(value);
        self
    }

    pub fn finish(self) -> Request {
        self.record.into()
    }
}
