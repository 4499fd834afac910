use crate::{Cores, MemoryGb, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Cloud,
    Edge,
}

impl Tier {
    pub const ALL: [Tier; 2] = [Tier::Cloud, Tier::Edge];
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Tier::Cloud => "cloud",
            Tier::Edge => "edge",
        })
    }
}

/// Parsed description of a node, as delivered by the infrastructure loader.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeRecord {
    #[serde(rename = "type")]
    pub tier: Tier,
    pub cores: Cores,
    pub memory: MemoryGb,
    /// Power draw in W.
    pub power: f64,
    pub risk: f64,
    pub region: u32,
    /// Electricity price per kWh.
    pub price: f64,
    /// Node is already awake when the run starts; waking it costs nothing.
    #[serde(default)]
    pub activation: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    tier: Tier,
    total_cpu: Cores,
    available_cpu: Cores,
    total_memory: MemoryGb,
    available_memory: MemoryGb,
    price: f64,
    power: f64,
    risk: f64,
    region: u32,
    active: bool,
}

impl Node {
    pub(crate) fn new(id: NodeId, record: NodeRecord) -> Self {
        Node {
            id,
            tier: record.tier,
            total_cpu: record.cores,
            available_cpu: record.cores,
            total_memory: record.memory,
            available_memory: record.memory,
            price: record.price,
            power: record.power,
            risk: record.risk,
            region: record.region,
            active: record.activation,
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    #[inline]
    pub fn is_cloud(&self) -> bool {
        self.tier == Tier::Cloud
    }

    #[inline]
    pub fn total_cpu(&self) -> Cores {
        self.total_cpu
    }

    #[inline]
    pub fn available_cpu(&self) -> Cores {
        self.available_cpu
    }

    #[inline]
    pub fn total_memory(&self) -> MemoryGb {
        self.total_memory
    }

    #[inline]
    pub fn available_memory(&self) -> MemoryGb {
        self.available_memory
    }

    #[inline]
    pub fn price(&self) -> f64 {
        self.price
    }

    #[inline]
    pub fn power(&self) -> f64 {
        self.power
    }

    /// Power draw in kW.
    #[inline]
    pub fn power_kw(&self) -> f64 {
        self.power / 1000.0
    }

    #[inline]
    pub fn risk(&self) -> f64 {
        self.risk
    }

    #[inline]
    pub fn region(&self) -> u32 {
        self.region
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn has_free(&self, cpu: Cores, memory: MemoryGb) -> bool {
        self.available_cpu >= cpu && self.available_memory >= memory
    }

    /// Nothing is reserved on the node.
    #[inline]
    pub fn is_drained(&self) -> bool {
        self.available_cpu == self.total_cpu && self.available_memory == self.total_memory
    }

    #[inline]
    pub fn reserved_cpu(&self) -> Cores {
        self.total_cpu - self.available_cpu
    }

    #[inline]
    pub fn reserved_memory(&self) -> MemoryGb {
        self.total_memory - self.available_memory
    }

    pub(crate) fn take(&mut self, cpu: Cores, memory: MemoryGb) {
        debug_assert!(self.has_free(cpu, memory));
        self.available_cpu -= cpu;
        self.available_memory -= memory;
    }

    pub(crate) fn give_back(&mut self, cpu: Cores, memory: MemoryGb) {
        debug_assert!(cpu <= self.reserved_cpu() && memory <= self.reserved_memory());
        self.available_cpu += cpu;
        self.available_memory += memory;
    }

    pub(crate) fn set_active(&mut self, value: bool) {
        self.active = value;
    }
}
