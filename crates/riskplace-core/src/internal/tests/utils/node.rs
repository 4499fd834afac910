use derive_builder::Builder;

use crate::internal::ledger::{NodeRecord, Tier};
use crate::{Cores, MemoryGb};

#[derive(Builder, Clone)]
#[builder(pattern = "owned", name = "NodeBuilder")]
pub struct NodeConfig {
    tier: Tier,
    cores: Cores,
    memory: MemoryGb,
    #[builder(default = "0.1")]
    risk: f64,
    #[builder(default = "1")]
    region: u32,
    #[builder(default = "0.2")]
    price: f64,
    #[builder(default = "200.0")]
    power: f64,
    #[builder(default)]
    activation: bool,
}

impl NodeBuilder {
    pub fn cloud(cores: Cores, memory: MemoryGb) -> Self {
        NodeBuilder::default()
            .tier(Tier::Cloud)
            .cores(cores)
            .memory(memory)
    }

    pub fn edge(cores: Cores, memory: MemoryGb) -> Self {
        NodeBuilder::default()
            .tier(Tier::Edge)
            .cores(cores)
            .memory(memory)
    }

    pub fn finish(self) -> NodeRecord {
        let config = self.build().unwrap();
        NodeRecord {
            tier: config.tier,
            cores: config.cores,
            memory: config.memory,
            power: config.power,
            risk: config.risk,
            region: config.region,
            price: config.price,
            activation: config.activation,
        }
    }
}
