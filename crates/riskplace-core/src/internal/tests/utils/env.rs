use crate::internal::config::SchedulerConfig;
use crate::internal::core::Core;
use crate::internal::ledger::{Node, NodeRecord, ResourceLedger};
use crate::NodeId;

pub struct TestEnv {
    core: Core,
}

impl TestEnv {
    pub fn new(nodes: Vec<NodeRecord>) -> TestEnv {
        Self::with_config(SchedulerConfig::default(), nodes)
    }

    pub fn with_config(config: SchedulerConfig, nodes: Vec<NodeRecord>) -> TestEnv {
        TestEnv {
            core: Core::new(config, ResourceLedger::new(nodes)).unwrap(),
        }
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    pub fn into_core(self) -> Core {
        self.core
    }

    pub fn node(&self, id: u32) -> &Node {
        self.core.ledger().node(NodeId::new(id)).unwrap()
    }

    pub fn check_consistency(&self) {
        assert!(self.core.is_consistent());
    }
}
