pub mod batch;
pub mod greedy;
pub mod sweep;
pub mod timeout;

use riskplace_core::Core;

/// Releases every remaining allocation and checks that reservations and
/// releases cancel out.
pub fn drain_and_check(core: &mut Core) -> crate::Result<bool> {
    let drained = core.drain()?;
    let conserved = core.lifecycle().live_count() == 0
        && core.ledger().total_reserved() == (0, 0)
        && core.is_consistent();
    if conserved {
        log::debug!("Drained {} allocation(s), ledger conserved", drained.len());
    } else {
        log::warn!(
            "Ledger not conserved after draining {} allocation(s)",
            drained.len()
        );
    }
    Ok(conserved)
}

#[cfg(test)]
pub(crate) mod tests {
    use riskplace_core::config::SchedulerConfig;
    use riskplace_core::ledger::{NodeRecord, ResourceLedger, Tier};
    use riskplace_core::request::{Request, RequestRecord};
    use riskplace_core::{Core, GroupId, RequestId, duration_from_hours};

    pub fn node(tier: Tier, cores: u32, memory: u64, risk: f64, price: f64) -> NodeRecord {
        NodeRecord {
            tier,
            cores,
            memory,
            power: 200.0,
            risk,
            region: 1,
            price,
            activation: false,
        }
    }

    /// One 8-core cloud node of risk 0.2 and one 4-core edge node of risk 0.5.
    pub fn small_core() -> Core {
        let ledger = ResourceLedger::new([
            node(Tier::Cloud, 8, 16, 0.2, 0.2),
            node(Tier::Edge, 4, 4, 0.5, 0.1),
        ]);
        Core::new(SchedulerConfig::default(), ledger).unwrap()
    }

    pub fn pod(tier: Tier, id: u32, group: u32, arrival_hours: f64, ceiling: f64) -> Request {
        RequestRecord {
            id: RequestId::new(id),
            tier,
            cores: 2,
            memory: 2,
            risk_ceiling: ceiling,
            region: 0,
            lease: duration_from_hours(1.0),
            arrival: duration_from_hours(arrival_hours),
            group: GroupId::new(group),
        }
        .into()
    }

    pub fn cloud_pod(id: u32, group: u32, arrival_hours: f64, ceiling: f64) -> Request {
        pod(Tier::Cloud, id, group, arrival_hours, ceiling)
    }

    pub fn edge_pod(id: u32, group: u32, arrival_hours: f64, ceiling: f64) -> Request {
        pod(Tier::Edge, id, group, arrival_hours, ceiling)
    }

    #[test]
    fn test_drain_restores_ledger() {
        let mut core = small_core();
        let request = cloud_pod(1, 1, 0.0, 1.0);
        let node_id = core.ledger().nodes().next().unwrap().id();
        core.admit(request, node_id, duration_from_hours(0.0)).unwrap();
        assert_eq!(core.lifecycle().live_count(), 1);
        assert!(super::drain_and_check(&mut core).unwrap());
        assert_eq!(core.lifecycle().live_count(), 0);
    }
}
