use crate::NodeId;
use crate::internal::config::{EdgeActivation, EligibilityConfig};
use crate::internal::ledger::{Node, ResourceLedger, Tier};
use crate::internal::request::Request;
use smallvec::SmallVec;

pub type EligibleNodes = SmallVec<[NodeId; 8]>;

/// First clause of the eligibility relation a node fails for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    TierMismatch,
    RiskTooHigh,
    RegionMismatch,
    ActivationMismatch,
}

/// Decides which nodes may host a request.
///
/// The relation depends on the live activation flags, so results must not be
/// kept across ledger mutations.
#[derive(Debug, Clone, Copy, Default)]
pub struct EligibilityFilter {
    config: EligibilityConfig,
}

impl EligibilityFilter {
    pub fn new(config: EligibilityConfig) -> Self {
        EligibilityFilter { config }
    }

    pub fn check(&self, request: &Request, node: &Node) -> Result<(), Ineligibility> {
        if node.tier() != request.tier() {
            return Err(Ineligibility::TierMismatch);
        }
        if !self
            .config
            .risk_comparison
            .accepts(node.risk(), request.risk_ceiling())
        {
            return Err(Ineligibility::RiskTooHigh);
        }
        if !request.accepts_any_region() && request.region() != node.region() {
            return Err(Ineligibility::RegionMismatch);
        }
        let activation_ok = match (request.tier(), self.config.edge_activation) {
            (Tier::Cloud, _) => true,
            (Tier::Edge, EdgeActivation::AlwaysActive) => true,
            (Tier::Edge, EdgeActivation::Exclusive) => !node.is_active(),
        };
        if !activation_ok {
            return Err(Ineligibility::ActivationMismatch);
        }
        Ok(())
    }

    #[inline]
    pub fn is_eligible(&self, request: &Request, node: &Node) -> bool {
        self.check(request, node).is_ok()
    }

    /// Eligible nodes in ledger order. Residual capacity is not part of the
    /// relation.
    pub fn eligible_nodes(&self, request: &Request, ledger: &ResourceLedger) -> EligibleNodes {
        ledger
            .nodes()
            .filter(|n| self.is_eligible(request, n))
            .map(|n| n.id())
            .collect()
    }

    pub fn explain(
        &self,
        request: &Request,
        ledger: &ResourceLedger,
    ) -> Vec<(NodeId, Ineligibility)> {
        ledger
            .nodes()
            .filter_map(|n| self.check(request, n).err().map(|e| (n.id(), e)))
            .collect()
    }

    /// Logs why no node can take the request.
    pub(crate) fn log_no_eligible(&self, request: &Request, ledger: &ResourceLedger) {
        let reasons = self.explain(request, ledger);
        let count = |kind| reasons.iter().filter(|(_, r)| *r == kind).count();
        log::debug!(
            "Request {} ({}, ceiling {}, region {}) has no eligible node: tier {}, risk {}, region {}, activation {}",
            request.id(),
            request.tier(),
            request.risk_ceiling(),
            request.region(),
            count(Ineligibility::TierMismatch),
            count(Ineligibility::RiskTooHigh),
            count(Ineligibility::RegionMismatch),
            count(Ineligibility::ActivationMismatch),
        );
    }
}
