use crate::internal::config::{NormalizationConfig, SchedulerConfig, Weights};
use crate::internal::ledger::{Node, ResourceLedger, Tier};
use crate::internal::request::Request;
use serde::Serialize;

#[inline]
fn tier_idx(tier: Tier) -> usize {
    match tier {
        Tier::Cloud => 0,
        Tier::Edge => 1,
    }
}

#[inline]
fn ratio(value: f64, scale: f64) -> f64 {
    if scale > 0.0 { value / scale } else { 0.0 }
}

/// Raw cost figures of an infrastructure: risk and electricity of a single
/// placement, wake-up cost of a node, and the infrastructure maxima used to
/// normalize them.
///
/// The maxima are taken once, at construction, from the static node
/// attributes; they do not depend on the current occupancy.
#[derive(Debug, Clone)]
pub struct CostModel {
    weights: Weights,
    normalization: NormalizationConfig,
    max_risk: [f64; 2],
    max_price: f64,
    n_cloud: usize,
    activation_scale: f64,
}

impl CostModel {
    pub fn new(config: &SchedulerConfig, ledger: &ResourceLedger) -> Self {
        let max_price = ledger.max_price();
        let share = config.normalization.cloud_power_share;
        let activation_scale = ledger
            .nodes_of_tier(Tier::Cloud)
            .map(|n| share * n.power_kw() * max_price)
            .sum();
        CostModel {
            weights: config.weights,
            normalization: config.normalization,
            max_risk: [ledger.max_risk(Tier::Cloud), ledger.max_risk(Tier::Edge)],
            max_price,
            n_cloud: ledger.count(Tier::Cloud),
            activation_scale,
        }
    }

    #[inline]
    fn pods_per_group(&self, tier: Tier) -> f64 {
        f64::from(match tier {
            Tier::Cloud => self.normalization.cloud_pods_per_group,
            Tier::Edge => self.normalization.edge_pods_per_group,
        })
    }

    #[inline]
    fn power_share(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Cloud => self.normalization.cloud_power_share,
            Tier::Edge => self.normalization.edge_power_share,
        }
    }

    #[inline]
    pub fn max_risk(&self, tier: Tier) -> f64 {
        self.max_risk[tier_idx(tier)]
    }

    /// Risk denominator of a tier: the risk of a full group placed on the
    /// riskiest node of the tier.
    #[inline]
    pub fn risk_scale(&self, tier: Tier) -> f64 {
        self.pods_per_group(tier) * self.max_risk(tier)
    }

    /// Sum of wake-up costs of all cloud nodes at the highest price.
    #[inline]
    pub fn activation_scale(&self) -> f64 {
        self.activation_scale
    }

    /// Electricity cost of running the request on the node, proportional to
    /// the share of the node cores it takes.
    pub fn assignment_cost(&self, request: &Request, node: &Node) -> f64 {
        if node.total_cpu() == 0 {
            return 0.0;
        }
        self.power_share(node.tier()) * node.power_kw() * node.price() * f64::from(request.cpu())
            / f64::from(node.total_cpu())
    }

    /// One-time cost of waking the node; only cloud nodes have one, and only
    /// while they are off.
    pub fn activation_cost(&self, node: &Node) -> f64 {
        if !node.is_cloud() || node.is_active() {
            return 0.0;
        }
        self.normalization.cloud_power_share * node.power_kw() * node.price()
    }

    /// Electricity cost of running the request on a node of its tier at the
    /// highest price of the infrastructure; the worst over the tier's nodes.
    pub fn worst_assignment_cost(&self, request: &Request, ledger: &ResourceLedger) -> f64 {
        let share = self.power_share(request.tier());
        ledger
            .nodes_of_tier(request.tier())
            .filter(|n| n.total_cpu() > 0)
            .map(|n| {
                share * n.power_kw() * self.max_price * f64::from(request.cpu())
                    / f64::from(n.total_cpu())
            })
            .fold(0.0, f64::max)
    }

    /// Ranking key of the greedy scheduler; lower is better.
    pub fn greedy_score(&self, node: &Node) -> f64 {
        let tier = node.tier();
        let pods = self.pods_per_group(tier);
        let risk = ratio(node.risk(), 2.0 * pods * self.max_risk(tier));
        let price = ratio(node.price(), 3.0 * pods * self.max_price);
        let penalty = if node.is_cloud() && !node.is_active() {
            ratio(node.price(), 3.0 * self.n_cloud as f64 * self.max_price)
        } else {
            0.0
        };
        self.weights.risk * risk + self.weights.electricity * (price + penalty)
    }
}

/// Normalized objective components of a set of placements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ObjectiveBreakdown {
    pub risk_cloud: f64,
    pub risk_edge: f64,
    pub electricity_cloud: f64,
    pub electricity_edge: f64,
    pub electricity_activation: f64,
}

impl ObjectiveBreakdown {
    #[inline]
    pub fn risk(&self) -> f64 {
        (self.risk_cloud + self.risk_edge) / 2.0
    }

    #[inline]
    pub fn electricity(&self) -> f64 {
        (self.electricity_cloud + self.electricity_edge + self.electricity_activation) / 3.0
    }

    #[inline]
    pub fn objective(&self, weights: Weights) -> f64 {
        weights.risk * self.risk() + weights.electricity * self.electricity()
    }
}

/// Raw totals together with the matching denominators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub(crate) struct CostTotals {
    pub risk: [f64; 2],
    pub risk_scale: [f64; 2],
    pub electricity: [f64; 2],
    pub electricity_scale: [f64; 2],
    pub activation: f64,
    pub activation_scale: f64,
}

impl CostTotals {
    pub fn add_placement(&mut self, tier: Tier, risk: f64, electricity: f64) {
        let t = tier_idx(tier);
        self.risk[t] += risk;
        self.electricity[t] += electricity;
    }

    pub fn add_scale(&mut self, tier: Tier, risk_scale: f64, electricity_scale: f64) {
        let t = tier_idx(tier);
        self.risk_scale[t] += risk_scale;
        self.electricity_scale[t] += electricity_scale;
    }

    pub fn breakdown(&self) -> ObjectiveBreakdown {
        ObjectiveBreakdown {
            risk_cloud: ratio(self.risk[0], self.risk_scale[0]),
            risk_edge: ratio(self.risk[1], self.risk_scale[1]),
            electricity_cloud: ratio(self.electricity[0], self.electricity_scale[0]),
            electricity_edge: ratio(self.electricity[1], self.electricity_scale[1]),
            electricity_activation: ratio(self.activation, self.activation_scale),
        }
    }
}
