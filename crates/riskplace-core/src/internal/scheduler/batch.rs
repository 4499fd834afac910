use crate::internal::common::error::PlacementError;
use crate::internal::config::{SchedulerConfig, UsageIndicators, Weights};
use crate::internal::core::Core;
use crate::internal::ledger::{ResourceLedger, Tier};
use crate::internal::request::Request;
use crate::internal::scheduler::cost::{CostModel, CostTotals, ObjectiveBreakdown};
use crate::internal::scheduler::eligibility::EligibilityFilter;
use crate::internal::solver::{ConstraintType, LpModel, LpOutcome, LpStatus, Variable};
use crate::{Map, NodeId, RequestId};

/// Decision variable placing one request on one eligible node.
#[derive(Debug, Clone)]
pub struct CandidatePair {
    pub request_id: RequestId,
    pub node_id: NodeId,
    pub variable: Variable,
    tier: Tier,
    cpu: u32,
    memory: u64,
    risk: f64,
    cost: f64,
}

#[derive(Debug, Clone)]
struct UsageIndicator {
    node_id: NodeId,
    variable: Variable,
    activation_cost: f64,
}

/// Assignment model of one batch together with what is needed to read the
/// solver's answer back.
#[derive(Debug, Clone)]
pub struct BatchModel {
    lp: LpModel,
    requests: Vec<RequestId>,
    pairs: Vec<CandidatePair>,
    indicators: Vec<UsageIndicator>,
    unplaceable: Vec<RequestId>,
    scales: CostTotals,
    weights: Weights,
}

/// Result of an optimal batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchAssignment {
    /// One node per request of the batch, in batch order.
    pub placements: Vec<(RequestId, NodeId)>,
    pub breakdown: ObjectiveBreakdown,
    pub objective: f64,
}

impl BatchModel {
    #[inline]
    pub fn lp(&self) -> &LpModel {
        &self.lp
    }

    #[inline]
    pub fn pairs(&self) -> &[CandidatePair] {
        &self.pairs
    }

    #[inline]
    pub fn n_indicators(&self) -> usize {
        self.indicators.len()
    }

    /// Requests without any eligible node.
    #[inline]
    pub fn unplaceable(&self) -> &[RequestId] {
        &self.unplaceable
    }

    /// A request without candidates makes its unicity constraint unsatisfiable,
    /// so the model is infeasible without consulting the solver.
    #[inline]
    pub fn is_trivially_infeasible(&self) -> bool {
        !self.unplaceable.is_empty()
    }

    pub fn interpret(&self, outcome: &LpOutcome) -> crate::Result<BatchAssignment> {
        match &outcome.status {
            LpStatus::Optimal => {}
            LpStatus::Infeasible => return Err(PlacementError::SolverInfeasible),
            LpStatus::Failed(message) => return Err(PlacementError::SolverError(message.clone())),
        }
        let value = |var: Variable| {
            outcome.is_set(var).ok_or_else(|| {
                PlacementError::SolverError(format!(
                    "solution has no value for variable {}",
                    var.index()
                ))
            })
        };

        let mut chosen: Map<RequestId, NodeId> =
            Map::with_capacity_and_hasher(self.requests.len(), Default::default());
        let mut totals = self.scales;
        for pair in &self.pairs {
            if !value(pair.variable)? {
                continue;
            }
            if let Some(other) = chosen.insert(pair.request_id, pair.node_id) {
                return Err(PlacementError::SolverError(format!(
                    "request {} assigned to both node {other} and node {}",
                    pair.request_id, pair.node_id
                )));
            }
            totals.add_placement(pair.tier, pair.risk, pair.cost);
        }
        for indicator in &self.indicators {
            if value(indicator.variable)? {
                log::trace!("Batch uses node {}", indicator.node_id);
                totals.activation += indicator.activation_cost;
            }
        }

        let placements = self
            .requests
            .iter()
            .map(|r| {
                chosen.get(r).map(|n| (*r, *n)).ok_or_else(|| {
                    PlacementError::SolverError(format!("request {r} was not assigned"))
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;
        let breakdown = totals.breakdown();
        Ok(BatchAssignment {
            placements,
            objective: breakdown.objective(self.weights),
            breakdown,
        })
    }
}

/// Turns a batch of requests into a 0/1 assignment model.
pub struct BatchFormulator<'a> {
    config: &'a SchedulerConfig,
    filter: &'a EligibilityFilter,
    cost: CostModel,
}

impl<'a> BatchFormulator<'a> {
    pub fn new(core: &'a Core) -> Self {
        BatchFormulator {
            config: core.config(),
            filter: core.filter(),
            cost: CostModel::new(core.config(), core.ledger()),
        }
    }

    fn has_indicator(&self, tier: Tier) -> bool {
        match self.config.usage_indicators {
            UsageIndicators::CloudOnly => tier == Tier::Cloud,
            UsageIndicators::AllTiers => true,
        }
    }

    fn scales(&self, ledger: &ResourceLedger, requests: &[Request]) -> CostTotals {
        let mut scales = CostTotals {
            activation_scale: self.cost.activation_scale(),
            ..Default::default()
        };
        for tier in Tier::ALL {
            scales.add_scale(tier, self.cost.risk_scale(tier), 0.0);
        }
        for request in requests {
            scales.add_scale(
                request.tier(),
                0.0,
                self.cost.worst_assignment_cost(request, ledger),
            );
        }
        scales
    }

    pub fn formulate(&self, ledger: &ResourceLedger, requests: &[Request]) -> BatchModel {
        let weights = self.config.weights;
        let scales = self.scales(ledger, requests);
        let breakdown_unit = |value: f64, scale: f64, parts: f64| {
            if scale > 0.0 {
                value / (scale * parts)
            } else {
                0.0
            }
        };

        let mut lp = LpModel::new();
        let mut pairs = Vec::new();
        let mut unplaceable = Vec::new();
        let mut per_node: Map<NodeId, Vec<usize>> = Map::default();

        for request in requests {
            let eligible = self.filter.eligible_nodes(request, ledger);
            if eligible.is_empty() {
                self.filter.log_no_eligible(request, ledger);
                unplaceable.push(request.id());
                continue;
            }
            let tier_scale = match request.tier() {
                Tier::Cloud => (scales.risk_scale[0], scales.electricity_scale[0]),
                Tier::Edge => (scales.risk_scale[1], scales.electricity_scale[1]),
            };
            let first = pairs.len();
            for node_id in eligible {
                let Ok(node) = ledger.node(node_id) else {
                    continue;
                };
                let risk = node.risk();
                let cost = self.cost.assignment_cost(request, node);
                let weight = weights.risk * breakdown_unit(risk, tier_scale.0, 2.0)
                    + weights.electricity * breakdown_unit(cost, tier_scale.1, 3.0);
                lp.set_name(|| format!("x_{}_{}", request.id(), node_id));
                let variable = lp.add_bool_variable(weight);
                per_node.entry(node_id).or_default().push(pairs.len());
                pairs.push(CandidatePair {
                    request_id: request.id(),
                    node_id,
                    variable,
                    tier: request.tier(),
                    cpu: request.cpu(),
                    memory: request.memory(),
                    risk,
                    cost,
                });
            }
            lp.set_name(|| format!("unicity_{}", request.id()));
            lp.add_constraint(
                ConstraintType::Eq,
                1.0,
                pairs[first..].iter().map(|p| (p.variable, 1.0)),
            );
        }

        let mut indicators = Vec::new();
        for node in ledger.nodes() {
            let Some(candidates) = per_node.get(&node.id()) else {
                continue;
            };
            lp.set_name(|| format!("cpu_{}", node.id()));
            lp.add_max_constraint(
                f64::from(node.available_cpu()),
                candidates
                    .iter()
                    .map(|&i| (pairs[i].variable, f64::from(pairs[i].cpu))),
            );
            lp.set_name(|| format!("memory_{}", node.id()));
            lp.add_max_constraint(
                node.available_memory() as f64,
                candidates
                    .iter()
                    .map(|&i| (pairs[i].variable, pairs[i].memory as f64)),
            );

            if !self.has_indicator(node.tier()) {
                continue;
            }
            let activation_cost = self.cost.activation_cost(node);
            lp.set_name(|| format!("y_{}", node.id()));
            let y = lp.add_bool_variable(
                weights.electricity
                    * breakdown_unit(activation_cost, scales.activation_scale, 3.0),
            );
            let big_m = candidates.len() as f64;
            lp.set_name(|| format!("usage_upper_{}", node.id()));
            lp.add_max_constraint(
                0.0,
                candidates
                    .iter()
                    .map(|&i| (pairs[i].variable, 1.0))
                    .chain(std::iter::once((y, -big_m))),
            );
            lp.set_name(|| format!("usage_lower_{}", node.id()));
            lp.add_min_constraint(
                0.0,
                candidates
                    .iter()
                    .map(|&i| (pairs[i].variable, 1.0))
                    .chain(std::iter::once((y, -1.0))),
            );
            indicators.push(UsageIndicator {
                node_id: node.id(),
                variable: y,
                activation_cost,
            });
        }

        log::debug!(
            "Batch model: {} request(s), {} variable(s), {} constraint(s), {} unplaceable",
            requests.len(),
            lp.n_variables(),
            lp.n_constraints(),
            unplaceable.len()
        );
        log::trace!("Batch model:\n{lp}");

        BatchModel {
            lp,
            requests: requests.iter().map(|r| r.id()).collect(),
            pairs,
            indicators,
            unplaceable,
            scales,
            weights,
        }
    }
}
