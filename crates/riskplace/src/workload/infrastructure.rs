use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use riskplace_core::ledger::{NodeRecord, Tier};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NodeTemplate {
    pub cores: u32,
    pub memory: u64,
    /// Power draw in W.
    pub power: f64,
    /// Upper bound of the security component of the node risk.
    pub security_ceiling: f64,
}

impl NodeTemplate {
    pub fn cloud() -> Self {
        NodeTemplate {
            cores: 128,
            memory: 128,
            power: 392.0,
            security_ceiling: 0.7,
        }
    }

    pub fn edge() -> Self {
        NodeTemplate {
            cores: 4,
            memory: 4,
            power: 4.0,
            security_ceiling: 1.0,
        }
    }
}

impl Default for NodeTemplate {
    fn default() -> Self {
        NodeTemplate::cloud()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RegionTemplate {
    pub id: u32,
    /// Electricity price per kWh before jitter.
    pub price: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RiskModel {
    /// Monte-Carlo samples drawn per tier.
    pub samples: usize,
    /// Weight of the uniform security component.
    pub security_weight: f64,
    /// Weight of the Weibull reliability component.
    pub reliability_weight: f64,
    pub weibull_shape: f64,
    pub weibull_scale: f64,
}

impl Default for RiskModel {
    fn default() -> Self {
        RiskModel {
            samples: 10_000,
            security_weight: 0.5,
            reliability_weight: 0.5,
            weibull_shape: 1.5,
            weibull_scale: 1.0,
        }
    }
}

/// Same cloud and edge node counts in every region.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct InfrastructureTemplate {
    pub regions: Vec<RegionTemplate>,
    pub cloud_per_region: u32,
    pub edge_per_region: u32,
    pub cloud: NodeTemplate,
    pub edge: NodeTemplate,
    /// Each node price is the region price scaled by a uniform factor in
    /// `[1 - jitter, 1 + jitter]`.
    pub price_jitter: f64,
    pub risk: RiskModel,
}

impl Default for RegionTemplate {
    fn default() -> Self {
        RegionTemplate { id: 1, price: 0.0 }
    }
}

impl Default for InfrastructureTemplate {
    fn default() -> Self {
        let prices = [0.0921, 0.1313, 0.1648, 0.2169, 0.2543];
        InfrastructureTemplate {
            regions: prices
                .into_iter()
                .zip(1..)
                .map(|(price, id)| RegionTemplate { id, price })
                .collect(),
            cloud_per_region: 10,
            edge_per_region: 10,
            cloud: NodeTemplate::cloud(),
            edge: NodeTemplate::edge(),
            price_jitter: 0.07,
            risk: RiskModel::default(),
        }
    }
}

impl InfrastructureTemplate {
    pub fn validate(&self) -> crate::Result<()> {
        if self.regions.iter().any(|r| r.id == 0) {
            return Err(crate::Error::InvalidInput(
                "infrastructure regions start at 1".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.price_jitter) {
            return Err(crate::Error::InvalidInput(format!(
                "price jitter must lie in [0, 1), got {}",
                self.price_jitter
            )));
        }
        let risk = &self.risk;
        if risk.samples == 0 || !(risk.weibull_shape > 0.0 && risk.weibull_scale > 0.0) {
            return Err(crate::Error::InvalidInput(
                "risk model needs samples and a positive Weibull shape and scale".into(),
            ));
        }
        Ok(())
    }
}

fn normalize(values: &mut [f64]) {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;
    for v in values.iter_mut() {
        *v = if span > 0.0 { (*v - min) / span } else { 0.0 };
    }
}

/// Risk samples in `[0, 1]`: weighted sum of a uniform security risk and a
/// Weibull reliability risk, min-max normalized.
pub fn risk_samples(rng: &mut impl Rng, model: &RiskModel, security_ceiling: f64) -> Vec<f64> {
    let mut reliability: Vec<f64> = (0..model.samples)
        .map(|_| {
            // Inverse transform; 1 - u lies in (0, 1].
            let u: f64 = rng.random();
            model.weibull_scale * (-(1.0 - u).ln()).powf(1.0 / model.weibull_shape)
        })
        .collect();
    normalize(&mut reliability);
    let mut risk: Vec<f64> = reliability
        .into_iter()
        .map(|reliability| {
            let security = rng.random::<f64>() * security_ceiling;
            model.security_weight * security + model.reliability_weight * reliability
        })
        .collect();
    normalize(&mut risk);
    risk
}

pub struct InfrastructureGenerator<'a> {
    template: &'a InfrastructureTemplate,
    rng: SmallRng,
}

impl<'a> InfrastructureGenerator<'a> {
    pub fn new(template: &'a InfrastructureTemplate, seed: u64) -> Self {
        InfrastructureGenerator {
            template,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn nodes(
        &mut self,
        tier: Tier,
        region: &RegionTemplate,
        samples: &[f64],
        out: &mut Vec<NodeRecord>,
    ) {
        let template = self.template;
        let (node, count) = match tier {
            Tier::Cloud => (&template.cloud, template.cloud_per_region),
            Tier::Edge => (&template.edge, template.edge_per_region),
        };
        let jitter = template.price_jitter;
        for _ in 0..count {
            let risk = if samples.is_empty() {
                0.0
            } else {
                samples[self.rng.random_range(0..samples.len())]
            };
            let factor = 1.0 + jitter * (2.0 * self.rng.random::<f64>() - 1.0);
            out.push(NodeRecord {
                tier,
                cores: node.cores,
                memory: node.memory,
                power: node.power,
                risk: round4(risk),
                region: region.id,
                price: round4(region.price * factor),
                activation: false,
            });
        }
    }

    /// Region by region, the cloud nodes followed by the edge nodes. Every
    /// node starts inactive.
    pub fn generate(&mut self) -> Vec<NodeRecord> {
        let template = self.template;
        let risk = &template.risk;
        let cloud_risk = risk_samples(&mut self.rng, risk, template.cloud.security_ceiling);
        let edge_risk = risk_samples(&mut self.rng, risk, template.edge.security_ceiling);
        let per_region = (template.cloud_per_region + template.edge_per_region) as usize;
        let mut nodes = Vec::with_capacity(per_region * template.regions.len());
        for region in &template.regions {
            self.nodes(Tier::Cloud, region, &cloud_risk, &mut nodes);
            self.nodes(Tier::Edge, region, &edge_risk, &mut nodes);
        }
        log::debug!(
            "Generated {} node(s) in {} region(s)",
            nodes.len(),
            template.regions.len()
        );
        nodes
    }
}

fn round4(value: f64) -> f64 {
    (value * 1e4).round() / 1e4
}
