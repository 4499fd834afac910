use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use riskplace_core::config::NormalizationConfig;
use riskplace_core::ledger::Tier;
use riskplace_core::request::{Request, RequestRecord};
use riskplace_core::{GroupId, RequestId, duration_from_hours, hours};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PodTemplate {
    pub cores: u32,
    pub memory: u64,
    pub risk_ceiling: f64,
    pub lease_hours: f64,
}

impl Default for PodTemplate {
    fn default() -> Self {
        PodTemplate {
            cores: 4,
            memory: 4,
            risk_ceiling: 1.0,
            lease_hours: 24.0,
        }
    }
}

impl PodTemplate {
    /// A cloud pod taking a whole default cloud node.
    pub fn heavy() -> Self {
        PodTemplate {
            cores: 128,
            memory: 128,
            ..Default::default()
        }
    }
}

/// Shape of the pods of every generated group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadTemplate {
    pub cloud: PodTemplate,
    /// Replaces `cloud` for a `heavy_share` fraction of the cloud pods.
    pub heavy: PodTemplate,
    pub heavy_share: f64,
    pub edge: PodTemplate,
    /// Regions a cloud pod may be pinned to.
    pub regions: Vec<u32>,
    /// Region of the user; edge pods always run there.
    pub user_region: u32,
}

impl Default for WorkloadTemplate {
    fn default() -> Self {
        WorkloadTemplate {
            cloud: PodTemplate::default(),
            heavy: PodTemplate::heavy(),
            heavy_share: 0.1,
            edge: PodTemplate::default(),
            regions: vec![1, 2, 3, 4, 5],
            user_region: 4,
        }
    }
}

impl WorkloadTemplate {
    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..=1.0).contains(&self.heavy_share) {
            return Err(crate::Error::InvalidInput(format!(
                "heavy share must lie in [0, 1], got {}",
                self.heavy_share
            )));
        }
        Ok(())
    }
}

/// Arrival times of a Poisson process with `rate` arrivals per hour on
/// `[0, until]`.
pub fn poisson_arrivals(rng: &mut impl Rng, rate: f64, until: Duration) -> Vec<Duration> {
    let limit = hours(until);
    let mut arrivals = Vec::new();
    let mut now = 0.0;
    loop {
        // Inverse transform of the exponential distribution; 1 - u lies in (0, 1].
        let u: f64 = rng.random();
        now += -(1.0 - u).ln() / rate;
        if now > limit {
            break;
        }
        arrivals.push(duration_from_hours(now));
    }
    arrivals
}

pub struct WorkloadGenerator<'a> {
    template: &'a WorkloadTemplate,
    normalization: &'a NormalizationConfig,
    rng: SmallRng,
    next_id: u32,
}

impl<'a> WorkloadGenerator<'a> {
    pub fn new(
        template: &'a WorkloadTemplate,
        normalization: &'a NormalizationConfig,
        seed: u64,
    ) -> Self {
        WorkloadGenerator {
            template,
            normalization,
            rng: SmallRng::seed_from_u64(seed),
            next_id: 1,
        }
    }

    fn cloud_region(&mut self) -> u32 {
        // Half of the cloud pods accept any region.
        if self.template.regions.is_empty() || self.rng.random_bool(0.5) {
            return 0;
        }
        let idx = self.rng.random_range(0..self.template.regions.len());
        self.template.regions[idx]
    }

    fn pod(&mut self, tier: Tier, group: GroupId, arrival: Duration) -> Request {
        let (template, region) = match tier {
            Tier::Cloud => {
                let region = self.cloud_region();
                if self.rng.random_bool(self.template.heavy_share.clamp(0.0, 1.0)) {
                    (&self.template.heavy, region)
                } else {
                    (&self.template.cloud, region)
                }
            }
            Tier::Edge => (&self.template.edge, self.template.user_region),
        };
        let id = RequestId::new(self.next_id);
        self.next_id += 1;
        RequestRecord {
            id,
            tier,
            cores: template.cores,
            memory: template.memory,
            risk_ceiling: template.risk_ceiling,
            region,
            lease: duration_from_hours(template.lease_hours),
            arrival,
            group,
        }
        .into()
    }

    /// One group per arrival, each with the configured number of cloud and
    /// edge pods.
    pub fn generate(&mut self, rate: f64, until: Duration) -> Vec<Request> {
        let arrivals = poisson_arrivals(&mut self.rng, rate, until);
        let mut requests = Vec::new();
        for (idx, arrival) in arrivals.into_iter().enumerate() {
            let group = GroupId::new(idx as u32 + 1);
            for _ in 0..self.normalization.cloud_pods_per_group {
                requests.push(self.pod(Tier::Cloud, group, arrival));
            }
            for _ in 0..self.normalization.edge_pods_per_group {
                requests.push(self.pod(Tier::Edge, group, arrival));
            }
        }
        log::debug!(
            "Generated {} pod(s) in {} group(s)",
            requests.len(),
            requests.last().map_or(0, |r| r.group().as_num())
        );
        requests
    }
}
