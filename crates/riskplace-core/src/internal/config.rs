use crate::internal::common::error::PlacementError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Weights of the two normalized objective terms.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Weights {
    pub risk: f64,
    pub electricity: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            risk: 0.5,
            electricity: 0.5,
        }
    }
}

impl Weights {
    /// Weights for a point of a Pareto sweep; the electricity weight is the complement.
    pub fn from_risk(risk: f64) -> Self {
        Weights {
            risk,
            electricity: 1.0 - risk,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RiskComparison {
    /// Node risk must not exceed the request ceiling.
    #[default]
    AtMost,
    /// Node risk must be strictly below the request ceiling.
    Below,
}

impl RiskComparison {
    #[inline]
    pub fn accepts(self, node_risk: f64, ceiling: f64) -> bool {
        match self {
            RiskComparison::AtMost => node_risk <= ceiling,
            RiskComparison::Below => node_risk < ceiling,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeActivation {
    /// Edge nodes are logically always active and may host several pods.
    #[default]
    AlwaysActive,
    /// An edge node accepts new pods only while its activation flag is off.
    Exclusive,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct EligibilityConfig {
    pub risk_comparison: RiskComparison,
    pub edge_activation: EdgeActivation,
}

/// Which nodes get a binary usage indicator in the batch model.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UsageIndicators {
    #[default]
    CloudOnly,
    AllTiers,
}

/// Constants of the normalization of the objective terms.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Expected number of cloud pods in one request group.
    pub cloud_pods_per_group: u32,
    /// Expected number of edge pods in one request group.
    pub edge_pods_per_group: u32,
    /// Fraction of the cloud node power attributed to compute.
    pub cloud_power_share: f64,
    pub edge_power_share: f64,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        NormalizationConfig {
            cloud_pods_per_group: 1,
            edge_pods_per_group: 1,
            cloud_power_share: 0.5,
            edge_power_share: 1.0,
        }
    }
}

/// Backoff of the greedy scheduler when no node can take a request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            base: Duration::from_secs(6 * 60),
            max: Duration::from_secs(60 * 60),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows `failures` consecutive failed attempts.
    pub fn delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |d| d.min(self.max))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(default)]
pub struct SchedulerConfig {
    pub weights: Weights,
    pub eligibility: EligibilityConfig,
    pub usage_indicators: UsageIndicators,
    pub normalization: NormalizationConfig,
    pub retry: RetryPolicy,
}

impl SchedulerConfig {
    pub fn validate(&self) -> crate::Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.weights.risk) || !in_unit(self.weights.electricity) {
            return Err(PlacementError::InvalidConfig(format!(
                "weights must lie in [0, 1], got risk={} electricity={}",
                self.weights.risk, self.weights.electricity
            )));
        }
        if self.retry.base.is_zero() {
            return Err(PlacementError::InvalidConfig(
                "retry base interval must be positive".into(),
            ));
        }
        if self.retry.max < self.retry.base {
            return Err(PlacementError::InvalidConfig(format!(
                "retry cap {:?} is smaller than the base interval {:?}",
                self.retry.max, self.retry.base
            )));
        }
        let n = &self.normalization;
        if n.cloud_pods_per_group == 0 || n.edge_pods_per_group == 0 {
            return Err(PlacementError::InvalidConfig(
                "pods per group must be positive".into(),
            ));
        }
        if n.cloud_power_share <= 0.0 || n.edge_power_share <= 0.0 {
            return Err(PlacementError::InvalidConfig(
                "power shares must be positive".into(),
            ));
        }
        Ok(())
    }
}
