use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use riskplace_core::config::{
    EligibilityConfig, NormalizationConfig, RetryPolicy, SchedulerConfig, UsageIndicators,
    Weights,
};

use crate::workload::generator::WorkloadTemplate;
use crate::workload::infrastructure::InfrastructureTemplate;

/// Parameters of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    /// Length of a collection window; derived from the arrival rate when unset.
    pub window: Option<Duration>,
    /// Simulated time at which the run stops.
    pub until: Duration,
    /// Arrivals per hour.
    pub arrival_rate: f64,
    pub seed: u64,
    /// A solve taking longer is treated as infeasible.
    pub solver_timeout: Option<Duration>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            window: None,
            until: Duration::from_secs(48 * 3600),
            arrival_rate: 1.0,
            seed: 42,
            solver_timeout: None,
        }
    }
}

impl SimulationSettings {
    /// Collection window `(k - 1) / rate` hours, with `k` shrinking for large
    /// infrastructures so that batches stay tractable.
    pub fn window_for(&self, node_count: usize) -> Duration {
        if let Some(window) = self.window {
            return window;
        }
        let k = if node_count <= 1000 { 50.0 } else { 25.0 };
        riskplace_core::duration_from_hours((k - 1.0) / self.arrival_rate)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub scheduler: SchedulerConfig,
    pub simulation: SimulationSettings,
    pub workload: WorkloadTemplate,
    pub infrastructure: InfrastructureTemplate,
}

// On-disk shape of the settings file; durations are humantime strings.

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct SettingsFile {
    weights: Option<Weights>,
    eligibility: Option<EligibilityConfig>,
    usage_indicators: Option<UsageIndicators>,
    normalization: Option<NormalizationConfig>,
    retry: RetryFile,
    simulation: SimulationFile,
    workload: Option<WorkloadTemplate>,
    infrastructure: Option<InfrastructureTemplate>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct RetryFile {
    base: Option<String>,
    max: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct SimulationFile {
    window: Option<String>,
    until: Option<String>,
    arrival_rate: Option<f64>,
    seed: Option<u64>,
    solver_timeout: Option<String>,
}

fn parse_duration(value: Option<String>) -> crate::Result<Option<Duration>> {
    value
        .map(|v| humantime::parse_duration(&v).map_err(Into::into))
        .transpose()
}

impl Settings {
    pub fn from_toml(text: &str) -> crate::Result<Self> {
        let file: SettingsFile = toml::from_str(text)?;
        let mut settings = Settings::default();

        let scheduler = &mut settings.scheduler;
        if let Some(weights) = file.weights {
            scheduler.weights = weights;
        }
        if let Some(eligibility) = file.eligibility {
            scheduler.eligibility = eligibility;
        }
        if let Some(usage_indicators) = file.usage_indicators {
            scheduler.usage_indicators = usage_indicators;
        }
        if let Some(normalization) = file.normalization {
            scheduler.normalization = normalization;
        }
        let defaults = RetryPolicy::default();
        scheduler.retry = RetryPolicy {
            base: parse_duration(file.retry.base)?.unwrap_or(defaults.base),
            max: parse_duration(file.retry.max)?.unwrap_or(defaults.max),
        };

        let simulation = &mut settings.simulation;
        simulation.window = parse_duration(file.simulation.window)?;
        if let Some(until) = parse_duration(file.simulation.until)? {
            simulation.until = until;
        }
        if let Some(rate) = file.simulation.arrival_rate {
            simulation.arrival_rate = rate;
        }
        if let Some(seed) = file.simulation.seed {
            simulation.seed = seed;
        }
        simulation.solver_timeout = parse_duration(file.simulation.solver_timeout)?;

        if let Some(workload) = file.workload {
            settings.workload = workload;
        }
        if let Some(infrastructure) = file.infrastructure {
            settings.infrastructure = infrastructure;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        log::debug!("Loading settings from {}", path.display());
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.scheduler.validate()?;
        let simulation = &self.simulation;
        if !(simulation.arrival_rate.is_finite() && simulation.arrival_rate > 0.0) {
            return Err(crate::Error::InvalidInput(format!(
                "arrival rate must be positive, got {}",
                simulation.arrival_rate
            )));
        }
        if simulation.window.is_some_and(|w| w.is_zero()) {
            return Err(crate::Error::InvalidInput(
                "collection window must be positive".into(),
            ));
        }
        self.workload.validate()?;
        self.infrastructure.validate()
    }
}
