//! Experiment config which produces a series of simulation runs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::sim_config::{RawSimulationConfig, SimulationConfig};
use crate::error::SimulationError;

/// Policy combination evaluated by an experiment.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ScenarioConfig {
    pub name: String,
    pub tier_policy: String,
    pub vm_selector: Option<String>,
    pub controller: Option<String>,
    pub network_model: Option<String>,
    pub edge_scope: Option<String>,
}

/// Holds raw experiment config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawExperimentConfig {
    /// Path of the base simulation config, relative to the experiment file.
    pub base: Option<String>,
    /// Inline base simulation config.
    pub simulation: Option<RawSimulationConfig>,
    pub device_counts: Vec<usize>,
    pub scenarios: Vec<ScenarioConfig>,
    pub iterations: Option<u32>,
    pub seed: Option<u64>,
}

/// Configuration of a single simulation run.
#[derive(Debug, Serialize, Clone)]
pub struct RunConfig {
    pub id: usize,
    pub scenario: String,
    pub device_count: usize,
    pub iteration: u32,
    pub seed: u64,
    #[serde(skip)]
    pub config: SimulationConfig,
}

/// Represents experiment configuration: scenarios × device counts × iterations.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    base: RawSimulationConfig,
    pub device_counts: Vec<usize>,
    pub scenarios: Vec<ScenarioConfig>,
    pub iterations: u32,
    pub seed: u64,
}

impl ExperimentConfig {
    /// Creates experiment config by reading YAML file.
    pub fn from_file(file_name: &str) -> Result<Self, SimulationError> {
        let content = std::fs::read_to_string(file_name)?;
        let dir = Path::new(file_name).parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&content, dir)
    }

    /// Creates experiment config from YAML string, resolving `base` relative to `dir`.
    pub fn from_yaml(content: &str, dir: &Path) -> Result<Self, SimulationError> {
        let raw: RawExperimentConfig = serde_yaml::from_str(content)?;
        let base = match (raw.simulation, raw.base) {
            (Some(inline), None) => inline,
            (None, Some(path)) => serde_yaml::from_str(&std::fs::read_to_string(dir.join(path))?)?,
            (None, None) => RawSimulationConfig::default(),
            (Some(_), Some(_)) => {
                return Err(SimulationError::config(
                    "experiment must set either base or simulation, not both",
                ))
            }
        };
        if raw.device_counts.is_empty() {
            return Err(SimulationError::config("experiment has no device counts"));
        }
        if raw.scenarios.is_empty() {
            return Err(SimulationError::config("experiment has no scenarios"));
        }
        Ok(Self {
            base,
            device_counts: raw.device_counts,
            scenarios: raw.scenarios,
            iterations: raw.iterations.unwrap_or(1),
            seed: raw.seed.unwrap_or(123),
        })
    }

    /// Builds simulation config for the given scenario.
    pub fn scenario_config(&self, scenario: &ScenarioConfig) -> Result<SimulationConfig, SimulationError> {
        let mut raw = self.base.clone();
        raw.tier_policy = Some(scenario.tier_policy.clone());
        if scenario.vm_selector.is_some() {
            raw.vm_selector = scenario.vm_selector.clone();
        }
        if scenario.controller.is_some() {
            raw.controller = scenario.controller.clone();
        }
        if scenario.network_model.is_some() {
            raw.network_model = scenario.network_model.clone();
        }
        if scenario.edge_scope.is_some() {
            raw.edge_scope = scenario.edge_scope.clone();
        }
        SimulationConfig::from_raw(raw)
    }

    /// Expands the experiment into the list of runs, ordered by iteration, scenario and device count.
    pub fn runs(&self) -> Result<Vec<RunConfig>, SimulationError> {
        let mut runs = Vec::new();
        for iteration in 0..self.iterations {
            for scenario in self.scenarios.iter() {
                let config = self.scenario_config(scenario)?;
                for &device_count in self.device_counts.iter() {
                    runs.push(RunConfig {
                        id: runs.len() + 1,
                        scenario: scenario.name.clone(),
                        device_count,
                        iteration,
                        seed: self.seed + iteration as u64,
                        config: config.clone(),
                    });
                }
            }
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPERIMENT: &str = r#"
simulation:
  simulation_time: 300
  network_model: Mm1
device_counts: [100, 200]
iterations: 2
seed: 7
scenarios:
  - name: edge-only
    tier_policy: Edge
  - name: hybrid
    tier_policy: Hybrid[wan=6,util=80]
    vm_selector: WorstFit
    controller: Relay
"#;

    #[test]
    fn runs_are_expanded() {
        let config = ExperimentConfig::from_yaml(EXPERIMENT, Path::new(".")).unwrap();
        let runs = config.runs().unwrap();
        assert_eq!(runs.len(), 8);
        assert_eq!(runs[0].id, 1);
        assert_eq!(runs[0].scenario, "edge-only");
        assert_eq!(runs[0].config.vm_selector, "FirstFit");
        assert_eq!(runs[3].scenario, "hybrid");
        assert_eq!(runs[3].device_count, 200);
        assert_eq!(runs[3].config.controller, "Relay");
        assert_eq!(runs[3].config.network_model, "Mm1");
        assert_eq!(runs[3].config.simulation_time, 300.);
        assert_eq!(runs[7].iteration, 1);
        assert_eq!(runs[7].seed, 8);
    }

    #[test]
    fn empty_scenarios_are_rejected() {
        let yaml = "device_counts: [1]\nscenarios: []\n";
        assert!(ExperimentConfig::from_yaml(yaml, Path::new(".")).is_err());
    }
}
