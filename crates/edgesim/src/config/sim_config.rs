//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
pub struct RawSimulationConfig {
    pub simulation_time: Option<f64>,
    pub warm_up_period: Option<f64>,
    pub client_activity_start_time: Option<f64>,
    pub relay_update_interval: Option<f64>,
    pub wlan_bandwidth: Option<f64>,
    pub wan_bandwidth: Option<f64>,
    pub man_bandwidth: Option<f64>,
    pub wan_propagation_delay: Option<f64>,
    pub internal_lan_delay: Option<f64>,
    pub network_model: Option<String>,
    pub controller: Option<String>,
    pub utilization_model: Option<String>,
    pub tier_policy: Option<String>,
    pub vm_selector: Option<String>,
    pub edge_scope: Option<String>,
    pub mobility: Option<MobilityConfig>,
    pub applications: Option<Vec<ApplicationConfig>>,
    pub edge_datacenters: Option<Vec<EdgeDatacenterConfig>>,
    pub cloud: Option<CloudConfig>,
    pub mobile_vm: Option<MobileVmConfig>,
}

/// Profile of an application (task type) generated by mobile devices.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ApplicationConfig {
    /// Application name.
    pub name: String,
    /// Share of devices running this application, in percent.
    pub usage_percentage: f64,
    /// Probability of offloading to the cloud used by random tier selection, in percent.
    pub prob_cloud_selection: f64,
    /// Mean task inter-arrival time in seconds.
    pub poisson_interarrival: f64,
    /// Length of active period in seconds.
    pub active_period: f64,
    /// Length of idle period in seconds.
    pub idle_period: f64,
    /// Mean input size in KB.
    pub data_upload: f64,
    /// Mean output size in KB.
    pub data_download: f64,
    /// Mean task length in MI.
    pub task_length: f64,
    /// Number of cores required by a task.
    pub required_core: u32,
    /// CPU utilization of a task on an edge VM, in percent.
    pub vm_utilization_on_edge: f64,
    /// CPU utilization of a task on a cloud VM, in percent.
    pub vm_utilization_on_cloud: f64,
    /// CPU utilization of a task on a mobile VM, in percent.
    pub vm_utilization_on_mobile: f64,
    /// Delay sensitivity in [0, 1].
    pub delay_sensitivity: f64,
    /// Maximal tolerated service time in seconds, 0 if not set.
    #[serde(default)]
    pub max_delay_requirement: f64,
}

/// Mean residence times of devices at access points, indexed by place type.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct MobilityConfig {
    /// Mean residence time in seconds for each place type.
    pub residence_time_by_place_type: Vec<f64>,
}

impl Default for MobilityConfig {
    fn default() -> Self {
        Self {
            residence_time_by_place_type: vec![480., 300., 120.],
        }
    }
}

/// Placement of an edge datacenter.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct LocationConfig {
    pub x: f64,
    pub y: f64,
    /// Access point (WLAN cell) served by the datacenter.
    pub access_point: usize,
    /// Place type (attractiveness level) of the access point.
    #[serde(default)]
    pub place_type: usize,
}

/// Configuration of a VM or a set of identical VMs.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct VmConfig {
    pub mips: f64,
    #[serde(default = "default_cores")]
    pub cores: u32,
    /// Number of such VMs.
    pub count: Option<u32>,
}

fn default_cores() -> u32 {
    1
}

/// Configuration of an edge host.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    pub vms: Vec<VmConfig>,
    /// Number of such hosts.
    pub count: Option<u32>,
}

/// Configuration of an edge datacenter placed at an access point.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct EdgeDatacenterConfig {
    pub name: Option<String>,
    pub location: LocationConfig,
    pub hosts: Vec<HostConfig>,
}

/// Configuration of the cloud datacenter.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct CloudConfig {
    pub hosts: u32,
    pub vms_per_host: u32,
    pub vm_mips: f64,
    #[serde(default = "default_cores")]
    pub vm_cores: u32,
}

/// Configuration of the VM running on each mobile device.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct MobileVmConfig {
    pub mips: f64,
    #[serde(default = "default_cores")]
    pub cores: u32,
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Simulation length in seconds.
    pub simulation_time: f64,
    /// Tasks created before this time are excluded from statistics.
    pub warm_up_period: f64,
    /// Time when devices start moving and generating tasks.
    pub client_activity_start_time: f64,
    /// Period of relay link parameters re-estimation.
    pub relay_update_interval: f64,
    /// WLAN bandwidth in kbps.
    pub wlan_bandwidth: f64,
    /// WAN bandwidth in kbps.
    pub wan_bandwidth: f64,
    /// MAN (edge-to-edge relay) bandwidth in kbps.
    pub man_bandwidth: f64,
    /// WAN propagation delay in seconds.
    pub wan_propagation_delay: f64,
    /// Delay of a hop inside the edge LAN in seconds.
    pub internal_lan_delay: f64,
    /// Network delay model: Empirical or Mm1.
    pub network_model: String,
    /// Lifecycle controller variant: Direct or Relay.
    pub controller: String,
    /// CPU utilization model: MipsRatio or AppProfile.
    pub utilization_model: String,
    /// Tier selection policy, e.g. `Hybrid[wan=6,util=80]`.
    pub tier_policy: String,
    /// VM selection heuristic, e.g. `NextFit`.
    pub vm_selector: String,
    /// Candidate edge hosts for the generic edge target: nearest or all.
    pub edge_scope: String,
    pub mobility: MobilityConfig,
    pub applications: Vec<ApplicationConfig>,
    pub edge_datacenters: Vec<EdgeDatacenterConfig>,
    pub cloud: Option<CloudConfig>,
    pub mobile_vm: Option<MobileVmConfig>,
}

impl SimulationConfig {
    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, SimulationError> {
        let content = std::fs::read_to_string(file_name)?;
        Self::from_yaml(&content)
    }

    /// Creates simulation config from YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, SimulationError> {
        let raw: RawSimulationConfig = serde_yaml::from_str(content)?;
        Self::from_raw(raw)
    }

    /// Applies default values to the raw config and validates the result.
    pub fn from_raw(raw: RawSimulationConfig) -> Result<Self, SimulationError> {
        let config = Self {
            simulation_time: raw.simulation_time.unwrap_or(1800.),
            warm_up_period: raw.warm_up_period.unwrap_or(0.),
            client_activity_start_time: raw.client_activity_start_time.unwrap_or(10.),
            relay_update_interval: raw.relay_update_interval.unwrap_or(5.),
            wlan_bandwidth: raw.wlan_bandwidth.unwrap_or(300000.),
            wan_bandwidth: raw.wan_bandwidth.unwrap_or(20000.),
            man_bandwidth: raw.man_bandwidth.unwrap_or(1300. * 1024.),
            wan_propagation_delay: raw.wan_propagation_delay.unwrap_or(0.1),
            internal_lan_delay: raw.internal_lan_delay.unwrap_or(0.005),
            network_model: raw.network_model.unwrap_or_else(|| "Empirical".to_string()),
            controller: raw.controller.unwrap_or_else(|| "Direct".to_string()),
            utilization_model: raw.utilization_model.unwrap_or_else(|| "MipsRatio".to_string()),
            tier_policy: raw.tier_policy.unwrap_or_else(|| "Edge".to_string()),
            vm_selector: raw.vm_selector.unwrap_or_else(|| "FirstFit".to_string()),
            edge_scope: raw.edge_scope.unwrap_or_else(|| "nearest".to_string()),
            mobility: raw.mobility.unwrap_or_default(),
            applications: raw.applications.unwrap_or_default(),
            edge_datacenters: raw.edge_datacenters.unwrap_or_default(),
            cloud: raw.cloud,
            mobile_vm: raw.mobile_vm,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), SimulationError> {
        if self.simulation_time <= 0. {
            return Err(SimulationError::config("simulation_time must be positive"));
        }
        if self.relay_update_interval <= 0. {
            return Err(SimulationError::config("relay_update_interval must be positive"));
        }
        if self.mobility.residence_time_by_place_type.is_empty() {
            return Err(SimulationError::config("residence times by place type are empty"));
        }
        for (place_type, &time) in self.mobility.residence_time_by_place_type.iter().enumerate() {
            if !time.is_finite() || time <= 0. {
                return Err(SimulationError::config(format!(
                    "residence time of place type {} must be positive, got {}",
                    place_type, time
                )));
            }
        }
        for dc in self.edge_datacenters.iter() {
            if dc.location.place_type >= self.mobility.residence_time_by_place_type.len() {
                return Err(SimulationError::config(format!(
                    "unknown place type {} of access point {}",
                    dc.location.place_type, dc.location.access_point
                )));
            }
        }
        for app in self.applications.iter() {
            if app.poisson_interarrival <= 0. || app.active_period <= 0. {
                return Err(SimulationError::config(format!(
                    "application {} must have positive interarrival time and active period",
                    app.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config = SimulationConfig::from_yaml("tier_policy: Cloud\n").unwrap();
        assert_eq!(config.simulation_time, 1800.);
        assert_eq!(config.client_activity_start_time, 10.);
        assert_eq!(config.relay_update_interval, 5.);
        assert_eq!(config.wlan_bandwidth, 300000.);
        assert_eq!(config.man_bandwidth, 1300. * 1024.);
        assert_eq!(config.network_model, "Empirical");
        assert_eq!(config.controller, "Direct");
        assert_eq!(config.tier_policy, "Cloud");
        assert_eq!(config.edge_scope, "nearest");
        assert!(config.cloud.is_none());
    }

    #[test]
    fn full_config_is_parsed() {
        let yaml = r#"
simulation_time: 600
warm_up_period: 60
applications:
  - name: AUGMENTED_REALITY
    usage_percentage: 30
    prob_cloud_selection: 20
    poisson_interarrival: 2
    active_period: 40
    idle_period: 20
    data_upload: 1500
    data_download: 25
    task_length: 9000
    required_core: 1
    vm_utilization_on_edge: 6
    vm_utilization_on_cloud: 0.6
    vm_utilization_on_mobile: 0
    delay_sensitivity: 0.9
edge_datacenters:
  - location: { x: 1, y: 1, access_point: 0, place_type: 2 }
    hosts:
      - vms:
          - { mips: 10000, count: 2 }
cloud:
  hosts: 4
  vms_per_host: 4
  vm_mips: 100000
"#;
        let config = SimulationConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.warm_up_period, 60.);
        assert_eq!(config.applications[0].max_delay_requirement, 0.);
        assert_eq!(config.edge_datacenters[0].hosts[0].vms[0].count, Some(2));
        assert_eq!(config.edge_datacenters[0].hosts[0].vms[0].cores, 1);
        assert_eq!(config.cloud.as_ref().unwrap().vm_cores, 1);
    }

    #[test]
    fn unknown_place_type_is_rejected() {
        let yaml = r#"
edge_datacenters:
  - location: { x: 0, y: 0, access_point: 0, place_type: 7 }
    hosts: []
"#;
        assert!(matches!(
            SimulationConfig::from_yaml(yaml),
            Err(SimulationError::Config(_))
        ));
    }

    #[test]
    fn non_positive_residence_time_is_rejected() {
        for times in ["[60, 0, 10]", "[-5]"] {
            let yaml = format!("mobility:\n  residence_time_by_place_type: {}\n", times);
            match SimulationConfig::from_yaml(&yaml) {
                Err(SimulationError::Config(message)) => assert!(message.contains("residence time"), "{}", message),
                other => panic!("residence times {} are accepted: {:?}", times, other.map(|c| c.simulation_time)),
            }
        }
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(matches!(
            SimulationConfig::from_yaml("simulation_time: [1"),
            Err(SimulationError::Yaml(_))
        ));
    }
}
