//! CPU utilization models predicting the demand of a task on a VM.

use std::rc::Rc;

use crate::config::options::parse_config_value;
use crate::config::sim_config::{ApplicationConfig, SimulationConfig};
use crate::error::SimulationError;
use crate::resource_pool::{Tier, Vm};
use crate::task::Task;

/// Predicts CPU utilization (in percent) caused by the task on the VM.
pub trait CpuUtilizationModel {
    fn predict(&self, task: &Task, vm: &Vm) -> f64;
}

/// Demand is proportional to the ratio of task length and VM speed.
pub struct MipsRatio;

impl CpuUtilizationModel for MipsRatio {
    fn predict(&self, task: &Task, vm: &Vm) -> f64 {
        100. * task.length / vm.mips
    }
}

/// Demand is taken from the application profile for the tier of the VM.
pub struct AppProfile {
    apps: Vec<ApplicationConfig>,
}

impl AppProfile {
    pub fn new(apps: Vec<ApplicationConfig>) -> Self {
        Self { apps }
    }
}

impl CpuUtilizationModel for AppProfile {
    fn predict(&self, task: &Task, vm: &Vm) -> f64 {
        match self.apps.get(task.app) {
            Some(app) => match vm.tier {
                Tier::Edge => app.vm_utilization_on_edge,
                Tier::Cloud => app.vm_utilization_on_cloud,
                Tier::Mobile => app.vm_utilization_on_mobile,
            },
            None => {
                log::warn!("Unknown application {} of task {}", task.app, task.id);
                0.
            }
        }
    }
}

/// Creates utilization model by its config name.
pub fn utilization_model_resolver(config: &SimulationConfig) -> Result<Rc<dyn CpuUtilizationModel>, SimulationError> {
    let (model_name, _) = parse_config_value(&config.utilization_model);
    match model_name.as_str() {
        "MipsRatio" => Ok(Rc::new(MipsRatio)),
        "AppProfile" => Ok(Rc::new(AppProfile::new(config.applications.clone()))),
        _ => Err(SimulationError::config(format!(
            "unsupported utilization model: {}",
            config.utilization_model
        ))),
    }
}

#[cfg(test)]
mod tests {
    use crate::task::TaskRequest;

    use super::*;

    fn task() -> Task {
        let request = TaskRequest {
            device: 0,
            app: 0,
            start_time: 0.,
            length: 4000.,
            input_size: 0.,
            output_size: 0.,
            cores: 1,
        };
        Task::new(0, &request, 0.)
    }

    fn vm(tier: Tier) -> Vm {
        Vm {
            id: 0,
            host: 0,
            tier,
            mips: 20000.,
            cores: 1,
            utilization: 0.,
            running: 0,
        }
    }

    #[test]
    fn mips_ratio() {
        assert!((MipsRatio.predict(&task(), &vm(Tier::Edge)) - 20.).abs() < 1e-12);
    }

    #[test]
    fn app_profile_by_tier() {
        let yaml = r#"
utilization_model: AppProfile
applications:
  - name: HEALTH_APP
    usage_percentage: 100
    prob_cloud_selection: 10
    poisson_interarrival: 3
    active_period: 45
    idle_period: 90
    data_upload: 20
    data_download: 20
    task_length: 3000
    required_core: 1
    vm_utilization_on_edge: 2
    vm_utilization_on_cloud: 0.2
    vm_utilization_on_mobile: 8
    delay_sensitivity: 0.7
"#;
        let config = SimulationConfig::from_yaml(yaml).unwrap();
        let model = utilization_model_resolver(&config).unwrap();
        assert_eq!(model.predict(&task(), &vm(Tier::Edge)), 2.);
        assert_eq!(model.predict(&task(), &vm(Tier::Cloud)), 0.2);
        assert_eq!(model.predict(&task(), &vm(Tier::Mobile)), 8.);
    }

    #[test]
    fn unknown_model_is_config_error() {
        let config = SimulationConfig::from_yaml("utilization_model: Linear\n").unwrap();
        assert!(matches!(
            utilization_model_resolver(&config),
            Err(SimulationError::Config(_))
        ));
    }
}
