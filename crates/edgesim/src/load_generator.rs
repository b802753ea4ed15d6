//! Generation of task requests.

use rand_distr::Exp;

use edgesim_core::SimulationContext;

use crate::config::sim_config::{ApplicationConfig, SimulationConfig};
use crate::error::SimulationError;
use crate::task::TaskRequest;

fn exp(mean: f64, name: &str) -> Result<Exp<f64>, SimulationError> {
    Exp::new(1. / mean).map_err(|_| SimulationError::config(format!("invalid mean {} of {}", mean, name)))
}

/// Devices alternate between active and idle periods of their application and submit tasks with
/// exponential inter-arrival times while active.
pub struct IdleActiveLoadGenerator;

impl IdleActiveLoadGenerator {
    /// Generates task requests of all devices, sorted by submission time.
    pub fn generate(
        config: &SimulationConfig,
        device_count: usize,
        ctx: &SimulationContext,
    ) -> Result<Vec<TaskRequest>, SimulationError> {
        let mut requests = Vec::new();
        if config.applications.is_empty() {
            return Ok(requests);
        }
        for device in 0..device_count {
            let app = match Self::choose_app(&config.applications, ctx) {
                Some(app) => app,
                None => {
                    log::warn!("No application is chosen for device {}", device);
                    continue;
                }
            };
            let profile = &config.applications[app];
            let interarrival = exp(profile.poisson_interarrival, "poisson_interarrival")?;
            let length = exp(profile.task_length, "task_length")?;
            let upload = exp(profile.data_upload, "data_upload")?;
            let download = exp(profile.data_download, "data_download")?;

            let start = config.client_activity_start_time;
            let mut active_start = ctx.gen_range(start..=start + profile.active_period);
            let mut time = active_start;
            while time < config.simulation_time {
                let interval: f64 = ctx.sample_from_distribution(&interarrival);
                if interval <= 0. {
                    continue;
                }
                time += interval;
                if time > active_start + profile.active_period {
                    active_start += profile.active_period + profile.idle_period;
                    time = active_start;
                    continue;
                }
                if time >= config.simulation_time {
                    break;
                }
                requests.push(TaskRequest {
                    device,
                    app,
                    start_time: time,
                    length: ctx.sample_from_distribution(&length),
                    input_size: ctx.sample_from_distribution(&upload),
                    output_size: ctx.sample_from_distribution(&download),
                    cores: profile.required_core,
                });
            }
        }
        requests.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(requests)
    }

    /// Chooses application by usage percentage, `None` if percentages sum up to less than the drawn value.
    fn choose_app(apps: &[ApplicationConfig], ctx: &SimulationContext) -> Option<usize> {
        let value = ctx.gen_range(0. ..100.);
        let mut total = 0.;
        for (i, app) in apps.iter().enumerate() {
            total += app.usage_percentage;
            if value < total {
                return Some(i);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use edgesim_core::Simulation;

    use super::*;

    const CONFIG: &str = r#"
simulation_time: 600
client_activity_start_time: 10
applications:
  - name: AUGMENTED_REALITY
    usage_percentage: 100
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
"#;

    #[test]
    fn tasks_are_generated_within_active_periods() {
        let config = SimulationConfig::from_yaml(CONFIG).unwrap();
        let mut sim = Simulation::new(123);
        let ctx = sim.create_context("load");
        let requests = IdleActiveLoadGenerator::generate(&config, 5, &ctx).unwrap();
        assert!(!requests.is_empty());
        for pair in requests.windows(2) {
            assert!(pair[0].start_time <= pair[1].start_time);
        }
        for request in requests.iter() {
            assert!(request.start_time > 10. && request.start_time < 600.);
            assert!(request.length > 0.);
            assert_eq!(request.cores, 1);
            assert!(request.device < 5);
        }
        // a device produces about one task per 2 seconds during 2/3 of the time
        let per_device = requests.len() as f64 / 5.;
        assert!(per_device > 100. && per_device < 300., "{}", per_device);
    }

    #[test]
    fn generation_is_deterministic_for_seed() {
        let config = SimulationConfig::from_yaml(CONFIG).unwrap();
        let generate = || {
            let mut sim = Simulation::new(42);
            let ctx = sim.create_context("load");
            IdleActiveLoadGenerator::generate(&config, 3, &ctx).unwrap()
        };
        assert_eq!(generate(), generate());
    }

    #[test]
    fn device_without_application_submits_nothing() {
        let yaml = CONFIG.replace("usage_percentage: 100", "usage_percentage: 0");
        let config = SimulationConfig::from_yaml(&yaml).unwrap();
        let mut sim = Simulation::new(123);
        let ctx = sim.create_context("load");
        assert!(IdleActiveLoadGenerator::generate(&config, 3, &ctx).unwrap().is_empty());
    }
}
