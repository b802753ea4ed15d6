#![allow(dead_code)]

use std::rc::Rc;

use edgesim::config::sim_config::SimulationConfig;
use edgesim::location::Location;
use edgesim::mobility::{MobilityModel, ScriptedMobility};
use edgesim::simulation::EdgeSimulation;
use edgesim::task::TaskRequest;
use edgesim_core::Simulation;

pub fn assert_float_eq(x: f64, y: f64, eps: f64) {
    assert!(x > y - eps && x < y + eps, "{} != {}", x, y);
}

pub fn load_config() -> SimulationConfig {
    SimulationConfig::from_file("test-configs/config.yaml").unwrap()
}

pub fn ap0() -> Location {
    Location::new(0, 0, 0., 0.)
}

pub fn ap1() -> Location {
    Location::new(1, 1, 100., 0.)
}

pub fn request(device: usize, start_time: f64) -> TaskRequest {
    TaskRequest {
        device,
        app: 0,
        start_time,
        length: 4000.,
        input_size: 100.,
        output_size: 100.,
        cores: 1,
    }
}

pub fn build(config: SimulationConfig, mobility: Rc<dyn MobilityModel>) -> EdgeSimulation {
    EdgeSimulation::with_mobility(Simulation::new(123), config, mobility).unwrap()
}

/// Single device staying at the first access point.
pub fn build_stationary(config: SimulationConfig) -> EdgeSimulation {
    build(config, Rc::new(ScriptedMobility::stationary(vec![ap0()])))
}
