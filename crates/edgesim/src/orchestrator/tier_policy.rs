//! Tier selection policies.

use crate::config::options::{option_or, parse_config_value, parse_options};
use crate::error::SimulationError;
use crate::resource_pool::Tier;
use crate::task::Task;

use super::adaptive::{GameTheory, Mab, Predictive};
use super::fuzzy::{Fuzzy, FuzzyCompetitor};
use super::{PolicyView, Target};

/// Trait for implementation of tier selection policies.
pub trait TierPolicy {
    fn choose_target(&mut self, task: &Task, view: &mut PolicyView) -> Target;

    /// Called for every task when it reaches a terminal state, including tasks rejected after the tier
    /// was chosen.
    fn task_finished(&mut self, _task: &Task) {}
}

pub fn tier_policy_resolver(config_str: &str) -> Result<Box<dyn TierPolicy>, SimulationError> {
    let (policy_name, options) = parse_config_value(config_str);
    let options = parse_options(&options.unwrap_or_default());
    match policy_name.as_str() {
        "Mobile" | "OnlyMobile" => Ok(Box::new(FixedTier::new(Target::Mobile))),
        "Edge" | "OnlyEdge" => Ok(Box::new(FixedTier::new(Target::Edge))),
        "Cloud" | "OnlyCloud" => Ok(Box::new(FixedTier::new(Target::Cloud))),
        "Random" => {
            let cloud_probability = match options.get("p") {
                Some(_) => Some(option_or(&options, "p", 0.)?),
                None => None,
            };
            let local = match options.get("local").map(|s| s.as_str()) {
                None | Some("edge") => Target::Edge,
                Some("mobile") => Target::Mobile,
                Some(other) => {
                    return Err(SimulationError::config(format!("unsupported local tier: {}", other)));
                }
            };
            Ok(Box::new(RandomTier::new(cloud_probability, local)))
        }
        "NetworkBased" => Ok(Box::new(NetworkBased::new(option_or(&options, "wan", 6.)?))),
        "UtilizationBased" => Ok(Box::new(UtilizationBased::new(option_or(&options, "util", 80.)?))),
        "Hybrid" => Ok(Box::new(Hybrid::new(
            option_or(&options, "wan", 6.)?,
            option_or(&options, "util", 80.)?,
        ))),
        "Fuzzy" => Ok(Box::new(Fuzzy::default())),
        "FuzzyCompetitor" => Ok(Box::new(FuzzyCompetitor::default())),
        "CapacityHybrid" => Ok(Box::new(CapacityHybrid)),
        "MobileUtilHeuristic" => Ok(Box::new(MobileUtilHeuristic::new(option_or(
            &options,
            "threshold",
            75.,
        )?))),
        "EdgeUtilHeuristic" => Ok(Box::new(EdgeUtilHeuristic::new(option_or(
            &options,
            "threshold",
            90.,
        )?))),
        "Mab" | "MAB" => Ok(Box::new(Mab::new(option_or(&options, "beta", 1.)?))),
        "GameTheory" => Ok(Box::new(GameTheory::new(
            option_or(&options, "pricing", 0.6)?,
            option_or(&options, "max_rate", 20.)?,
        ))),
        "Predictive" => {
            let window = option_or(&options, "window", 0.125)?;
            if window <= 0. {
                return Err(SimulationError::config("prediction window must be positive"));
            }
            Ok(Box::new(Predictive::new(window)))
        }
        _ => Err(SimulationError::config(format!("can't resolve tier policy: {}", config_str))),
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Always uses the same tier.
pub struct FixedTier {
    target: Target,
}

impl FixedTier {
    pub fn new(target: Target) -> Self {
        Self { target }
    }
}

impl TierPolicy for FixedTier {
    fn choose_target(&mut self, _task: &Task, _view: &mut PolicyView) -> Target {
        self.target
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Offloads to the cloud with the given probability (in percent), or with the application's
/// cloud selection probability if it is not set.
pub struct RandomTier {
    cloud_probability: Option<f64>,
    local: Target,
}

impl RandomTier {
    pub fn new(cloud_probability: Option<f64>, local: Target) -> Self {
        Self {
            cloud_probability,
            local,
        }
    }
}

impl TierPolicy for RandomTier {
    fn choose_target(&mut self, task: &Task, view: &mut PolicyView) -> Target {
        let probability = self
            .cloud_probability
            .or_else(|| view.app(task).map(|app| app.prob_cloud_selection))
            .unwrap_or(0.);
        if view.ctx.gen_range(0. ..100.) < probability {
            Target::Cloud
        } else {
            self.local
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Uses the cloud if the estimated WAN bandwidth (Mbps) exceeds the threshold.
pub struct NetworkBased {
    wan_threshold: f64,
}

impl NetworkBased {
    pub fn new(wan_threshold: f64) -> Self {
        Self { wan_threshold }
    }
}

impl TierPolicy for NetworkBased {
    fn choose_target(&mut self, task: &Task, view: &mut PolicyView) -> Target {
        if view.estimate_wan_bandwidth(task.device) > self.wan_threshold {
            Target::Cloud
        } else {
            Target::Edge
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Uses the cloud if the average edge utilization exceeds the threshold.
pub struct UtilizationBased {
    edge_threshold: f64,
}

impl UtilizationBased {
    pub fn new(edge_threshold: f64) -> Self {
        Self { edge_threshold }
    }
}

impl TierPolicy for UtilizationBased {
    fn choose_target(&mut self, _task: &Task, view: &mut PolicyView) -> Target {
        if view.pool.tier_utilization(Tier::Edge) > self.edge_threshold {
            Target::Cloud
        } else {
            Target::Edge
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Uses the cloud if both WAN bandwidth and edge utilization exceed their thresholds.
pub struct Hybrid {
    wan_threshold: f64,
    edge_threshold: f64,
}

impl Hybrid {
    pub fn new(wan_threshold: f64, edge_threshold: f64) -> Self {
        Self {
            wan_threshold,
            edge_threshold,
        }
    }
}

impl TierPolicy for Hybrid {
    fn choose_target(&mut self, task: &Task, view: &mut PolicyView) -> Target {
        let wan_bandwidth = view.estimate_wan_bandwidth(task.device);
        let edge_utilization = view.pool.tier_utilization(Tier::Edge);
        if wan_bandwidth > self.wan_threshold && edge_utilization > self.edge_threshold {
            Target::Cloud
        } else {
            Target::Edge
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Executes the task on the device if its VM has enough residual capacity, otherwise offloads to the edge.
pub struct CapacityHybrid;

impl TierPolicy for CapacityHybrid {
    fn choose_target(&mut self, task: &Task, view: &mut PolicyView) -> Target {
        match view.pool.mobile_vm(task.device) {
            Some(vm) if view.fits(task, vm) => Target::Mobile,
            _ => Target::Edge,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Executes the task on the device while its VM utilization is below the threshold.
pub struct MobileUtilHeuristic {
    threshold: f64,
}

impl MobileUtilHeuristic {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl TierPolicy for MobileUtilHeuristic {
    fn choose_target(&mut self, task: &Task, view: &mut PolicyView) -> Target {
        match view.pool.mobile_vm(task.device).and_then(|vm| view.pool.vm(vm)) {
            Some(vm) if vm.utilization < self.threshold => Target::Mobile,
            _ => Target::Edge,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Offloads to the edge while the average edge utilization is below the threshold.
pub struct EdgeUtilHeuristic {
    threshold: f64,
}

impl EdgeUtilHeuristic {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl TierPolicy for EdgeUtilHeuristic {
    fn choose_target(&mut self, _task: &Task, view: &mut PolicyView) -> Target {
        if view.pool.tier_utilization(Tier::Edge) < self.threshold {
            Target::Edge
        } else {
            Target::Mobile
        }
    }
}
