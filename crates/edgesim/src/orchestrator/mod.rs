//! Placement policy: selection of the target tier and of the VM executing a task.

pub mod adaptive;
pub mod fuzzy;
pub mod tier_policy;
pub mod vm_selector;
pub mod vm_selectors;

use edgesim_core::SimulationContext;

use crate::config::sim_config::{ApplicationConfig, SimulationConfig};
use crate::error::SimulationError;
use crate::location::Location;
use crate::mobility::MobilityModel;
use crate::network::{NetworkModel, Route, Transfer};
use crate::resource_pool::{HostId, ResourcePool, Tier, VmId};
use crate::task::{DeviceId, Task};
use crate::utilization::CpuUtilizationModel;

use tier_policy::{tier_policy_resolver, TierPolicy};
use vm_selector::{vm_selector_resolver, VmSelector};

/// Size of the dummy payload (1 Mbit) used to probe WAN bandwidth, in KB.
pub const PROBE_SIZE: f64 = 128.;

/// Destination chosen by the tier policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// VM of the device itself.
    Mobile,
    /// Edge tier, the VM is chosen among candidate hosts according to the edge scope.
    Edge,
    /// Specific (possibly remote) edge host.
    EdgeHost(HostId),
    Cloud,
}

impl Target {
    pub fn tier(&self) -> Tier {
        match self {
            Target::Mobile => Tier::Mobile,
            Target::Edge | Target::EdgeHost(_) => Tier::Edge,
            Target::Cloud => Tier::Cloud,
        }
    }
}

/// Candidate hosts for the generic edge target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeScope {
    /// Hosts behind the access point serving the device.
    Nearest,
    /// All edge hosts.
    All,
}

impl EdgeScope {
    pub fn from_config(value: &str) -> Result<Self, SimulationError> {
        match value.to_lowercase().as_str() {
            "nearest" => Ok(EdgeScope::Nearest),
            "all" => Ok(EdgeScope::All),
            _ => Err(SimulationError::config(format!("unsupported edge scope: {}", value))),
        }
    }
}

/// State of the simulation visible to the placement policy.
///
/// Policies may probe the network model but never modify VM state.
pub struct PolicyView<'a> {
    pub time: f64,
    /// Outcomes of tasks submitted before this time are not accounted in statistics.
    pub warm_up_period: f64,
    /// Device location at submission time.
    pub location: Location,
    pub pool: &'a ResourcePool,
    pub utilization: &'a dyn CpuUtilizationModel,
    pub network: &'a mut dyn NetworkModel,
    pub mobility: &'a dyn MobilityModel,
    pub apps: &'a [ApplicationConfig],
    pub ctx: &'a SimulationContext,
}

impl<'a> PolicyView<'a> {
    pub fn app(&self, task: &Task) -> Option<&ApplicationConfig> {
        self.apps.get(task.app)
    }

    /// Predicted CPU demand of the task on the VM.
    pub fn demand(&self, task: &Task, vm: VmId) -> f64 {
        match self.pool.vm(vm) {
            Some(vm) => self.utilization.predict(task, vm),
            None => f64::INFINITY,
        }
    }

    /// Checks whether the VM has enough residual capacity for the task.
    pub fn fits(&self, task: &Task, vm: VmId) -> bool {
        match self.pool.vm(vm) {
            Some(vm) => vm.residual_capacity() >= self.utilization.predict(task, vm),
            None => false,
        }
    }

    /// Estimates WAN bandwidth (Mbps) available to the device by probing the cloud route, `0` if it is saturated.
    pub fn estimate_wan_bandwidth(&mut self, device: DeviceId) -> f64 {
        let delay = self
            .network
            .upload_delay(self.time, &Transfer::probe(device, Route::Cloud, PROBE_SIZE));
        if delay > 0. {
            1. / delay
        } else {
            0.
        }
    }

    /// Upload plus download delay of the task over the route, each saturated direction counts as `saturated`.
    pub fn estimate_round_trip(&mut self, task: &Task, route: Route, saturated: f64) -> f64 {
        let upload = self.network.upload_delay(self.time, &Transfer::upload(task, route));
        let download = self.network.download_delay(self.time, &Transfer::download(task, route));
        let or_saturated = |delay: f64| if delay > 0. { delay } else { saturated };
        or_saturated(upload) + or_saturated(download)
    }

    /// Speed of the first VM of the tier.
    pub fn tier_mips(&self, tier: Tier) -> Option<f64> {
        self.pool
            .hosts(tier)
            .into_iter()
            .filter_map(|h| self.pool.host(h))
            .flat_map(|host| host.vms.iter())
            .find_map(|&vm| self.pool.vm(vm))
            .map(|vm| vm.mips)
    }

    /// Edge hosts behind the device access point.
    pub fn nearest_edge_hosts(&self) -> Vec<HostId> {
        self.pool
            .hosts(Tier::Edge)
            .into_iter()
            .filter(|&h| {
                self.pool
                    .host(h)
                    .and_then(|host| host.location)
                    .map_or(false, |l| l.access_point == self.location.access_point)
            })
            .collect()
    }
}

/// Two-part placement decision: target tier, then VM on that tier.
pub struct EdgeOrchestrator {
    tier_policy: Box<dyn TierPolicy>,
    vm_selector: Box<dyn VmSelector>,
    edge_scope: EdgeScope,
}

impl EdgeOrchestrator {
    pub fn new(tier_policy: Box<dyn TierPolicy>, vm_selector: Box<dyn VmSelector>, edge_scope: EdgeScope) -> Self {
        Self {
            tier_policy,
            vm_selector,
            edge_scope,
        }
    }

    /// Creates orchestrator with policies given in the config.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimulationError> {
        Ok(Self::new(
            tier_policy_resolver(&config.tier_policy)?,
            vm_selector_resolver(&config.vm_selector)?,
            EdgeScope::from_config(&config.edge_scope)?,
        ))
    }

    pub fn choose_target(&mut self, task: &Task, view: &mut PolicyView) -> Target {
        self.tier_policy.choose_target(task, view)
    }

    /// Reports the outcome of a finished task to the tier policy.
    pub fn task_finished(&mut self, task: &Task) {
        self.tier_policy.task_finished(task);
    }

    /// Returns candidate hosts for the target, fails if the target refers to infrastructure that does not exist.
    pub fn candidates(&self, task: &Task, target: Target, view: &PolicyView) -> Result<Vec<HostId>, SimulationError> {
        let pool = view.pool;
        match target {
            Target::Mobile => match pool.mobile_vm(task.device).and_then(|vm| pool.vm(vm)) {
                Some(vm) => Ok(vec![vm.host]),
                None => Err(SimulationError::UnknownTier(Tier::Mobile)),
            },
            Target::Cloud => {
                if !pool.has_tier(Tier::Cloud) {
                    return Err(SimulationError::UnknownTier(Tier::Cloud));
                }
                Ok(pool.hosts(Tier::Cloud))
            }
            Target::Edge => {
                if !pool.has_tier(Tier::Edge) {
                    return Err(SimulationError::UnknownTier(Tier::Edge));
                }
                match self.edge_scope {
                    EdgeScope::Nearest => Ok(view.nearest_edge_hosts()),
                    EdgeScope::All => Ok(pool.hosts(Tier::Edge)),
                }
            }
            Target::EdgeHost(host) => match pool.host(host) {
                Some(h) if h.tier == Tier::Edge => Ok(vec![host]),
                _ => Err(SimulationError::UnknownHost(host)),
            },
        }
    }

    /// Selects VM among candidate hosts, `None` if no VM has enough residual capacity.
    pub fn choose_vm(&mut self, task: &Task, candidates: &[HostId], view: &PolicyView) -> Option<VmId> {
        self.vm_selector.select_vm(task, candidates, view)
    }
}
