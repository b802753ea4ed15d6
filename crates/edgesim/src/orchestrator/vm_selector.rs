//! VM selection heuristics.

use crate::config::options::parse_config_value;
use crate::error::SimulationError;
use crate::resource_pool::{HostId, VmId};
use crate::task::Task;

use super::vm_selectors::best_fit::BestFit;
use super::vm_selectors::first_fit::FirstFit;
use super::vm_selectors::next_fit::NextFit;
use super::vm_selectors::random_fit::RandomFit;
use super::vm_selectors::worst_fit::WorstFit;
use super::PolicyView;

/// Trait for implementation of VM selection heuristics.
///
/// The heuristic is defined as a function of task and candidate hosts, which returns an ID of VM
/// with enough residual capacity for the task or `None` if there is no suitable VM.
///
/// Selection must not change VM state, the capacity is reserved when the task starts execution.
pub trait VmSelector {
    fn select_vm(&mut self, task: &Task, candidates: &[HostId], view: &PolicyView) -> Option<VmId>;
}

pub fn vm_selector_resolver(config_str: &str) -> Result<Box<dyn VmSelector>, SimulationError> {
    let (selector_name, _) = parse_config_value(config_str);
    match selector_name.as_str() {
        "RandomFit" => Ok(Box::new(RandomFit::new())),
        "FirstFit" => Ok(Box::new(FirstFit::new())),
        "NextFit" => Ok(Box::new(NextFit::new())),
        "BestFit" => Ok(Box::new(BestFit::new())),
        "WorstFit" => Ok(Box::new(WorstFit::new())),
        _ => Err(SimulationError::config(format!("can't resolve VM selector: {}", config_str))),
    }
}

/// Returns VMs of candidate hosts in host order.
pub(crate) fn candidate_vms(candidates: &[HostId], view: &PolicyView) -> Vec<VmId> {
    candidates
        .iter()
        .filter_map(|&host| view.pool.host(host))
        .flat_map(|host| host.vms.iter().copied())
        .collect()
}
