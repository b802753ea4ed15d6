//! Random Fit heuristic.

use crate::orchestrator::vm_selector::VmSelector;
use crate::orchestrator::PolicyView;
use crate::resource_pool::{HostId, VmId};
use crate::task::Task;

/// Picks a random VM of a random candidate host and uses it if it is suitable.
pub struct RandomFit;

impl RandomFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmSelector for RandomFit {
    fn select_vm(&mut self, task: &Task, candidates: &[HostId], view: &PolicyView) -> Option<VmId> {
        if candidates.is_empty() {
            return None;
        }
        let host = view.pool.host(candidates[view.ctx.gen_range(0..candidates.len())])?;
        if host.vms.is_empty() {
            return None;
        }
        let vm = host.vms[view.ctx.gen_range(0..host.vms.len())];
        if view.fits(task, vm) {
            Some(vm)
        } else {
            None
        }
    }
}
