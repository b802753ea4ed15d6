//! First Fit heuristic.

use crate::orchestrator::vm_selector::{candidate_vms, VmSelector};
use crate::orchestrator::PolicyView;
use crate::resource_pool::{HostId, VmId};
use crate::task::Task;

/// Uses the first suitable VM in host order.
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmSelector for FirstFit {
    fn select_vm(&mut self, task: &Task, candidates: &[HostId], view: &PolicyView) -> Option<VmId> {
        candidate_vms(candidates, view).into_iter().find(|&vm| view.fits(task, vm))
    }
}
