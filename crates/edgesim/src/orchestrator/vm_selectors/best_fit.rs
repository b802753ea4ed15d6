//! Best Fit heuristic.

use crate::orchestrator::vm_selector::{candidate_vms, VmSelector};
use crate::orchestrator::PolicyView;
use crate::resource_pool::{HostId, VmId};
use crate::task::Task;

/// Uses the suitable VM with the least residual capacity.
pub struct BestFit;

impl BestFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmSelector for BestFit {
    fn select_vm(&mut self, task: &Task, candidates: &[HostId], view: &PolicyView) -> Option<VmId> {
        let mut result: Option<VmId> = None;
        let mut min_residual = f64::INFINITY;

        for vm in candidate_vms(candidates, view) {
            if view.fits(task, vm) {
                let residual = view.pool.vm(vm)?.residual_capacity();
                if residual < min_residual {
                    min_residual = residual;
                    result = Some(vm);
                }
            }
        }
        result
    }
}
