//! Worst Fit heuristic.

use crate::orchestrator::vm_selector::{candidate_vms, VmSelector};
use crate::orchestrator::PolicyView;
use crate::resource_pool::{HostId, VmId};
use crate::task::Task;

/// Uses the suitable VM with the most residual capacity.
pub struct WorstFit;

impl WorstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmSelector for WorstFit {
    fn select_vm(&mut self, task: &Task, candidates: &[HostId], view: &PolicyView) -> Option<VmId> {
        let mut result: Option<VmId> = None;
        let mut max_residual = f64::NEG_INFINITY;

        for vm in candidate_vms(candidates, view) {
            if view.fits(task, vm) {
                let residual = view.pool.vm(vm)?.residual_capacity();
                if residual > max_residual {
                    max_residual = residual;
                    result = Some(vm);
                }
            }
        }
        result
    }
}
