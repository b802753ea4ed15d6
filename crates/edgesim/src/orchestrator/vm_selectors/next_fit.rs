//! Next Fit heuristic.

use std::collections::HashMap;

use crate::orchestrator::vm_selector::VmSelector;
use crate::orchestrator::PolicyView;
use crate::resource_pool::{HostId, VmId};
use crate::task::Task;

/// Scans hosts cyclically starting after the last visited host, and VMs of each host
/// cyclically starting after the last visited VM of this host.
pub struct NextFit {
    last_host: Option<HostId>,
    vm_cursors: HashMap<HostId, usize>,
}

impl NextFit {
    pub fn new() -> Self {
        Self {
            last_host: None,
            vm_cursors: HashMap::new(),
        }
    }
}

impl VmSelector for NextFit {
    fn select_vm(&mut self, task: &Task, candidates: &[HostId], view: &PolicyView) -> Option<VmId> {
        if candidates.is_empty() {
            return None;
        }
        let start = match self.last_host {
            Some(last) => candidates.iter().position(|&h| h > last).unwrap_or(0),
            None => 0,
        };
        for i in 0..candidates.len() {
            let host_id = candidates[(start + i) % candidates.len()];
            self.last_host = Some(host_id);
            let host = match view.pool.host(host_id) {
                Some(host) => host,
                None => continue,
            };
            for _ in 0..host.vms.len() {
                let cursor = match self.vm_cursors.get(&host_id) {
                    Some(&c) => (c + 1) % host.vms.len(),
                    None => 0,
                };
                self.vm_cursors.insert(host_id, cursor);
                let vm = host.vms[cursor];
                if view.fits(task, vm) {
                    return Some(vm);
                }
            }
        }
        None
    }
}
