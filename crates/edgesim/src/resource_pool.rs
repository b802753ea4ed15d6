//! Resource pool state: hosts and VMs of all tiers and their CPU utilization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::sim_config::SimulationConfig;
use crate::location::Location;
use crate::task::{DeviceId, Placement};

pub type HostId = usize;
pub type VmId = usize;

/// Logical execution location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Mobile,
    Edge,
    Cloud,
}

/// Virtual machine with its speed and current CPU utilization in percent.
#[derive(Clone, Debug, Serialize)]
pub struct Vm {
    pub id: VmId,
    pub host: HostId,
    pub tier: Tier,
    pub mips: f64,
    pub cores: u32,
    pub utilization: f64,
    /// Number of tasks being executed.
    pub running: u32,
}

impl Vm {
    /// Available headroom for new tasks in percent.
    pub fn residual_capacity(&self) -> f64 {
        100. - self.utilization
    }
}

/// Physical host belonging to a datacenter of some tier.
#[derive(Clone, Debug, Serialize)]
pub struct Host {
    pub id: HostId,
    pub datacenter: usize,
    pub tier: Tier,
    /// Location of the access point serving an edge host.
    pub location: Option<Location>,
    /// Owner of a mobile host.
    pub device: Option<DeviceId>,
    pub vms: Vec<VmId>,
}

/// Stores hosts and VMs of the simulated infrastructure.
#[derive(Clone, Default)]
pub struct ResourcePool {
    hosts: Vec<Host>,
    vms: Vec<Vm>,
    mobile_vms: BTreeMap<DeviceId, VmId>,
}

impl ResourcePool {
    /// Creates empty resource pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the infrastructure described by the config.
    ///
    /// Edge datacenters get ids in config order, followed by the cloud datacenter and the datacenter
    /// grouping all mobile devices.
    pub fn from_config(config: &SimulationConfig, device_count: usize) -> Self {
        let mut pool = Self::new();
        for (dc_id, dc) in config.edge_datacenters.iter().enumerate() {
            let location = Location::new(
                dc.location.place_type,
                dc.location.access_point,
                dc.location.x,
                dc.location.y,
            );
            for host_config in dc.hosts.iter() {
                for _ in 0..host_config.count.unwrap_or(1) {
                    let host = pool.add_host(dc_id, Tier::Edge, Some(location), None);
                    for vm_config in host_config.vms.iter() {
                        for _ in 0..vm_config.count.unwrap_or(1) {
                            pool.add_vm(host, vm_config.mips, vm_config.cores);
                        }
                    }
                }
            }
        }
        let cloud_dc = config.edge_datacenters.len();
        if let Some(cloud) = config.cloud.as_ref() {
            for _ in 0..cloud.hosts {
                let host = pool.add_host(cloud_dc, Tier::Cloud, None, None);
                for _ in 0..cloud.vms_per_host {
                    pool.add_vm(host, cloud.vm_mips, cloud.vm_cores);
                }
            }
        }
        if let Some(mobile) = config.mobile_vm.as_ref() {
            for device in 0..device_count {
                let host = pool.add_host(cloud_dc + 1, Tier::Mobile, None, Some(device));
                pool.add_vm(host, mobile.mips, mobile.cores);
            }
        }
        pool
    }

    /// Adds host to resource pool.
    pub fn add_host(
        &mut self,
        datacenter: usize,
        tier: Tier,
        location: Option<Location>,
        device: Option<DeviceId>,
    ) -> HostId {
        let id = self.hosts.len();
        self.hosts.push(Host {
            id,
            datacenter,
            tier,
            location,
            device,
            vms: Vec::new(),
        });
        id
    }

    /// Adds VM to the host.
    pub fn add_vm(&mut self, host: HostId, mips: f64, cores: u32) -> VmId {
        let id = self.vms.len();
        let host = &mut self.hosts[host];
        host.vms.push(id);
        if let Some(device) = host.device {
            self.mobile_vms.entry(device).or_insert(id);
        }
        self.vms.push(Vm {
            id,
            host: host.id,
            tier: host.tier,
            mips,
            cores,
            utilization: 0.,
            running: 0,
        });
        id
    }

    pub fn host(&self, id: HostId) -> Option<&Host> {
        self.hosts.get(id)
    }

    pub fn vm(&self, id: VmId) -> Option<&Vm> {
        self.vms.get(id)
    }

    /// Returns IDs of hosts of the given tier.
    pub fn hosts(&self, tier: Tier) -> Vec<HostId> {
        self.hosts.iter().filter(|h| h.tier == tier).map(|h| h.id).collect()
    }

    pub fn has_tier(&self, tier: Tier) -> bool {
        self.hosts.iter().any(|h| h.tier == tier && !h.vms.is_empty())
    }

    /// Returns the VM of a mobile device.
    pub fn mobile_vm(&self, device: DeviceId) -> Option<VmId> {
        self.mobile_vms.get(&device).copied()
    }

    /// Average utilization of host VMs.
    pub fn host_utilization(&self, host: HostId) -> f64 {
        let host = &self.hosts[host];
        if host.vms.is_empty() {
            return 0.;
        }
        host.vms.iter().map(|&vm| self.vms[vm].utilization).sum::<f64>() / host.vms.len() as f64
    }

    /// Average utilization of all VMs of the tier.
    pub fn tier_utilization(&self, tier: Tier) -> f64 {
        let (sum, count) = self
            .vms
            .iter()
            .filter(|vm| vm.tier == tier)
            .fold((0., 0), |(sum, count), vm| (sum + vm.utilization, count + 1));
        if count == 0 {
            0.
        } else {
            sum / count as f64
        }
    }

    /// Describes the position of the VM in the datacenter hierarchy.
    pub fn placement(&self, vm: VmId) -> Placement {
        let vm = &self.vms[vm];
        let host = &self.hosts[vm.host];
        Placement {
            tier: vm.tier,
            datacenter: host.datacenter,
            host: host.id,
            vm: vm.id,
            access_point: host.location.map(|l| l.access_point),
        }
    }

    /// Occupies `demand` percent of VM CPU.
    pub fn reserve(&mut self, vm: VmId, demand: f64) {
        let vm = &mut self.vms[vm];
        vm.utilization += demand;
        vm.running += 1;
    }

    /// Frees `demand` percent of VM CPU.
    pub fn release(&mut self, vm: VmId, demand: f64) {
        let vm = &mut self.vms[vm];
        vm.utilization = (vm.utilization - demand).max(0.);
        vm.running = vm.running.saturating_sub(1);
        if vm.running == 0 {
            vm.utilization = 0.;
        }
    }
}
