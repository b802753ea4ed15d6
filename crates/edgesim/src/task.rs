//! Offloaded tasks and their lifecycle states.

use serde::{Deserialize, Serialize};

use crate::location::Location;
use crate::network::Link;
use crate::resource_pool::{HostId, Tier, VmId};

pub type TaskId = u64;
pub type DeviceId = usize;

/// Task properties produced by a load generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub device: DeviceId,
    /// Index of the application profile.
    pub app: usize,
    /// Submission time.
    pub start_time: f64,
    /// Task length in MI.
    pub length: f64,
    /// Input size in KB.
    pub input_size: f64,
    /// Output size in KB.
    pub output_size: f64,
    pub cores: u32,
}

/// Lifecycle state of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskStatus {
    Created,
    Uploading,
    Processing,
    Downloading,
    Completed,
    RejectedCapacity,
    RejectedBandwidth,
    FailedBandwidth,
    FailedMobility,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed
                | TaskStatus::RejectedCapacity
                | TaskStatus::RejectedBandwidth
                | TaskStatus::FailedBandwidth
                | TaskStatus::FailedMobility
        )
    }

    pub fn is_failure(&self) -> bool {
        self.is_terminal() && *self != TaskStatus::Completed
    }
}

/// VM chosen for a task together with its location in the datacenter hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub tier: Tier,
    pub datacenter: usize,
    pub host: HostId,
    pub vm: VmId,
    /// Access point of the executing host, for edge hosts.
    pub access_point: Option<usize>,
}

/// Transfer delays of a task split by link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkDelays {
    pub wlan: f64,
    pub man: f64,
    pub wan: f64,
}

impl LinkDelays {
    pub fn set(&mut self, link: Link, delay: f64) {
        match link {
            Link::Wlan => self.wlan = delay,
            Link::Man => self.man = delay,
            Link::Wan => self.wan = delay,
        }
    }

    pub fn get(&self, link: Link) -> f64 {
        match link {
            Link::Wlan => self.wlan,
            Link::Man => self.man,
            Link::Wan => self.wan,
        }
    }

    pub fn total(&self) -> f64 {
        self.wlan + self.man + self.wan
    }
}

/// Task tracked by the lifecycle controller.
#[derive(Clone, Debug, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub device: DeviceId,
    pub app: usize,
    pub length: f64,
    pub input_size: f64,
    pub output_size: f64,
    pub cores: u32,
    submitted_location: Option<Location>,
    placement: Option<Placement>,
    status: TaskStatus,
    pub created_at: f64,
    pub execution_started_at: Option<f64>,
    pub executed_at: Option<f64>,
    pub finished_at: Option<f64>,
    pub upload_delay: LinkDelays,
    pub download_delay: LinkDelays,
    /// Wall-clock duration of the tier decision in seconds.
    pub orchestrator_overhead: f64,
    /// Link which caused a network failure.
    pub network_error: Option<Link>,
}

impl Task {
    pub fn new(id: TaskId, request: &TaskRequest, created_at: f64) -> Self {
        Self {
            id,
            device: request.device,
            app: request.app,
            length: request.length,
            input_size: request.input_size,
            output_size: request.output_size,
            cores: request.cores,
            submitted_location: None,
            placement: None,
            status: TaskStatus::Created,
            created_at,
            execution_started_at: None,
            executed_at: None,
            finished_at: None,
            upload_delay: LinkDelays::default(),
            download_delay: LinkDelays::default(),
            orchestrator_overhead: 0.,
            network_error: None,
        }
    }

    /// Stamps the location of the device at submission time. Can be called only once.
    pub fn set_submitted_location(&mut self, location: Location) {
        assert!(
            self.submitted_location.is_none(),
            "Submitted location of task {} is already set",
            self.id
        );
        self.submitted_location = Some(location);
    }

    pub fn submitted_location(&self) -> Option<&Location> {
        self.submitted_location.as_ref()
    }

    /// Binds the task to the chosen VM. Can be called only once.
    pub fn bind(&mut self, placement: Placement) {
        assert!(self.placement.is_none(), "Task {} is already placed", self.id);
        self.placement = Some(placement);
    }

    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Changes task status, returns false if the task is already in a terminal state.
    pub fn set_status(&mut self, status: TaskStatus) -> bool {
        if self.status.is_terminal() {
            log::warn!(
                "Ignored transition of task {} from terminal state {:?} to {:?}",
                self.id,
                self.status,
                status
            );
            return false;
        }
        self.status = status;
        true
    }

    /// Time spent on the VM.
    pub fn processing_time(&self) -> f64 {
        match (self.execution_started_at, self.executed_at) {
            (Some(start), Some(end)) => end - start,
            _ => 0.,
        }
    }

    /// Time from creation to the terminal transition.
    pub fn service_time(&self) -> f64 {
        self.finished_at.map(|t| t - self.created_at).unwrap_or(0.)
    }

    pub fn network_delay(&self) -> f64 {
        self.upload_delay.total() + self.download_delay.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TaskRequest {
        TaskRequest {
            device: 0,
            app: 0,
            start_time: 0.,
            length: 4000.,
            input_size: 100.,
            output_size: 50.,
            cores: 1,
        }
    }

    #[test]
    fn terminal_states_are_exclusive() {
        let mut task = Task::new(1, &request(), 0.);
        assert!(task.set_status(TaskStatus::Uploading));
        assert!(task.set_status(TaskStatus::FailedMobility));
        for status in [TaskStatus::Completed, TaskStatus::Processing, TaskStatus::RejectedCapacity] {
            assert!(!task.set_status(status));
            assert_eq!(task.status(), TaskStatus::FailedMobility);
        }
    }

    #[test]
    #[should_panic(expected = "already placed")]
    fn placement_is_set_once() {
        let mut task = Task::new(1, &request(), 0.);
        let placement = Placement {
            tier: Tier::Edge,
            datacenter: 0,
            host: 0,
            vm: 0,
            access_point: Some(0),
        };
        task.bind(placement);
        task.bind(placement);
    }

    #[test]
    #[should_panic(expected = "already set")]
    fn submitted_location_is_immutable() {
        let mut task = Task::new(1, &request(), 0.);
        task.set_submitted_location(Location::new(0, 0, 0., 0.));
        task.set_submitted_location(Location::new(0, 1, 1., 0.));
    }

    #[test]
    fn delays_by_link() {
        let mut delays = LinkDelays::default();
        delays.set(Link::Wlan, 0.5);
        delays.set(Link::Wan, 1.);
        assert_eq!(delays.get(Link::Man), 0.);
        assert_eq!(delays.total(), 1.5);
    }
}
