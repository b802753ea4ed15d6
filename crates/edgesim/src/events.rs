//! Simulation events.

use serde::Serialize;

use edgesim_core::Id;

use crate::resource_pool::VmId;
use crate::task::{TaskId, TaskRequest};

// TASK LIFECYCLE EVENTS ///////////////////////////////////////////////////////////////////////////

/// Device submits a new task.
#[derive(Clone, Serialize)]
pub struct SubmitTask {
    pub request: TaskRequest,
}

/// Task input has been uploaded to the cloud.
#[derive(Clone, Serialize)]
pub struct RequestReceivedByCloud {
    pub task_id: TaskId,
}

/// Task input has been uploaded to the edge host behind the device access point.
#[derive(Clone, Serialize)]
pub struct RequestReceivedByEdge {
    pub task_id: TaskId,
}

/// Task is executed on the device itself.
#[derive(Clone, Serialize)]
pub struct RequestReceivedByMobile {
    pub task_id: TaskId,
}

/// Task input has reached the nearest edge host and has to be relayed to a remote one.
#[derive(Clone, Serialize)]
pub struct RequestForwardedToNeighbor {
    pub task_id: TaskId,
}

/// Task input has been relayed to the remote edge host.
#[derive(Clone, Serialize)]
pub struct RequestReceivedByRemoteEdge {
    pub task_id: TaskId,
}

/// VM has finished executing the task.
#[derive(Clone, Serialize)]
pub struct TaskExecuted {
    pub task_id: TaskId,
}

/// Task output has been relayed back to the edge host behind the device access point.
#[derive(Clone, Serialize)]
pub struct ResponseForwardedToNeighbor {
    pub task_id: TaskId,
}

/// Task output has been delivered to the device.
#[derive(Clone, Serialize)]
pub struct ResponseReceivedByMobile {
    pub task_id: TaskId,
}

// NETWORK EVENTS //////////////////////////////////////////////////////////////////////////////////

/// Periodic re-estimation of network model parameters.
#[derive(Clone, Serialize)]
pub struct UpdateNetworkModel {}

// EXECUTION EVENTS ////////////////////////////////////////////////////////////////////////////////

/// Request to run the task on the VM, sent by the lifecycle controller to the executor.
#[derive(Clone, Serialize)]
pub struct ExecuteTask {
    pub task_id: TaskId,
    pub vm: VmId,
    /// Task length in MI.
    pub length: f64,
    /// Predicted CPU utilization reserved on the VM.
    pub demand: f64,
    pub requester: Id,
}

#[derive(Clone, Serialize)]
pub struct ExecutionCompleted {
    pub task_id: TaskId,
    pub vm: VmId,
    pub demand: f64,
    pub requester: Id,
}

/// Executor could not run the task because the VM does not exist.
#[derive(Clone, Serialize)]
pub struct ExecutionRejected {
    pub task_id: TaskId,
    pub vm: VmId,
}
