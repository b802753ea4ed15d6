//! Errors which abort a simulation run.

use thiserror::Error;

use crate::resource_pool::{HostId, Tier, VmId};
use crate::task::TaskId;

/// Unrecoverable error of a single simulation run.
///
/// Task-level failures (saturated links, lack of VM capacity, mobility) are not errors, they are reported
/// as task outcomes. This type covers configuration and programming errors only.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown event {type_name} received by {component}")]
    UnknownEvent { component: String, type_name: String },

    #[error("tier {0:?} is not available in this simulation")]
    UnknownTier(Tier),

    #[error("unknown edge host {0}")]
    UnknownHost(HostId),

    #[error("unknown VM {0}")]
    UnknownVm(VmId),

    #[error("event refers to unknown task {0}")]
    MissingTask(TaskId),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("can't parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("can't write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("can't write JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimulationError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }
}
