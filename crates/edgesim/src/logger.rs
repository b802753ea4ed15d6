//! Per-task outcome log.

use std::collections::BTreeSet;
use std::fs::File;

use serde::Serialize;

use crate::error::SimulationError;
use crate::stats::{RunStats, StatsCollector};
use crate::task::{Task, TaskId, TaskStatus};

#[derive(Clone, Debug, Serialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub device: usize,
    pub app: usize,
    pub status: TaskStatus,
    pub tier: Option<String>,
    pub datacenter: Option<usize>,
    pub host: Option<usize>,
    pub vm: Option<usize>,
    pub network_error: Option<String>,
    pub created_at: f64,
    pub finished_at: f64,
    pub wlan_upload_delay: f64,
    pub man_upload_delay: f64,
    pub wan_upload_delay: f64,
    pub wlan_download_delay: f64,
    pub man_download_delay: f64,
    pub wan_download_delay: f64,
    pub processing_time: f64,
    pub service_time: f64,
    pub orchestrator_overhead: f64,
    pub in_warm_up: bool,
}

impl TaskRecord {
    fn new(task: &Task, warm_up_period: f64) -> Self {
        let placement = task.placement();
        Self {
            task_id: task.id,
            device: task.device,
            app: task.app,
            status: task.status(),
            tier: placement.map(|p| format!("{:?}", p.tier)),
            datacenter: placement.map(|p| p.datacenter),
            host: placement.map(|p| p.host),
            vm: placement.map(|p| p.vm),
            network_error: task.network_error.map(|link| format!("{:?}", link)),
            created_at: task.created_at,
            finished_at: task.finished_at.unwrap_or(task.created_at),
            wlan_upload_delay: task.upload_delay.wlan,
            man_upload_delay: task.upload_delay.man,
            wan_upload_delay: task.upload_delay.wan,
            wlan_download_delay: task.download_delay.wlan,
            man_download_delay: task.download_delay.man,
            wan_download_delay: task.download_delay.wan,
            processing_time: task.processing_time(),
            service_time: task.service_time(),
            orchestrator_overhead: task.orchestrator_overhead,
            in_warm_up: task.created_at < warm_up_period,
        }
    }
}

/// Records outcomes of finished tasks and aggregates statistics over the tasks created after the warm-up period.
pub struct TaskLogger {
    warm_up_period: f64,
    records: Vec<TaskRecord>,
    reported: BTreeSet<TaskId>,
    stats: StatsCollector,
}

impl TaskLogger {
    pub fn new(warm_up_period: f64) -> Self {
        Self {
            warm_up_period,
            records: Vec::new(),
            reported: BTreeSet::new(),
            stats: StatsCollector::new(),
        }
    }

    /// Records the outcome of a task in a terminal state, repeated reports of the same task are ignored.
    pub fn report(&mut self, task: &Task) {
        if !task.status().is_terminal() {
            log::warn!("Task {} is reported in non-terminal state {:?}", task.id, task.status());
            return;
        }
        if !self.reported.insert(task.id) {
            log::warn!("Task {} is already reported", task.id);
            return;
        }
        let record = TaskRecord::new(task, self.warm_up_period);
        if !record.in_warm_up {
            self.stats.update(task);
        }
        self.records.push(record);
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    pub fn stats(&self) -> RunStats {
        self.stats.stats()
    }

    /// Saves task records as CSV.
    pub fn save_csv(&self, path: &str) -> Result<(), SimulationError> {
        let file = File::create(path)?;
        let mut wtr = csv::Writer::from_writer(file);
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
