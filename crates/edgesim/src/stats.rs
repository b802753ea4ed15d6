//! Aggregated statistics of a simulation run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::network::Link;
use crate::resource_pool::Tier;
use crate::task::{Task, TaskStatus};

#[derive(Clone, Default, Debug)]
pub struct SampleMetric {
    data: Vec<f64>,
}

impl SampleMetric {
    pub fn add(&mut self, x: f64) {
        self.data.push(x);
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Returns the sample mean, `0` for an empty sample.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.;
        }
        self.sum() / (self.data.len() as f64)
    }
}

#[derive(Clone, Default, Debug, Serialize)]
pub struct TierStats {
    pub completed: u64,
    pub failed: u64,
    pub avg_service_time: f64,
    pub avg_processing_time: f64,
    pub avg_network_delay: f64,
}

#[derive(Default)]
struct TierMetrics {
    completed: u64,
    failed: u64,
    service_time: SampleMetric,
    processing_time: SampleMetric,
    network_delay: SampleMetric,
}

/// Statistics over the tasks created after the warm-up period.
#[derive(Clone, Default, Debug, Serialize)]
pub struct RunStats {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    /// Percentage of failed tasks among all tasks.
    pub failure_rate: f64,
    pub tasks_by_status: BTreeMap<TaskStatus, u64>,
    pub tiers: BTreeMap<Tier, TierStats>,
    /// Network failures by the link which caused them.
    pub network_failures: BTreeMap<Link, u64>,
    pub avg_service_time: f64,
    pub avg_processing_time: f64,
    pub avg_network_delay: f64,
    pub avg_upload_delay: BTreeMap<Link, f64>,
    pub avg_download_delay: BTreeMap<Link, f64>,
    /// Average wall-clock duration of the tier decision in seconds.
    pub avg_orchestrator_overhead: f64,
}

/// Accumulates statistics of finished tasks.
#[derive(Default)]
pub struct StatsCollector {
    by_status: BTreeMap<TaskStatus, u64>,
    tiers: BTreeMap<Tier, TierMetrics>,
    network_failures: BTreeMap<Link, u64>,
    service_time: SampleMetric,
    processing_time: SampleMetric,
    network_delay: SampleMetric,
    upload_delay: BTreeMap<Link, SampleMetric>,
    download_delay: BTreeMap<Link, SampleMetric>,
    orchestrator_overhead: SampleMetric,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, task: &Task) {
        let status = task.status();
        *self.by_status.entry(status).or_default() += 1;
        self.orchestrator_overhead.add(task.orchestrator_overhead);
        if let Some(link) = task.network_error {
            *self.network_failures.entry(link).or_default() += 1;
        }
        let tier = task.placement().map(|p| p.tier);
        if status == TaskStatus::Completed {
            self.service_time.add(task.service_time());
            self.processing_time.add(task.processing_time());
            self.network_delay.add(task.network_delay());
            for link in [Link::Wlan, Link::Man, Link::Wan] {
                if task.upload_delay.get(link) > 0. {
                    self.upload_delay.entry(link).or_default().add(task.upload_delay.get(link));
                }
                if task.download_delay.get(link) > 0. {
                    self.download_delay
                        .entry(link)
                        .or_default()
                        .add(task.download_delay.get(link));
                }
            }
        }
        if let Some(tier) = tier {
            let metrics = self.tiers.entry(tier).or_default();
            if status == TaskStatus::Completed {
                metrics.completed += 1;
                metrics.service_time.add(task.service_time());
                metrics.processing_time.add(task.processing_time());
                metrics.network_delay.add(task.network_delay());
            } else {
                metrics.failed += 1;
            }
        }
    }

    pub fn stats(&self) -> RunStats {
        let total_tasks = self.by_status.values().sum::<u64>();
        let completed_tasks = self.by_status.get(&TaskStatus::Completed).copied().unwrap_or(0);
        let failed_tasks = self
            .by_status
            .iter()
            .filter(|(status, _)| status.is_failure())
            .map(|(_, count)| count)
            .sum::<u64>();
        let failure_rate = if total_tasks > 0 {
            100. * failed_tasks as f64 / total_tasks as f64
        } else {
            0.
        };
        let tiers = self
            .tiers
            .iter()
            .map(|(tier, metrics)| {
                (
                    *tier,
                    TierStats {
                        completed: metrics.completed,
                        failed: metrics.failed,
                        avg_service_time: metrics.service_time.mean(),
                        avg_processing_time: metrics.processing_time.mean(),
                        avg_network_delay: metrics.network_delay.mean(),
                    },
                )
            })
            .collect();
        RunStats {
            total_tasks,
            completed_tasks,
            failed_tasks,
            failure_rate,
            tasks_by_status: self.by_status.clone(),
            tiers,
            network_failures: self.network_failures.clone(),
            avg_service_time: self.service_time.mean(),
            avg_processing_time: self.processing_time.mean(),
            avg_network_delay: self.network_delay.mean(),
            avg_upload_delay: self.upload_delay.iter().map(|(l, m)| (*l, m.mean())).collect(),
            avg_download_delay: self.download_delay.iter().map(|(l, m)| (*l, m.mean())).collect(),
            avg_orchestrator_overhead: self.orchestrator_overhead.mean(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_metric_has_zero_mean() {
        let mut metric = SampleMetric::default();
        assert_eq!(metric.mean(), 0.);
        metric.add(1.);
        metric.add(2.);
        assert_eq!(metric.count(), 2);
        assert_eq!(metric.mean(), 1.5);
    }

    #[test]
    fn empty_run_has_zero_failure_rate() {
        let stats = StatsCollector::new().stats();
        assert_eq!(stats.total_tasks, 0);
        assert_eq!(stats.failure_rate, 0.);
    }
}
