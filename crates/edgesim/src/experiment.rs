//! Tools for running experiments with multiple simulation runs.

use std::fs;
use std::fs::File;
use std::sync::{Arc, Mutex};

use indexmap::map::IndexMap;
use serde::Serialize;
use threadpool::ThreadPool;

use edgesim_core::Simulation;

use crate::config::exp_config::{ExperimentConfig, RunConfig};
use crate::error::SimulationError;
use crate::simulation::EdgeSimulation;
use crate::stats::RunStats;

/// Outcome of a single simulation run.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status")]
pub enum RunOutcome {
    Completed { stats: RunStats },
    Aborted { error: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct RunResult {
    pub id: usize,
    pub scenario: String,
    pub device_count: usize,
    pub iteration: u32,
    pub seed: u64,
    pub outcome: RunOutcome,
}

impl RunResult {
    fn to_row(&self) -> Result<IndexMap<String, serde_json::Value>, SimulationError> {
        let mut row = IndexMap::new();
        row.insert("id".to_string(), serde_json::to_value(self.id)?);
        row.insert("scenario".to_string(), serde_json::to_value(&self.scenario)?);
        row.insert("device_count".to_string(), serde_json::to_value(self.device_count)?);
        row.insert("iteration".to_string(), serde_json::to_value(self.iteration)?);
        row.insert("seed".to_string(), serde_json::to_value(self.seed)?);
        match &self.outcome {
            RunOutcome::Completed { stats } => {
                row.insert("status".to_string(), serde_json::to_value("completed")?);
                row.insert("results".to_string(), serde_json::to_value(stats)?);
            }
            RunOutcome::Aborted { error } => {
                row.insert("status".to_string(), serde_json::to_value("aborted")?);
                row.insert("error".to_string(), serde_json::to_value(error)?);
            }
        }
        Ok(row)
    }
}

/// Implements execution of experiment.
pub struct Experiment {
    pub config: ExperimentConfig,
    pub log_dir: Option<String>,
}

impl Experiment {
    pub fn new(config: ExperimentConfig, log_dir: Option<String>) -> Self {
        Self { config, log_dir }
    }

    /// Runs the experiment using the specified number of threads.
    ///
    /// A run aborted by a fatal error does not stop other runs, it is reported in the results.
    pub fn run(&self, num_threads: usize) -> Result<Vec<RunResult>, SimulationError> {
        if let Some(dir) = self.log_dir.as_ref() {
            fs::create_dir_all(dir)?;
        }
        let results = Arc::new(Mutex::new(Vec::new()));
        let pool = ThreadPool::new(num_threads.max(1));

        for run in self.config.runs()? {
            let log_file = self.log_dir.as_ref().map(|dir| format!("{}/log_{}.csv", dir, run.id));
            let results = results.clone();
            pool.execute(move || {
                log::info!(
                    "RUN {}: scenario {}, {} devices, iteration {}",
                    run.id,
                    run.scenario,
                    run.device_count,
                    run.iteration
                );
                let outcome = match run_simulation(&run, log_file) {
                    Ok(stats) => RunOutcome::Completed { stats },
                    Err(e) => {
                        log::error!("Run {} is aborted: {}", run.id, e);
                        RunOutcome::Aborted { error: e.to_string() }
                    }
                };
                let result = RunResult {
                    id: run.id,
                    scenario: run.scenario,
                    device_count: run.device_count,
                    iteration: run.iteration,
                    seed: run.seed,
                    outcome,
                };
                match results.lock() {
                    Ok(mut results) => results.push(result),
                    Err(poisoned) => poisoned.into_inner().push(result),
                }
            });
        }

        pool.join();
        let mut results = match results.lock() {
            Ok(results) => results.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        results.sort_by_key(|r| r.id);

        if let Some(dir) = self.log_dir.as_ref() {
            let rows = results.iter().map(|r| r.to_row()).collect::<Result<Vec<_>, _>>()?;
            let mut file = File::create(format!("{}/results.json", dir))?;
            serde_json::to_writer_pretty(&mut file, &rows)?;
        }
        Ok(results)
    }
}

fn run_simulation(run: &RunConfig, log_file: Option<String>) -> Result<RunStats, SimulationError> {
    let sim = Simulation::new(run.seed);
    let mut edge_sim = EdgeSimulation::new(sim, run.config.clone(), run.device_count)?;
    edge_sim.generate_load()?;
    let stats = edge_sim.run()?;
    if let Some(log_file) = log_file {
        edge_sim.save_log(&log_file)?;
        log::info!("Log for run {} saved to file: {}", run.id, log_file);
    }
    Ok(stats)
}
