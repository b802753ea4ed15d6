use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

use edgesim::config::exp_config::ExperimentConfig;
use edgesim::error::SimulationError;
use edgesim::experiment::{Experiment, RunOutcome};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Runs batch experiment with EdgeSim
struct Args {
    /// Path to YAML file with experiment configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Number of threads to use
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    /// Directory for per-run task logs and results.json
    #[arg(short, long)]
    log_dir: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

fn init_logger(level: LevelFilter) {
    Builder::new()
        .filter_level(level)
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn main() -> Result<(), SimulationError> {
    let args = Args::parse();
    init_logger(args.log_level);

    let config = ExperimentConfig::from_file(&args.config.to_string_lossy())?;
    let experiment = Experiment::new(config, args.log_dir);
    let results = experiment.run(args.threads)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    println!(
        "{:>4}  {:<24} {:>8} {:>5}  {:>10} {:>10} {:>12}",
        "run", "scenario", "devices", "iter", "tasks", "failed %", "service (s)"
    );
    for result in results.iter() {
        match &result.outcome {
            RunOutcome::Completed { stats } => println!(
                "{:>4}  {:<24} {:>8} {:>5}  {:>10} {:>10.2} {:>12.3}",
                result.id,
                result.scenario,
                result.device_count,
                result.iteration,
                stats.total_tasks,
                stats.failure_rate,
                stats.avg_service_time
            ),
            RunOutcome::Aborted { error } => println!(
                "{:>4}  {:<24} {:>8} {:>5}  aborted: {}",
                result.id, result.scenario, result.device_count, result.iteration, error
            ),
        }
    }
    Ok(())
}
