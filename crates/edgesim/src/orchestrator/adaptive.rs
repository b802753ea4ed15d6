//! Tier policies which learn from outcomes of earlier tasks.
//!
//! Each policy chooses between two arms, the edge tier behind the device's access point and the cloud,
//! and remembers its choice until the task finishes.

use std::collections::HashMap;

use crate::network::Route;
use crate::resource_pool::Tier;
use crate::task::{DeviceId, Task, TaskId};

use super::tier_policy::TierPolicy;
use super::{PolicyView, Target};

/// Transfer delay assumed for a saturated WLAN hop, in seconds.
pub const SATURATED_WLAN_DELAY: f64 = 9.;
/// Transfer delay assumed for a saturated cloud route, in seconds.
pub const SATURATED_CLOUD_DELAY: f64 = 7.;
/// Delay requirement used for applications which do not set one, in seconds.
pub const DEFAULT_MAX_DELAY_REQUIREMENT: f64 = 1.;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Arm {
    Edge,
    Cloud,
}

const ARMS: [Arm; 2] = [Arm::Edge, Arm::Cloud];

impl Arm {
    fn index(&self) -> usize {
        match self {
            Arm::Edge => 0,
            Arm::Cloud => 1,
        }
    }

    fn target(&self) -> Target {
        match self {
            Arm::Edge => Target::Edge,
            Arm::Cloud => Target::Cloud,
        }
    }
}

/// Expected service time of the task on each arm with idle VMs.
fn expected_delays(task: &Task, view: &mut PolicyView) -> [f64; 2] {
    let edge_mips = view.tier_mips(Tier::Edge).unwrap_or(0.);
    let cloud_mips = view.tier_mips(Tier::Cloud).unwrap_or(0.);
    [
        view.estimate_round_trip(task, Route::Edge, SATURATED_WLAN_DELAY) + processing_time(task.length, edge_mips, 0.),
        view.estimate_round_trip(task, Route::Cloud, SATURATED_CLOUD_DELAY)
            + processing_time(task.length, cloud_mips, 0.),
    ]
}

/// Processing time of `length` MI on a VM of the given speed, stretched by its utilization in percent.
fn processing_time(length: f64, mips: f64, utilization: f64) -> f64 {
    if mips <= 0. {
        return f64::INFINITY;
    }
    length / mips * 100. / (100. - utilization).max(1.)
}

/// Arm used when one of the tiers is missing.
fn only_available_arm(view: &PolicyView) -> Option<Arm> {
    match (view.pool.has_tier(Tier::Edge), view.pool.has_tier(Tier::Cloud)) {
        (true, false) => Some(Arm::Edge),
        (false, true) => Some(Arm::Cloud),
        _ => None,
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Upper confidence bound bandit minimizing the service time per MI.
///
/// Both arms are seeded with the expected service time of the first task. Failed tasks are accounted
/// with the delay requirement of their application.
pub struct Mab {
    beta: f64,
    length_range: Option<(f64, f64)>,
    pulls: [u32; 2],
    utility: [f64; 2],
    round: u32,
    decisions: HashMap<TaskId, (Arm, f64)>,
}

impl Mab {
    pub fn new(beta: f64) -> Self {
        Self {
            beta,
            length_range: None,
            pulls: [0; 2],
            utility: [0.; 2],
            round: 1,
            decisions: HashMap::new(),
        }
    }

    fn normalized_length(&self, length: f64) -> f64 {
        match self.length_range {
            Some((min, max)) if max > min => ((length - min) / (max - min)).clamp(0., 1.),
            _ => 0.,
        }
    }

    /// Arm with the lowest lower confidence bound of the utility.
    fn best_arm(&self, length: f64) -> Arm {
        let exploration = self.beta * (1. - self.normalized_length(length)) * (self.round as f64).ln();
        let bound = |arm: &Arm| {
            let i = arm.index();
            self.utility[i] - (exploration / self.pulls[i] as f64).sqrt()
        };
        ARMS.into_iter()
            .min_by(|a, b| bound(a).total_cmp(&bound(b)))
            .unwrap_or(Arm::Edge)
    }

    fn update(&mut self, arm: Arm, service_time: f64, length: f64) {
        let i = arm.index();
        let pulls = self.pulls[i] as f64;
        self.utility[i] = (self.utility[i] * pulls + service_time / length) / (pulls + 1.);
        self.pulls[i] += 1;
        self.round += 1;
    }
}

impl TierPolicy for Mab {
    fn choose_target(&mut self, task: &Task, view: &mut PolicyView) -> Target {
        let app = view.app(task);
        let failure_cost = app
            .map(|app| app.max_delay_requirement)
            .filter(|&delay| delay > 0.)
            .unwrap_or(DEFAULT_MAX_DELAY_REQUIREMENT);
        let arm = match only_available_arm(view) {
            Some(arm) => arm,
            None => {
                if self.length_range.is_none() {
                    let lengths = view.apps.iter().map(|app| app.task_length);
                    let min = lengths.clone().fold(f64::INFINITY, f64::min);
                    let max = lengths.fold(0., f64::max);
                    self.length_range = Some((min, max));
                    let delays = expected_delays(task, view);
                    for arm in ARMS {
                        self.pulls[arm.index()] = 1;
                        self.utility[arm.index()] = delays[arm.index()] / task.length;
                    }
                }
                self.best_arm(task.length)
            }
        };
        self.decisions.insert(task.id, (arm, failure_cost));
        arm.target()
    }

    fn task_finished(&mut self, task: &Task) {
        let (arm, failure_cost) = match self.decisions.remove(&task.id) {
            Some(decision) => decision,
            None => return,
        };
        if self.length_range.is_none() || task.length <= 0. {
            return;
        }
        let service_time = match task.service_time() {
            time if task.status().is_failure() || time <= 0. => failure_cost,
            time => time,
        };
        self.update(arm, service_time, task.length);
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Devices play a non-cooperative game for the edge tier.
///
/// Each device offloads to the cloud with probability `p`, its share of the equilibrium computed from the
/// difference between the expected edge and cloud delays and from the shares and arrival rates of the
/// other devices.
pub struct GameTheory {
    pricing_factor: f64,
    max_arrival_rate: f64,
    shares: Vec<f64>,
    arrival_rates: Vec<f64>,
}

impl GameTheory {
    pub fn new(pricing_factor: f64, max_arrival_rate: f64) -> Self {
        Self {
            pricing_factor,
            max_arrival_rate,
            shares: Vec::new(),
            arrival_rates: Vec::new(),
        }
    }

    fn ensure_device(&mut self, device: DeviceId) {
        if device >= self.shares.len() {
            self.shares.resize(device + 1, 0.33);
            self.arrival_rates.resize(device + 1, 0.5);
        }
    }

    /// Updates and returns the probability of the device to offload to the cloud.
    fn cloud_share(&mut self, device: DeviceId, arrival_rate: f64, edge_delay: f64, cloud_delay: f64, max_delay: f64) -> f64 {
        self.ensure_device(device);
        let others = self
            .shares
            .iter()
            .zip(self.arrival_rates.iter())
            .enumerate()
            .filter(|(other, _)| *other != device)
            .map(|(_, (share, rate))| 1. - rate * share)
            .product::<f64>();
        let denominator = 2. * self.pricing_factor * max_delay * (1. - others);
        let share = if denominator > 0. && denominator.is_finite() {
            (edge_delay - cloud_delay) / denominator
        } else if edge_delay > cloud_delay {
            1.
        } else {
            0.
        };
        let share = if share.is_nan() { 0.01 } else { share.clamp(0.01, 0.99) };
        self.shares[device] = share;
        self.arrival_rates[device] = (arrival_rate / self.max_arrival_rate).clamp(0., 1.);
        share
    }
}

impl TierPolicy for GameTheory {
    fn choose_target(&mut self, task: &Task, view: &mut PolicyView) -> Target {
        if let Some(arm) = only_available_arm(view) {
            return arm.target();
        }
        let (arrival_rate, max_delay) = match view.app(task) {
            Some(app) if app.max_delay_requirement > 0. => (app.poisson_interarrival, app.max_delay_requirement),
            Some(app) => (app.poisson_interarrival, DEFAULT_MAX_DELAY_REQUIREMENT),
            None => (0., DEFAULT_MAX_DELAY_REQUIREMENT),
        };
        let edge_delay = processing_time(
            task.length,
            view.tier_mips(Tier::Edge).unwrap_or(0.),
            view.pool.tier_utilization(Tier::Edge),
        ) + view.estimate_round_trip(task, Route::Edge, SATURATED_WLAN_DELAY);
        let cloud_delay = processing_time(
            task.length,
            view.tier_mips(Tier::Cloud).unwrap_or(0.),
            view.pool.tier_utilization(Tier::Cloud),
        ) + view.estimate_round_trip(task, Route::Cloud, SATURATED_CLOUD_DELAY);
        let share = self.cloud_share(task.device, arrival_rate, edge_delay, cloud_delay, 6. * max_delay);
        if share < view.ctx.gen_range(0. ..1.) {
            Target::Edge
        } else {
            Target::Cloud
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Number of closed windows used by [`Predictive`].
pub const HISTORY_WINDOWS: usize = 4;
/// Weighted failure rate above which [`Predictive`] ranks arms by failures instead of service time.
pub const FAILURE_RATE_THRESHOLD: f64 = 0.3;

#[derive(Clone, Copy, Debug, Default)]
struct ArmStats {
    completed: u64,
    failed: u64,
    total_service_time: f64,
}

impl ArmStats {
    /// Percentage of failed tasks, 0.1 if there were no failures.
    fn failure_rate(&self) -> f64 {
        if self.failed == 0 {
            0.1
        } else {
            100. * self.failed as f64 / (self.completed + self.failed) as f64
        }
    }

    /// Mean service time of completed tasks, 0.01 if there were none.
    fn service_time(&self) -> f64 {
        if self.completed == 0 {
            0.01
        } else {
            self.total_service_time / self.completed as f64
        }
    }
}

/// Picks an arm at random with probabilities inversely proportional to its recent failure rate or
/// service time.
///
/// Outcomes are collected in windows of fixed length. The last [`HISTORY_WINDOWS`] closed windows are
/// weighted linearly, the most recent one the most. During the warm-up period the arms are equally likely.
pub struct Predictive {
    window: f64,
    current_window: u64,
    current: [ArmStats; 2],
    history: [[ArmStats; 2]; HISTORY_WINDOWS],
    decisions: HashMap<TaskId, Arm>,
}

impl Predictive {
    pub fn new(window: f64) -> Self {
        Self {
            window,
            current_window: 0,
            current: Default::default(),
            history: Default::default(),
            decisions: HashMap::new(),
        }
    }

    /// Closes the windows which ended before `time`.
    fn advance(&mut self, time: f64) {
        let window = (time / self.window).floor().max(0.) as u64;
        let mut closed = 0;
        while self.current_window < window && closed <= HISTORY_WINDOWS {
            self.history.rotate_right(1);
            self.history[0] = std::mem::take(&mut self.current);
            self.current_window += 1;
            closed += 1;
        }
        self.current_window = self.current_window.max(window);
    }

    fn weighted(&self, metric: impl Fn(&ArmStats) -> f64, arm: Arm) -> f64 {
        self.history
            .iter()
            .enumerate()
            .map(|(age, stats)| metric(&stats[arm.index()]) * (HISTORY_WINDOWS - age) as f64)
            .sum()
    }

    fn probabilities(&self) -> [f64; 2] {
        let failure_rates = ARMS.map(|arm| self.weighted(ArmStats::failure_rate, arm));
        let service_times = ARMS.map(|arm| self.weighted(ArmStats::service_time, arm));
        let values = if failure_rates.iter().sum::<f64>() > FAILURE_RATE_THRESHOLD {
            failure_rates
        } else {
            service_times
        };
        let total = values.iter().sum::<f64>();
        let scores = values.map(|value| total / value);
        let score_total = scores.iter().sum::<f64>();
        scores.map(|score| score / score_total)
    }
}

impl TierPolicy for Predictive {
    fn choose_target(&mut self, task: &Task, view: &mut PolicyView) -> Target {
        self.advance(view.time);
        let arm = match only_available_arm(view) {
            Some(arm) => arm,
            None => {
                let probabilities = if view.time > view.warm_up_period {
                    self.probabilities()
                } else {
                    [0.5, 0.5]
                };
                let value = view.ctx.gen_range(0.01..0.99);
                if value <= probabilities[Arm::Edge.index()] {
                    Arm::Edge
                } else {
                    Arm::Cloud
                }
            }
        };
        self.decisions.insert(task.id, arm);
        arm.target()
    }

    fn task_finished(&mut self, task: &Task) {
        let arm = match self.decisions.remove(&task.id) {
            Some(arm) => arm,
            None => return,
        };
        if let Some(time) = task.finished_at {
            self.advance(time);
        }
        let stats = &mut self.current[arm.index()];
        if task.status().is_failure() {
            stats.failed += 1;
        } else {
            stats.completed += 1;
            stats.total_service_time += task.service_time();
        }
    }
}
