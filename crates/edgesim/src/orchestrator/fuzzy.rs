//! Score-based tier policies.
//!
//! Scorers play the role of fuzzy inference engines: they map named numeric inputs to a score in `[0, 100]`,
//! and a score above 50 selects the more remote option.

use crate::network::{Route, Transfer};
use crate::resource_pool::{HostId, Tier};
use crate::task::Task;

use super::tier_policy::TierPolicy;
use super::{PolicyView, Target};

/// Score above which the more remote option is selected.
pub const SCORE_THRESHOLD: f64 = 50.;

/// Maps named inputs to a score in `[0, 100]`.
pub trait FuzzyScorer {
    fn score(&self, inputs: &[(&str, f64)]) -> f64;
}

/// Input of a weighted scorer normalized to `[0, 1]` by its bounds.
#[derive(Clone, Debug)]
pub struct ScoreTerm {
    pub input: String,
    pub low: f64,
    pub high: f64,
    pub weight: f64,
}

impl ScoreTerm {
    pub fn new(input: &str, low: f64, high: f64, weight: f64) -> Self {
        Self {
            input: input.to_string(),
            low,
            high,
            weight,
        }
    }

    fn normalize(&self, value: f64) -> f64 {
        if self.high <= self.low {
            return 0.;
        }
        ((value - self.low) / (self.high - self.low)).clamp(0., 1.)
    }
}

/// Scores inputs as `100 * clamp(bias + sum(weight * normalized input), 0, 1)`.
///
/// Inputs missing from the query do not contribute.
#[derive(Clone, Debug)]
pub struct WeightedScorer {
    bias: f64,
    terms: Vec<ScoreTerm>,
}

impl WeightedScorer {
    pub fn new(bias: f64, terms: Vec<ScoreTerm>) -> Self {
        Self { bias, terms }
    }

    /// Local edge host vs the least loaded remote edge host.
    pub fn edge_selection() -> Self {
        Self::new(
            0.5,
            vec![
                ScoreTerm::new("man_delay", 0., 1., -0.5),
                ScoreTerm::new("nearest_edge_util", 0., 100., 0.5),
                ScoreTerm::new("best_remote_edge_util", 0., 100., -0.5),
            ],
        )
    }

    /// Selected edge host vs the cloud.
    pub fn cloud_selection() -> Self {
        Self::new(
            0.2,
            vec![
                ScoreTerm::new("wan_bw", 0., 20., 0.3),
                ScoreTerm::new("task_size", 0., 20000., 0.2),
                ScoreTerm::new("delay_sensitivity", 0., 1., -0.3),
                ScoreTerm::new("avg_edge_util", 0., 100., 0.5),
            ],
        )
    }

    /// Single stage edge vs cloud decision of the competitor policy.
    pub fn competitor() -> Self {
        Self::new(
            0.7,
            vec![
                ScoreTerm::new("wan_bw", 0., 20., 0.3),
                ScoreTerm::new("cpu_speed", 0., 100., -0.5),
                ScoreTerm::new("video_execution", 0., 1., -0.2),
                ScoreTerm::new("data_size", 0., 1., -0.2),
            ],
        )
    }
}

impl FuzzyScorer for WeightedScorer {
    fn score(&self, inputs: &[(&str, f64)]) -> f64 {
        let mut sum = self.bias;
        for term in self.terms.iter() {
            if let Some((_, value)) = inputs.iter().find(|(name, _)| *name == term.input) {
                sum += term.weight * term.normalize(*value);
            }
        }
        100. * sum.clamp(0., 1.)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Two-stage policy: the first stage chooses between the nearest and the least loaded remote edge host,
/// the second stage chooses between the selected edge host and the cloud.
pub struct Fuzzy {
    edge_stage: Box<dyn FuzzyScorer>,
    cloud_stage: Box<dyn FuzzyScorer>,
}

impl Fuzzy {
    pub fn new(edge_stage: Box<dyn FuzzyScorer>, cloud_stage: Box<dyn FuzzyScorer>) -> Self {
        Self {
            edge_stage,
            cloud_stage,
        }
    }
}

impl Default for Fuzzy {
    fn default() -> Self {
        Self::new(
            Box::new(WeightedScorer::edge_selection()),
            Box::new(WeightedScorer::cloud_selection()),
        )
    }
}

impl Fuzzy {
    /// Chooses between the nearest edge host and the least loaded remote one.
    fn select_edge_host(&self, task: &Task, view: &mut PolicyView) -> Option<HostId> {
        let edge_hosts = view.pool.hosts(Tier::Edge);
        let nearest = view
            .nearest_edge_hosts()
            .into_iter()
            .min_by(|a, b| view.pool.host_utilization(*a).total_cmp(&view.pool.host_utilization(*b)));
        let mut best_remote: Option<HostId> = None;
        let mut best_remote_util = 100.;
        for &host in edge_hosts.iter() {
            if Some(host) == nearest {
                continue;
            }
            let util = view.pool.host_utilization(host);
            if util < best_remote_util {
                best_remote_util = util;
                best_remote = Some(host);
            }
        }
        let (nearest, remote) = match (nearest, best_remote) {
            (Some(nearest), Some(remote)) => (nearest, remote),
            (Some(nearest), None) => return Some(nearest),
            (None, remote) => return remote.or_else(|| edge_hosts.first().copied()),
        };

        let man_delay = view.network.upload_delay(view.time, &Transfer::upload(task, Route::Relay));
        let score = self.edge_stage.score(&[
            ("man_delay", man_delay),
            ("nearest_edge_util", view.pool.host_utilization(nearest)),
            ("best_remote_edge_util", best_remote_util),
        ]);
        if score > SCORE_THRESHOLD {
            Some(remote)
        } else {
            Some(nearest)
        }
    }
}

impl TierPolicy for Fuzzy {
    fn choose_target(&mut self, task: &Task, view: &mut PolicyView) -> Target {
        let host = match self.select_edge_host(task, view) {
            Some(host) => host,
            None => return Target::Cloud,
        };
        let wan_bw = view.estimate_wan_bandwidth(task.device);
        let delay_sensitivity = view.app(task).map(|app| app.delay_sensitivity).unwrap_or(0.);
        let score = self.cloud_stage.score(&[
            ("wan_bw", wan_bw),
            ("task_size", task.length),
            ("delay_sensitivity", delay_sensitivity),
            ("avg_edge_util", view.pool.host_utilization(host)),
        ]);
        if score > SCORE_THRESHOLD {
            Target::Cloud
        } else {
            Target::EdgeHost(host)
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Single-stage edge vs cloud policy driven by WAN bandwidth, edge CPU headroom and task properties.
pub struct FuzzyCompetitor {
    scorer: Box<dyn FuzzyScorer>,
}

impl FuzzyCompetitor {
    pub fn new(scorer: Box<dyn FuzzyScorer>) -> Self {
        Self { scorer }
    }
}

impl Default for FuzzyCompetitor {
    fn default() -> Self {
        Self::new(Box::new(WeightedScorer::competitor()))
    }
}

impl TierPolicy for FuzzyCompetitor {
    fn choose_target(&mut self, task: &Task, view: &mut PolicyView) -> Target {
        let wan_bw = view.estimate_wan_bandwidth(task.device);
        let cpu_speed = 100. - view.pool.tier_utilization(Tier::Edge);
        let video_execution = view.app(task).map(|app| app.delay_sensitivity).unwrap_or(0.);
        let data_size = (task.input_size + task.output_size).min(2500.) / 2500.;
        let score = self.scorer.score(&[
            ("wan_bw", wan_bw),
            ("cpu_speed", cpu_speed),
            ("video_execution", video_execution),
            ("data_size", data_size),
        ]);
        if score > SCORE_THRESHOLD {
            Target::Cloud
        } else {
            Target::Edge
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_score_is_clamped() {
        let scorer = WeightedScorer::new(0.5, vec![ScoreTerm::new("x", 0., 10., 1.)]);
        assert_eq!(scorer.score(&[("x", 0.)]), 50.);
        assert_eq!(scorer.score(&[("x", 5.)]), 100.);
        assert_eq!(scorer.score(&[("x", -5.)]), 50.);
        assert_eq!(scorer.score(&[("y", 10.)]), 50.);
    }

    #[test]
    fn busy_nearest_edge_prefers_remote() {
        let scorer = WeightedScorer::edge_selection();
        let busy = scorer.score(&[
            ("man_delay", 0.05),
            ("nearest_edge_util", 90.),
            ("best_remote_edge_util", 10.),
        ]);
        assert!(busy > SCORE_THRESHOLD);
        let equal = scorer.score(&[
            ("man_delay", 0.05),
            ("nearest_edge_util", 40.),
            ("best_remote_edge_util", 40.),
        ]);
        assert!(equal <= SCORE_THRESHOLD);
    }

    #[test]
    fn loaded_edge_prefers_cloud() {
        let scorer = WeightedScorer::cloud_selection();
        let inputs = |util: f64| {
            scorer.score(&[
                ("wan_bw", 10.),
                ("task_size", 9000.),
                ("delay_sensitivity", 0.9),
                ("avg_edge_util", util),
            ])
        };
        assert!(inputs(90.) > SCORE_THRESHOLD);
        assert!(inputs(20.) <= SCORE_THRESHOLD);
    }

    #[test]
    fn competitor_offloads_when_edge_is_slow() {
        let scorer = WeightedScorer::competitor();
        let inputs = |cpu_speed: f64| {
            scorer.score(&[
                ("wan_bw", 10.),
                ("cpu_speed", cpu_speed),
                ("video_execution", 0.9),
                ("data_size", 0.5),
            ])
        };
        assert!(inputs(10.) > SCORE_THRESHOLD);
        assert!(inputs(80.) <= SCORE_THRESHOLD);
    }
}
