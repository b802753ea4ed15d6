//! Edge-to-edge relay (MAN) link modeled as M/M/1 queue with periodically re-estimated parameters.

use crate::config::sim_config::SimulationConfig;

use super::WorkloadProfile;

/// Upper bound of a valid relay delay in seconds.
const MAX_RELAY_DELAY: f64 = 15.;

/// Queue parameters for one transfer direction.
#[derive(Clone, Debug)]
struct Direction {
    poisson_mean: f64,
    avg_size: f64,
    total_size: f64,
    transfers: u64,
}

impl Direction {
    fn new(poisson_mean: f64, avg_size: f64) -> Self {
        Self {
            poisson_mean,
            avg_size,
            total_size: 0.,
            transfers: 0,
        }
    }

    fn observe(&mut self) {
        self.total_size += self.avg_size;
        self.transfers += 1;
    }

    fn re_estimate(&mut self, interval: f64, device_count: usize) {
        if self.transfers != 0 && interval > 0. {
            self.poisson_mean = interval / (self.transfers as f64 / device_count as f64);
            self.avg_size = self.total_size / self.transfers as f64;
        }
        self.total_size = 0.;
        self.transfers = 0;
    }
}

/// Computes delay of the relay link, `delay <= 0` means the link is saturated.
pub fn relay_delay(propagation: f64, bandwidth: f64, poisson_mean: f64, avg_size: f64, device_count: usize) -> f64 {
    let lambda = 1. / poisson_mean;
    let mu = bandwidth / (avg_size * 8.);
    let delay = 1. / (mu - lambda * device_count as f64);
    if delay < 0. {
        return 0.;
    }
    let delay = delay + propagation;
    if delay > MAX_RELAY_DELAY {
        0.
    } else {
        delay
    }
}

/// Relay link between neighboring edge servers.
#[derive(Clone, Debug)]
pub struct RelayLink {
    bandwidth: f64,
    propagation: f64,
    device_count: usize,
    upload: Direction,
    download: Direction,
    last_update: f64,
}

impl RelayLink {
    pub fn new(config: &SimulationConfig, device_count: usize) -> Self {
        let profile = WorkloadProfile::from_apps(&config.applications);
        let poisson_mean = profile.poisson_mean * 4.;
        Self {
            bandwidth: config.man_bandwidth,
            propagation: config.internal_lan_delay,
            device_count,
            upload: Direction::new(poisson_mean, profile.input_size),
            download: Direction::new(poisson_mean, profile.output_size),
            last_update: config.client_activity_start_time,
        }
    }

    pub fn upload_delay(&mut self) -> f64 {
        let delay = relay_delay(
            self.propagation,
            self.bandwidth,
            self.upload.poisson_mean,
            self.upload.avg_size,
            self.device_count,
        );
        self.upload.observe();
        delay
    }

    pub fn download_delay(&mut self) -> f64 {
        let delay = relay_delay(
            self.propagation,
            self.bandwidth,
            self.download.poisson_mean,
            self.download.avg_size,
            self.device_count,
        );
        self.download.observe();
        delay
    }

    /// Re-estimates arrival rate and average size from transfers observed since the last update.
    pub fn re_estimate(&mut self, time: f64) {
        let interval = time - self.last_update;
        self.last_update = time;
        self.upload.re_estimate(interval, self.device_count);
        self.download.re_estimate(interval, self.device_count);
    }

    pub fn upload_poisson_mean(&self) -> f64 {
        self.upload.poisson_mean
    }

    pub fn download_poisson_mean(&self) -> f64 {
        self.download.poisson_mean
    }
}
