//! M/M/1 queueing network model.

use std::rc::Rc;

use crate::config::sim_config::SimulationConfig;
use crate::location::Location;
use crate::mobility::MobilityModel;

use super::{CongestionState, NetworkModel, RelayLink, Route, Transfer, WorkloadProfile};

/// Upper bound of a valid WLAN/WAN delay in seconds.
const MAX_DELAY: f64 = 5.;

/// Computes M/M/1 delay of a link shared by `device_count` devices, `-1` if the queue is unstable
/// or the delay exceeds the ceiling.
pub fn mm1_delay(propagation: f64, bandwidth: f64, poisson_mean: f64, avg_size: f64, device_count: usize) -> f64 {
    let bps = bandwidth * 1000. / 8.;
    let lambda = 1. / poisson_mean;
    let mu = bps / (avg_size * 1000.);
    let load = lambda * device_count as f64;
    if mu <= load {
        return -1.;
    }
    let delay = 1. / (mu - load) + propagation;
    if delay > MAX_DELAY {
        -1.
    } else {
        delay
    }
}

/// Network model treating WLAN and WAN links as M/M/1 queues loaded by co-located devices.
pub struct Mm1Network {
    wlan_bandwidth: f64,
    wan_bandwidth: f64,
    wan_propagation: f64,
    internal_lan_delay: f64,
    wlan_poisson_mean: f64,
    wan_poisson_mean: f64,
    avg_input_size: f64,
    avg_output_size: f64,
    relay: RelayLink,
    mobility: Rc<dyn MobilityModel>,
    congestion: CongestionState,
}

impl Mm1Network {
    pub fn new(config: &SimulationConfig, mobility: Rc<dyn MobilityModel>) -> Self {
        let profile = WorkloadProfile::from_apps(&config.applications);
        Self {
            wlan_bandwidth: config.wlan_bandwidth,
            wan_bandwidth: config.wan_bandwidth,
            wan_propagation: config.wan_propagation_delay,
            internal_lan_delay: config.internal_lan_delay,
            wlan_poisson_mean: profile.poisson_mean,
            wan_poisson_mean: profile.cloud_poisson_mean,
            avg_input_size: profile.input_size,
            avg_output_size: profile.output_size,
            relay: RelayLink::new(config, mobility.device_count()),
            mobility,
            congestion: CongestionState::new(),
        }
    }

    /// Number of devices located at `location` at the given time.
    fn co_located(&self, location: &Location, time: f64) -> usize {
        (0..self.mobility.device_count())
            .filter(|&device| self.mobility.location(device, time) == *location)
            .count()
    }

    fn wlan_delay(&mut self, location: &Location, time: f64, avg_size: f64) -> f64 {
        let devices = self.co_located(location, time);
        mm1_delay(0., self.wlan_bandwidth, self.wlan_poisson_mean, avg_size, devices)
    }

    fn wan_delay(&mut self, location: &Location, time: f64, avg_size: f64) -> f64 {
        let devices = self.co_located(location, time);
        mm1_delay(
            self.wan_propagation,
            self.wan_bandwidth,
            self.wan_poisson_mean,
            avg_size,
            devices,
        )
    }

    fn cloud_delay(&mut self, location: &Location, time: f64, avg_size: f64) -> f64 {
        let wlan = self.wlan_delay(location, time, avg_size);
        let wan = self.wan_delay(location, time + wlan, avg_size);
        if wlan > 0. && wan > 0. {
            wlan + wan
        } else {
            0.
        }
    }
}

impl NetworkModel for Mm1Network {
    fn upload_delay(&mut self, time: f64, transfer: &Transfer) -> f64 {
        let location = self.mobility.location(transfer.device, time);
        match transfer.route {
            Route::Cloud => self.cloud_delay(&location, time, self.avg_input_size),
            Route::Edge => self.wlan_delay(&location, time, self.avg_input_size),
            Route::Relay => self.relay.upload_delay(),
        }
    }

    fn download_delay(&mut self, time: f64, transfer: &Transfer) -> f64 {
        let location = self.mobility.location(transfer.device, time);
        match transfer.route {
            Route::Cloud => self.cloud_delay(&location, time, self.avg_output_size),
            Route::Edge => {
                let mut delay = self.wlan_delay(&location, time, self.avg_output_size);
                if delay > 0. && transfer.host_access_point.map_or(false, |ap| ap != location.access_point) {
                    delay += 2. * self.internal_lan_delay;
                }
                delay
            }
            Route::Relay => self.relay.download_delay(),
        }
    }

    fn congestion(&self) -> &CongestionState {
        &self.congestion
    }

    fn congestion_mut(&mut self) -> &mut CongestionState {
        &mut self.congestion
    }

    fn on_periodic_update(&mut self, time: f64) {
        self.relay.re_estimate(time);
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::mobility::ScriptedMobility;

    #[test]
    fn delay_is_monotone_in_device_count() {
        let mut previous = 0.;
        let mut failed = false;
        for devices in 0..2000 {
            let delay = mm1_delay(0.1, 20000., 3., 500., devices);
            if failed {
                assert_eq!(delay, -1.);
                continue;
            }
            if delay < 0. {
                failed = true;
                continue;
            }
            assert!(delay >= previous);
            previous = delay;
        }
        assert!(failed);
    }

    #[rstest]
    #[case(300000., 2., 100., 0, 100. * 1000. / (300000. * 125.))]
    #[case(20000., 10., 500., 10, 1. / (5. - 1.))]
    fn delay_matches_formula(
        #[case] bandwidth: f64,
        #[case] poisson_mean: f64,
        #[case] size: f64,
        #[case] devices: usize,
        #[case] expected: f64,
    ) {
        assert!((mm1_delay(0., bandwidth, poisson_mean, size, devices) - expected).abs() < 1e-12);
    }

    #[test]
    fn unstable_queue_fails() {
        // mu = 5 tasks/s, lambda * n = 5
        assert_eq!(mm1_delay(0., 20000., 1., 500., 5), -1.);
    }

    #[rstest]
    #[case(None, 0.)]
    #[case(Some(0), 0.)]
    #[case(Some(1), 2.)]
    fn lan_hop_is_charged_only_for_foreign_host(#[case] host_access_point: Option<usize>, #[case] lan_hops: f64) {
        let config = SimulationConfig::from_file("test-configs/config.yaml").unwrap();
        let mobility = ScriptedMobility::stationary(vec![Location::new(0, 0, 0., 0.)]);
        let mut network = Mm1Network::new(&config, Rc::new(mobility));
        let transfer = Transfer {
            device: 0,
            route: Route::Edge,
            size: 100.,
            host_access_point,
        };
        let local = mm1_delay(0., config.wlan_bandwidth, 5., 100., 1);
        let delay = network.download_delay(0., &transfer);
        assert!((delay - (local + lan_hops * config.internal_lan_delay)).abs() < 1e-12);
    }
}
