//! Network model based on throughput measured in real deployments.

use std::rc::Rc;

use crate::config::sim_config::SimulationConfig;
use crate::mobility::MobilityModel;

use super::{CongestionState, Link, NetworkModel, RelayLink, Route, Transfer};

/// Measured 802.11n throughput (kbps) indexed by the number of concurrent clients.
pub const WLAN_THROUGHPUT: [f64; 101] = [
    88040.279, 45150.982, 30303.641, 27617.211, 24868.616, 22242.296, 20524.064, 18744.889, 17058.827, 15690.455,
    14127.744, 13522.408, 13177.631, 12811.330, 12584.387, 12135.161, 11705.638, 11276.116, 10846.594, 10417.071,
    9987.549, 9367.587, 8747.625, 8127.663, 7907.701, 7887.739, 7690.831, 7393.922, 7297.014, 7100.106, 6903.197,
    6701.986, 6500.776, 6399.565, 6098.354, 5897.143, 5552.127, 5207.111, 4862.096, 4517.080, 4172.064, 4092.922,
    4013.781, 3934.639, 3855.498, 3776.356, 3697.215, 3618.073, 3538.932, 3459.790, 3380.649, 3274.611, 3168.573,
    3062.536, 2956.498, 2850.461, 2744.423, 2638.386, 2532.348, 2426.310, 2320.273, 2283.828, 2247.383, 2210.939,
    2174.494, 2138.049, 2101.604, 2065.160, 2028.715, 1992.270, 1955.825, 1946.788, 1937.751, 1928.714, 1919.677,
    1910.640, 1901.603, 1892.566, 1883.529, 1874.492, 1865.455, 1833.185, 1800.915, 1768.645, 1736.375, 1704.106,
    1671.836, 1639.566, 1607.296, 1575.026, 1542.756, 1538.544, 1534.331, 1530.119, 1525.906, 1521.694, 1517.481,
    1513.269, 1509.056, 1504.844, 1500.631,
];

/// Measured WAN throughput (kbps) for 1..=25 concurrent clients.
pub const WAN_THROUGHPUT: [f64; 25] = [
    20703.973, 12023.957, 9887.785, 8915.775, 8259.277, 7560.574, 7262.140, 7155.361, 7041.153, 6994.595, 6653.232,
    6111.868, 5570.505, 5029.142, 4487.779, 3899.729, 3311.680, 2723.631, 2135.582, 1547.533, 1500.252, 1452.972,
    1405.692, 1358.411, 1311.131,
];

/// 802.11ac is about three times faster than the measured 802.11n.
const WLAN_SPEEDUP: f64 = 3.;

/// Computes delay of transferring `size` KB over the link with `clients` concurrent transfers,
/// `0` if there is no measurement for this number of clients.
pub fn empirical_delay(link: Link, size: f64, clients: usize) -> f64 {
    let throughput = match link {
        Link::Wlan => WLAN_THROUGHPUT.get(clients).map(|t| t * WLAN_SPEEDUP),
        Link::Wan => WAN_THROUGHPUT.get(clients).copied(),
        Link::Man => None,
    };
    match throughput {
        Some(throughput) => size * 8. / throughput,
        None => 0.,
    }
}

/// Network model using measured throughput tables indexed by the number of in-flight transfers
/// at the device's access point.
pub struct EmpiricalNetwork {
    relay: RelayLink,
    mobility: Rc<dyn MobilityModel>,
    congestion: CongestionState,
}

impl EmpiricalNetwork {
    pub fn new(config: &SimulationConfig, mobility: Rc<dyn MobilityModel>) -> Self {
        Self {
            relay: RelayLink::new(config, mobility.device_count()),
            mobility,
            congestion: CongestionState::new(),
        }
    }

    fn delay(&mut self, time: f64, transfer: &Transfer, upload: bool) -> f64 {
        match transfer.route {
            Route::Relay if upload => self.relay.upload_delay(),
            Route::Relay => self.relay.download_delay(),
            Route::Edge | Route::Cloud => {
                let link = transfer.route.link();
                let access_point = self.mobility.location(transfer.device, time).access_point;
                let clients = self.congestion.count(access_point, link) as usize;
                empirical_delay(link, transfer.size, clients)
            }
        }
    }
}

impl NetworkModel for EmpiricalNetwork {
    fn upload_delay(&mut self, time: f64, transfer: &Transfer) -> f64 {
        self.delay(time, transfer, true)
    }

    fn download_delay(&mut self, time: f64, transfer: &Transfer) -> f64 {
        self.delay(time, transfer, false)
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
    use crate::location::Location;
    use crate::mobility::ScriptedMobility;

    use super::*;

    #[test]
    fn table_boundaries() {
        assert_eq!(empirical_delay(Link::Wlan, 1000., WLAN_THROUGHPUT.len()), 0.);
        let last = empirical_delay(Link::Wlan, 1000., WLAN_THROUGHPUT.len() - 1);
        assert!(last > 0. && last.is_finite());
        assert_eq!(empirical_delay(Link::Wan, 1000., WAN_THROUGHPUT.len()), 0.);
        let last = empirical_delay(Link::Wan, 1000., WAN_THROUGHPUT.len() - 1);
        assert!(last > 0. && last.is_finite());
    }

    #[test]
    fn idle_link_uses_first_measurement() {
        assert!((empirical_delay(Link::Wlan, 1500., 0) - 12000. / (88040.279 * 3.)).abs() < 1e-12);
        assert!((empirical_delay(Link::Wan, 1500., 0) - 12000. / 20703.973).abs() < 1e-12);
    }

    #[test]
    fn delay_depends_on_congestion_at_device_access_point() {
        let config = SimulationConfig::from_yaml("{}").unwrap();
        let mobility = Rc::new(ScriptedMobility::stationary(vec![
            Location::new(0, 0, 0., 0.),
            Location::new(0, 1, 10., 0.),
        ]));
        let mut network = EmpiricalNetwork::new(&config, mobility);
        let transfer = Transfer::probe(0, Route::Edge, 100.);
        let idle = network.upload_delay(0., &transfer);
        network.upload_started(&Location::new(0, 1, 10., 0.), Link::Wlan);
        assert_eq!(network.upload_delay(0., &transfer), idle);
        for _ in 0..WLAN_THROUGHPUT.len() {
            network.download_started(&Location::new(0, 0, 0., 0.), Link::Wlan);
        }
        assert_eq!(network.upload_delay(0., &transfer), 0.);
        network.download_finished(&Location::new(0, 0, 0., 0.), Link::Wlan);
        assert!(network.upload_delay(0., &transfer) > idle);
        assert_eq!(network.congestion().count(0, Link::Wlan), WLAN_THROUGHPUT.len() as u32 - 1);
    }
}
