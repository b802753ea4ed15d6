//! Network delay models.

pub mod congestion;
pub mod empirical;
pub mod mm1;
pub mod relay;

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::options::parse_config_value;
use crate::config::sim_config::{ApplicationConfig, SimulationConfig};
use crate::error::SimulationError;
use crate::location::Location;
use crate::mobility::MobilityModel;
use crate::task::{DeviceId, Task};

pub use congestion::CongestionState;
pub use empirical::EmpiricalNetwork;
pub use mm1::Mm1Network;
pub use relay::RelayLink;

/// Traffic class of a network hop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Link {
    /// Device to access point.
    Wlan,
    /// Edge to edge relay.
    Man,
    /// Access point to cloud backbone.
    Wan,
}

/// Path of a transfer between a device and the executing tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Device and the edge server behind its access point.
    Edge,
    /// Device and the cloud.
    Cloud,
    /// Edge server and a neighboring edge server.
    Relay,
}

impl Route {
    /// Link whose congestion counter accounts transfers along the route.
    pub fn link(&self) -> Link {
        match self {
            Route::Edge => Link::Wlan,
            Route::Cloud => Link::Wan,
            Route::Relay => Link::Man,
        }
    }
}

/// Single transfer query.
#[derive(Clone, Debug)]
pub struct Transfer {
    pub device: DeviceId,
    pub route: Route,
    /// Payload size in KB.
    pub size: f64,
    /// Access point of the executing edge host, if known.
    pub host_access_point: Option<usize>,
}

impl Transfer {
    pub fn upload(task: &Task, route: Route) -> Self {
        Self {
            device: task.device,
            route,
            size: task.input_size,
            host_access_point: task.placement().and_then(|p| p.access_point),
        }
    }

    pub fn download(task: &Task, route: Route) -> Self {
        Self {
            device: task.device,
            route,
            size: task.output_size,
            host_access_point: task.placement().and_then(|p| p.access_point),
        }
    }

    /// Transfer of a dummy payload used to estimate link quality.
    pub fn probe(device: DeviceId, route: Route, size: f64) -> Self {
        Self {
            device,
            route,
            size,
            host_access_point: None,
        }
    }
}

/// Computes transfer delays and tracks in-flight transfers.
///
/// Delay `<= 0` means the transfer is impossible. Every `*_started` call must be paired
/// with the matching `*_finished` call on the same location and link.
pub trait NetworkModel {
    fn upload_delay(&mut self, time: f64, transfer: &Transfer) -> f64;

    fn download_delay(&mut self, time: f64, transfer: &Transfer) -> f64;

    fn congestion(&self) -> &CongestionState;

    fn congestion_mut(&mut self) -> &mut CongestionState;

    fn upload_started(&mut self, location: &Location, link: Link) {
        self.congestion_mut().start(location.access_point, link);
    }

    fn upload_finished(&mut self, location: &Location, link: Link) {
        self.congestion_mut().finish(location.access_point, link);
    }

    fn download_started(&mut self, location: &Location, link: Link) {
        self.congestion_mut().start(location.access_point, link);
    }

    fn download_finished(&mut self, location: &Location, link: Link) {
        self.congestion_mut().finish(location.access_point, link);
    }

    /// Periodic re-estimation of model parameters from observed traffic.
    fn on_periodic_update(&mut self, _time: f64) {}
}

/// Workload averages over application profiles weighted by usage percentage.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WorkloadProfile {
    /// Number of applications with non-zero usage.
    pub app_count: usize,
    pub poisson_mean: f64,
    pub cloud_poisson_mean: f64,
    pub input_size: f64,
    pub output_size: f64,
}

impl WorkloadProfile {
    pub fn from_apps(apps: &[ApplicationConfig]) -> Self {
        let mut profile = Self::default();
        for app in apps.iter().filter(|app| app.usage_percentage > 0.) {
            let weight = app.usage_percentage / 100.;
            profile.poisson_mean += app.poisson_interarrival * weight;
            if app.prob_cloud_selection > 0. {
                profile.cloud_poisson_mean += app.poisson_interarrival * (100. / app.prob_cloud_selection) * weight;
            }
            profile.input_size += app.data_upload * weight;
            profile.output_size += app.data_download * weight;
            profile.app_count += 1;
        }
        if profile.app_count > 0 {
            let n = profile.app_count as f64;
            profile.poisson_mean /= n;
            profile.cloud_poisson_mean /= n;
            profile.input_size /= n;
            profile.output_size /= n;
        }
        profile
    }
}

/// Creates network model by its config name.
pub fn network_model_resolver(
    config: &SimulationConfig,
    mobility: Rc<dyn MobilityModel>,
) -> Result<Box<dyn NetworkModel>, SimulationError> {
    let (model_name, _) = parse_config_value(&config.network_model);
    match model_name.as_str() {
        "Empirical" => Ok(Box::new(EmpiricalNetwork::new(config, mobility))),
        "Mm1" | "MM1" => Ok(Box::new(Mm1Network::new(config, mobility))),
        _ => Err(SimulationError::config(format!(
            "unsupported network model: {}",
            config.network_model
        ))),
    }
}
