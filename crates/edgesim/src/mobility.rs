//! Mobility models mapping (device, time) to device location.

use rand_distr::Exp;

use edgesim_core::SimulationContext;

use crate::config::sim_config::SimulationConfig;
use crate::error::SimulationError;
use crate::location::Location;
use crate::task::DeviceId;

/// Provides device locations over time.
pub trait MobilityModel {
    /// Returns location of the device at the given time.
    fn location(&self, device: DeviceId, time: f64) -> Location;

    fn device_count(&self) -> usize;
}

/// Sorted list of location changes of a single device.
#[derive(Clone, Debug)]
struct Timeline {
    changes: Vec<(f64, Location)>,
}

impl Timeline {
    fn last_time(&self) -> f64 {
        self.changes.last().map(|(t, _)| *t).unwrap_or(f64::NEG_INFINITY)
    }

    /// Returns the last location set at or before `time`, or the first location for earlier times.
    fn at(&self, time: f64) -> Location {
        let idx = self.changes.partition_point(|(t, _)| *t <= time);
        self.changes[idx.saturating_sub(1)].1
    }
}

/// Devices move between access points staying at each one for an exponentially distributed time
/// whose mean depends on the place type.
pub struct NomadicMobility {
    timelines: Vec<Timeline>,
}

impl NomadicMobility {
    /// Pre-generates device movements for the whole simulation.
    pub fn generate(
        config: &SimulationConfig,
        device_count: usize,
        ctx: &SimulationContext,
    ) -> Result<Self, SimulationError> {
        let places = config
            .edge_datacenters
            .iter()
            .map(|dc| Location::new(dc.location.place_type, dc.location.access_point, dc.location.x, dc.location.y))
            .collect::<Vec<_>>();
        if places.is_empty() && device_count > 0 {
            return Err(SimulationError::config("nomadic mobility requires at least one edge datacenter"));
        }
        let mut residence = Vec::new();
        for &mean in config.mobility.residence_time_by_place_type.iter() {
            let dist = Exp::new(1. / mean)
                .map_err(|_| SimulationError::config(format!("invalid residence time {}", mean)))?;
            residence.push(dist);
        }

        let mut timelines = Vec::with_capacity(device_count);
        for _ in 0..device_count {
            let mut place = ctx.gen_range(0..places.len());
            let mut timeline = Timeline {
                changes: vec![(config.client_activity_start_time, places[place])],
            };
            while timeline.last_time() < config.simulation_time {
                let wait = ctx.sample_from_distribution(&residence[places[place].place_type]);
                let mut next = ctx.gen_range(0..places.len());
                while places.len() > 1 && next == place {
                    next = ctx.gen_range(0..places.len());
                }
                place = next;
                timeline.changes.push((timeline.last_time() + wait, places[place]));
            }
            timelines.push(timeline);
        }
        Ok(Self { timelines })
    }
}

impl MobilityModel for NomadicMobility {
    fn location(&self, device: DeviceId, time: f64) -> Location {
        self.timelines[device].at(time)
    }

    fn device_count(&self) -> usize {
        self.timelines.len()
    }
}

/// Mobility defined by explicit per-device timelines.
pub struct ScriptedMobility {
    timelines: Vec<Timeline>,
}

impl ScriptedMobility {
    /// Creates mobility from lists of (time, location) changes, one list per device.
    pub fn new(timelines: Vec<Vec<(f64, Location)>>) -> Result<Self, SimulationError> {
        let mut result = Vec::with_capacity(timelines.len());
        for (device, mut changes) in timelines.into_iter().enumerate() {
            if changes.is_empty() {
                return Err(SimulationError::config(format!("device {} has empty timeline", device)));
            }
            changes.sort_by(|a, b| a.0.total_cmp(&b.0));
            result.push(Timeline { changes });
        }
        Ok(Self { timelines: result })
    }

    /// Creates mobility where each device stays at the given location forever.
    pub fn stationary(locations: Vec<Location>) -> Self {
        Self {
            timelines: locations
                .into_iter()
                .map(|location| Timeline {
                    changes: vec![(0., location)],
                })
                .collect(),
        }
    }
}

impl MobilityModel for ScriptedMobility {
    fn location(&self, device: DeviceId, time: f64) -> Location {
        self.timelines[device].at(time)
    }

    fn device_count(&self) -> usize {
        self.timelines.len()
    }
}

#[cfg(test)]
mod tests {
    use edgesim_core::Simulation;

    use super::*;

    #[test]
    fn scripted_lookup_uses_last_change() {
        let a = Location::new(0, 0, 0., 0.);
        let b = Location::new(0, 1, 10., 0.);
        let mobility = ScriptedMobility::new(vec![vec![(20., b), (5., a)]]).unwrap();
        assert_eq!(mobility.location(0, 0.).access_point, 0);
        assert_eq!(mobility.location(0, 5.).access_point, 0);
        assert_eq!(mobility.location(0, 19.9).access_point, 0);
        assert_eq!(mobility.location(0, 20.).access_point, 1);
        assert_eq!(mobility.location(0, 1000.).access_point, 1);
    }

    #[test]
    fn empty_timeline_is_rejected() {
        assert!(ScriptedMobility::new(vec![vec![]]).is_err());
    }

    #[test]
    fn nomadic_devices_keep_moving() {
        let yaml = r#"
simulation_time: 3600
mobility:
  residence_time_by_place_type: [60, 60, 60]
edge_datacenters:
  - location: { x: 0, y: 0, access_point: 0 }
    hosts: []
  - location: { x: 10, y: 0, access_point: 1, place_type: 1 }
    hosts: []
  - location: { x: 20, y: 0, access_point: 2, place_type: 2 }
    hosts: []
"#;
        let config = SimulationConfig::from_yaml(yaml).unwrap();
        let mut sim = Simulation::new(42);
        let ctx = sim.create_context("mobility");
        let mobility = NomadicMobility::generate(&config, 5, &ctx).unwrap();
        assert_eq!(mobility.device_count(), 5);
        for device in 0..5 {
            let timeline = &mobility.timelines[device];
            assert_eq!(timeline.changes[0].0, 10.);
            assert!(timeline.last_time() >= 3600.);
            for pair in timeline.changes.windows(2) {
                assert!(pair[1].0 >= pair[0].0);
                assert_ne!(pair[0].1.access_point, pair[1].1.access_point);
            }
            assert_eq!(mobility.location(device, 0.), timeline.changes[0].1);
        }
    }
}
