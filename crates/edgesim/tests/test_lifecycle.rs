mod common;

use std::rc::Rc;

use serde::Serialize;

use edgesim::config::sim_config::SimulationConfig;
use edgesim::error::SimulationError;
use edgesim::location::Location;
use edgesim::mobility::ScriptedMobility;
use edgesim::network::empirical::{WAN_THROUGHPUT, WLAN_THROUGHPUT};
use edgesim::network::mm1::mm1_delay;
use edgesim::network::Link;
use edgesim::resource_pool::Tier;
use edgesim::simulation::EdgeSimulation;
use edgesim::task::{Task, TaskStatus};
use edgesim_core::Simulation;

use common::{ap0, ap1, assert_float_eq, build, build_stationary, load_config, request};

fn wlan_delay(size: f64) -> f64 {
    size * 8. / (WLAN_THROUGHPUT[0] * 3.)
}

fn wan_delay(size: f64) -> f64 {
    size * 8. / WAN_THROUGHPUT[0]
}

#[test]
// Task of 4000 MI runs on 20000 MIPS edge VM for 0.2 seconds,
// input and output travel over idle WLAN.
fn test_task_completed_on_edge() {
    let mut sim = build_stationary(load_config());
    sim.submit(request(0, 1.));
    let stats = sim.run().unwrap();

    let task = sim.task(0).unwrap();
    assert_eq!(task.status(), TaskStatus::Completed);
    let placement = task.placement().unwrap();
    assert_eq!(placement.tier, Tier::Edge);
    assert_eq!(placement.host, 0);
    assert_eq!(placement.vm, 0);
    assert_float_eq(task.processing_time(), 0.2, 1e-9);
    assert_float_eq(task.upload_delay.wlan, wlan_delay(100.), 1e-9);
    assert_float_eq(task.download_delay.wlan, wlan_delay(100.), 1e-9);
    assert_eq!(task.upload_delay.man, 0.);
    assert_float_eq(task.service_time(), 0.2 + 2. * wlan_delay(100.), 1e-9);
    assert_eq!(task.network_error, None);

    assert_eq!(stats.total_tasks, 1);
    assert_eq!(stats.completed_tasks, 1);
    assert_eq!(stats.tiers[&Tier::Edge].completed, 1);
    assert_eq!(sim.controller().network().congestion().total(), 0);
    assert_eq!(sim.pool().vm(0).unwrap().utilization, 0.);
}

#[test]
fn test_task_completed_in_cloud() {
    let mut config = load_config();
    config.tier_policy = "Cloud".to_string();
    let mut sim = build_stationary(config);
    sim.submit(request(0, 1.));
    sim.run().unwrap();

    let task = sim.task(0).unwrap();
    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(task.placement().unwrap().tier, Tier::Cloud);
    assert_eq!(task.placement().unwrap().vm, 4);
    assert_float_eq(task.processing_time(), 0.04, 1e-9);
    assert_float_eq(task.upload_delay.wan, wan_delay(100.), 1e-9);
    assert_float_eq(task.download_delay.wan, wan_delay(100.), 1e-9);
    assert_eq!(task.upload_delay.wlan, 0.);
    assert_eq!(sim.controller().network().congestion().total(), 0);
}

#[test]
fn test_task_executed_on_device() {
    let mut config = load_config();
    config.tier_policy = "Mobile".to_string();
    let mut sim = build_stationary(config);
    sim.submit(request(0, 1.));
    sim.run().unwrap();

    let task = sim.task(0).unwrap();
    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(task.placement().unwrap().tier, Tier::Mobile);
    assert_float_eq(task.processing_time(), 1., 1e-9);
    assert_eq!(task.network_delay(), 0.);
    assert_float_eq(task.service_time(), 1., 1e-9);
}

#[test]
// Device moves to another access point while the task is executed.
fn test_task_failed_due_to_mobility() {
    let mobility = ScriptedMobility::new(vec![vec![(0., ap0()), (1.1, ap1())]]).unwrap();
    let mut sim = build(load_config(), Rc::new(mobility));
    sim.submit(request(0, 1.));
    let stats = sim.run().unwrap();

    let task = sim.task(0).unwrap();
    assert_eq!(task.status(), TaskStatus::FailedMobility);
    assert_eq!(task.network_error, None);
    assert_eq!(task.download_delay.total(), 0.);
    assert_eq!(stats.tasks_by_status[&TaskStatus::FailedMobility], 1);
    assert_eq!(stats.failure_rate, 100.);
    assert_eq!(sim.controller().network().congestion().total(), 0);
}

/// Replays a stationary run with the given mobility and returns the resulting task.
fn replay_with_moves(config: SimulationConfig, reserve_local: bool, moves: impl Fn(&Task) -> Vec<(f64, Location)>) -> (Task, u32) {
    let reference = {
        let mut sim = build_stationary(config.clone());
        if reserve_local {
            sim.pool_mut().reserve(0, 100.);
            sim.pool_mut().reserve(1, 100.);
        }
        sim.submit(request(0, 1.));
        sim.run().unwrap();
        sim.task(0).unwrap()
    };
    assert_eq!(reference.status(), TaskStatus::Completed);

    let mobility = ScriptedMobility::new(vec![moves(&reference)]).unwrap();
    let mut sim = build(config, Rc::new(mobility));
    if reserve_local {
        sim.pool_mut().reserve(0, 100.);
        sim.pool_mut().reserve(1, 100.);
    }
    sim.submit(request(0, 1.));
    sim.run().unwrap();
    let in_flight = sim.controller().network().congestion().total();
    (sim.task(0).unwrap(), in_flight)
}

#[test]
// Device leaves the access point while the output travels over WLAN.
fn test_task_failed_due_to_move_during_download() {
    let (task, in_flight) = replay_with_moves(load_config(), false, |reference| {
        let executed_at = reference.executed_at.unwrap();
        vec![(0., ap0()), (executed_at + reference.download_delay.wlan * 0.5, ap1())]
    });

    assert_eq!(task.status(), TaskStatus::FailedMobility);
    assert_eq!(task.download_delay.total(), 0.);
    assert_eq!(in_flight, 0);
}

#[test]
// Device leaves the access point while the output is relayed from the remote edge host,
// and comes back before the WLAN hop would end.
fn test_task_failed_due_to_move_during_relayed_download() {
    let mut config = load_config();
    config.controller = "Relay".to_string();
    config.edge_scope = "all".to_string();
    let (task, in_flight) = replay_with_moves(config, true, |reference| {
        let executed_at = reference.executed_at.unwrap();
        let man = reference.download_delay.man;
        let wlan = reference.download_delay.wlan;
        assert!(man > 0. && wlan > 0.);
        vec![
            (0., ap0()),
            (executed_at + man * 0.5, ap1()),
            (executed_at + man + wlan * 0.5, ap0()),
        ]
    });

    assert_eq!(task.placement().unwrap().host, 1);
    assert_eq!(task.status(), TaskStatus::FailedMobility);
    assert_eq!(task.download_delay.man, 0.);
    assert_eq!(in_flight, 0);
}

#[test]
fn test_task_rejected_due_to_capacity() {
    let mut sim = build_stationary(load_config());
    sim.pool_mut().reserve(0, 100.);
    sim.pool_mut().reserve(1, 100.);
    sim.submit(request(0, 1.));
    sim.run().unwrap();

    let task = sim.task(0).unwrap();
    assert_eq!(task.status(), TaskStatus::RejectedCapacity);
    assert!(task.placement().is_none());
    assert_eq!(task.network_delay(), 0.);
    assert_eq!(sim.controller().network().congestion().total(), 0);
}

#[test]
// Average upload of 10^6 KB saturates WLAN in M/M/1 model.
fn test_task_rejected_due_to_bandwidth() {
    let mut config = load_config();
    config.network_model = "Mm1".to_string();
    config.applications[0].data_upload = 1e6;
    let mut sim = build_stationary(config);
    sim.submit(request(0, 1.));
    let stats = sim.run().unwrap();

    let task = sim.task(0).unwrap();
    assert_eq!(task.status(), TaskStatus::RejectedBandwidth);
    assert_eq!(task.network_error, Some(Link::Wlan));
    assert_eq!(stats.network_failures[&Link::Wlan], 1);
    assert_eq!(sim.controller().network().congestion().total(), 0);
}

fn remote_placement_sim(controller: &str) -> EdgeSimulation {
    let mut config = load_config();
    config.controller = controller.to_string();
    config.edge_scope = "all".to_string();
    let sim = build_stationary(config);
    // the only free VMs are behind the second access point
    sim.pool_mut().reserve(0, 100.);
    sim.pool_mut().reserve(1, 100.);
    sim
}

#[test]
fn test_relay_controller_forwards_over_man() {
    let mut sim = remote_placement_sim("Relay");
    sim.submit(request(0, 1.));
    sim.run().unwrap();

    let task = sim.task(0).unwrap();
    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(task.placement().unwrap().host, 1);
    assert_eq!(task.placement().unwrap().vm, 2);
    assert!(task.upload_delay.wlan > 0.);
    assert!(task.upload_delay.man > 0.);
    assert!(task.download_delay.man > 0.);
    assert!(task.download_delay.wlan > 0.);
    assert_float_eq(
        task.service_time(),
        task.network_delay() + task.processing_time(),
        1e-9,
    );
    assert_eq!(sim.controller().network().congestion().total(), 0);
}

#[test]
fn test_direct_controller_delivers_to_remote_host_directly() {
    let mut sim = remote_placement_sim("Direct");
    sim.submit(request(0, 1.));
    sim.run().unwrap();

    let task = sim.task(0).unwrap();
    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(task.placement().unwrap().host, 1);
    assert_eq!(task.upload_delay.man, 0.);
    assert_eq!(task.download_delay.man, 0.);
}

#[test]
// Relayed output reaches the device's own access point, so the final WLAN hop carries no LAN cost.
fn test_relayed_download_is_not_charged_for_internal_lan() {
    let wlan = |controller: &str| {
        let mut config = load_config();
        config.controller = controller.to_string();
        config.edge_scope = "all".to_string();
        config.network_model = "Mm1".to_string();
        let mut sim = build_stationary(config);
        sim.pool_mut().reserve(0, 100.);
        sim.pool_mut().reserve(1, 100.);
        sim.submit(request(0, 1.));
        sim.run().unwrap();
        let task = sim.task(0).unwrap();
        assert_eq!(task.status(), TaskStatus::Completed);
        task.download_delay.wlan
    };
    let config = load_config();
    let queueing = mm1_delay(0., config.wlan_bandwidth, 5., 100., 1);
    assert_float_eq(wlan("Relay"), queueing, 1e-9);
    assert_float_eq(wlan("Direct"), queueing + 2. * config.internal_lan_delay, 1e-9);
}

#[test]
fn test_saturated_relay_rejects_task() {
    let mut sim = {
        let mut config = load_config();
        config.controller = "Relay".to_string();
        config.edge_scope = "all".to_string();
        config.man_bandwidth = 1.;
        build_stationary(config)
    };
    sim.pool_mut().reserve(0, 100.);
    sim.pool_mut().reserve(1, 100.);
    sim.submit(request(0, 1.));
    sim.run().unwrap();

    let task = sim.task(0).unwrap();
    assert_eq!(task.status(), TaskStatus::RejectedBandwidth);
    assert_eq!(task.network_error, Some(Link::Man));
    assert!(task.upload_delay.wlan > 0.);
    assert_eq!(sim.controller().network().congestion().total(), 0);
}

#[test]
fn test_missing_tier_aborts_run() {
    let mut config = load_config();
    config.cloud = None;
    config.tier_policy = "Cloud".to_string();
    let mut sim = build_stationary(config);
    sim.submit(request(0, 1.));
    sim.submit(request(0, 2.));
    let result = sim.run();

    assert!(matches!(result, Err(SimulationError::UnknownTier(Tier::Cloud))));
    assert!(sim.task(0).is_none());
    assert!(sim.task(1).is_none());
}

#[derive(Clone, Serialize)]
struct Heartbeat {
    seq: u32,
}

#[test]
fn test_unknown_event_aborts_run() {
    let mut simulation = Simulation::new(123);
    let ctx = simulation.create_context("intruder");
    let mobility = Rc::new(ScriptedMobility::stationary(vec![ap0()]));
    let mut sim = EdgeSimulation::with_mobility(simulation, load_config(), mobility).unwrap();
    ctx.emit(Heartbeat { seq: 1 }, sim.controller_id(), 0.5);
    sim.submit(request(0, 1.));

    match sim.run() {
        Err(SimulationError::UnknownEvent { component, type_name }) => {
            assert_eq!(component, "device_manager");
            assert_eq!(type_name, "Heartbeat");
        }
        other => panic!("unexpected result: {:?}", other.map(|s| s.total_tasks)),
    }
    assert!(sim.task(0).is_none());
}

#[test]
fn test_generated_load() {
    let run = |seed: u64| {
        let mut sim = EdgeSimulation::new(Simulation::new(seed), load_config(), 20).unwrap();
        let count = sim.generate_load().unwrap();
        assert!(count > 0);
        let stats = sim.run().unwrap();
        let tasks = sim.tasks();
        let terminal = tasks.iter().filter(|t| t.status().is_terminal()).count() as u64;
        assert_eq!(stats.total_tasks, terminal);
        assert_eq!(stats.completed_tasks + stats.failed_tasks, stats.total_tasks);
        let in_transfer = tasks
            .iter()
            .filter(|t| matches!(t.status(), TaskStatus::Uploading | TaskStatus::Downloading))
            .count() as u32;
        assert_eq!(sim.controller().network().congestion().total(), in_transfer);
        tasks.iter().map(|t| (t.id, t.status())).collect::<Vec<_>>()
    };
    assert_eq!(run(42), run(42));
}
