//! Simulation of task offloading in an edge computing environment.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use edgesim_core::{Id, Simulation, SimulationContext};

use crate::config::sim_config::SimulationConfig;
use crate::device_manager::{ControllerKind, DeviceManager};
use crate::error::SimulationError;
use crate::events::SubmitTask;
use crate::executor::Executor;
use crate::load_generator::IdleActiveLoadGenerator;
use crate::mobility::{MobilityModel, NomadicMobility};
use crate::network::network_model_resolver;
use crate::orchestrator::EdgeOrchestrator;
use crate::resource_pool::ResourcePool;
use crate::stats::RunStats;
use crate::task::{Task, TaskId, TaskRequest};
use crate::utilization::utilization_model_resolver;

/// Wires together the infrastructure, the mobility and network models, the placement policy and the
/// lifecycle controller of a single simulation run.
pub struct EdgeSimulation {
    config: SimulationConfig,
    pool: Rc<RefCell<ResourcePool>>,
    mobility: Rc<dyn MobilityModel>,
    manager: Rc<RefCell<DeviceManager>>,
    manager_id: Id,
    ctx: SimulationContext,
    sim: Simulation,
}

impl EdgeSimulation {
    /// Creates simulation with devices moving between access points of edge datacenters.
    pub fn new(mut sim: Simulation, config: SimulationConfig, device_count: usize) -> Result<Self, SimulationError> {
        let mobility_ctx = sim.create_context("mobility");
        let mobility = NomadicMobility::generate(&config, device_count, &mobility_ctx)?;
        Self::with_mobility(sim, config, Rc::new(mobility))
    }

    /// Creates simulation with the given mobility model, the number of devices is taken from it.
    pub fn with_mobility(
        mut sim: Simulation,
        config: SimulationConfig,
        mobility: Rc<dyn MobilityModel>,
    ) -> Result<Self, SimulationError> {
        let device_count = mobility.device_count();
        let pool = Rc::new(RefCell::new(ResourcePool::from_config(&config, device_count)));

        let executor_ctx = sim.create_context("executor");
        let executor = Rc::new(RefCell::new(Executor::new(pool.clone(), executor_ctx)));
        let executor_id = sim.add_handler("executor", executor);

        let manager_ctx = sim.create_context("device_manager");
        let manager = Rc::new(RefCell::new(DeviceManager::new(
            ControllerKind::from_config(&config.controller)?,
            config.clone(),
            EdgeOrchestrator::from_config(&config)?,
            network_model_resolver(&config, mobility.clone())?,
            mobility.clone(),
            utilization_model_resolver(&config)?,
            pool.clone(),
            executor_id,
            manager_ctx,
        )));
        let manager_id = sim.add_handler("device_manager", manager.clone());
        manager.borrow_mut().start();

        let ctx = sim.create_context("devices");
        Ok(Self {
            config,
            pool,
            mobility,
            manager,
            manager_id,
            ctx,
            sim,
        })
    }

    /// Schedules task submission at the request start time.
    pub fn submit(&mut self, request: TaskRequest) {
        let delay = (request.start_time - self.sim.time()).max(0.);
        self.ctx.emit(SubmitTask { request }, self.manager_id, delay);
    }

    /// Generates tasks of all devices with the idle/active load generator, returns the number of tasks.
    pub fn generate_load(&mut self) -> Result<usize, SimulationError> {
        let requests = IdleActiveLoadGenerator::generate(&self.config, self.mobility.device_count(), &self.ctx)?;
        let count = requests.len();
        for request in requests {
            self.submit(request);
        }
        Ok(count)
    }

    /// Processes events up to the end of simulation time.
    ///
    /// Returns the statistics of finished tasks or the fatal error which aborted the run.
    pub fn run(&mut self) -> Result<RunStats, SimulationError> {
        loop {
            if let Some(error) = self.manager.borrow_mut().take_error() {
                return Err(error);
            }
            match self.sim.peek_event_time() {
                Some(time) if time <= self.config.simulation_time => {
                    self.sim.step();
                }
                _ => break,
            }
        }
        Ok(self.stats())
    }

    /// Identifier of the lifecycle controller component.
    pub fn controller_id(&self) -> Id {
        self.manager_id
    }

    pub fn controller(&self) -> Ref<DeviceManager> {
        self.manager.borrow()
    }

    pub fn pool(&self) -> Ref<ResourcePool> {
        self.pool.borrow()
    }

    pub fn pool_mut(&self) -> RefMut<ResourcePool> {
        self.pool.borrow_mut()
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.manager.borrow().task(id).cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.manager.borrow().tasks().cloned().collect()
    }

    pub fn stats(&self) -> RunStats {
        self.manager.borrow().logger().stats()
    }

    /// Saves outcomes of finished tasks as CSV.
    pub fn save_log(&self, path: &str) -> Result<(), SimulationError> {
        self.manager.borrow().logger().save_csv(path)
    }
}
