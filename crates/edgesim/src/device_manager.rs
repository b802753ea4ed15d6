//! Task lifecycle controller.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Instant;

use edgesim_core::cast;
use edgesim_core::{log_debug, log_error, log_trace};
use edgesim_core::{Event, EventHandler, Id, SimulationContext};

use crate::config::sim_config::SimulationConfig;
use crate::error::SimulationError;
use crate::events::{
    ExecuteTask, ExecutionRejected, RequestForwardedToNeighbor, RequestReceivedByCloud, RequestReceivedByEdge, RequestReceivedByMobile,
    RequestReceivedByRemoteEdge, ResponseForwardedToNeighbor, ResponseReceivedByMobile, SubmitTask, TaskExecuted,
    UpdateNetworkModel,
};
use crate::location::Location;
use crate::logger::TaskLogger;
use crate::mobility::MobilityModel;
use crate::network::{Link, NetworkModel, Route, Transfer};
use crate::orchestrator::{EdgeOrchestrator, PolicyView, Target};
use crate::resource_pool::{ResourcePool, Tier, VmId};
use crate::task::{Task, TaskId, TaskRequest, TaskStatus};
use crate::utilization::CpuUtilizationModel;

/// Variant of the lifecycle controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerKind {
    /// Tasks are always delivered over the device's own access point.
    Direct,
    /// Tasks placed on an edge host behind another access point are relayed over the MAN.
    Relay,
}

impl ControllerKind {
    pub fn from_config(value: &str) -> Result<Self, SimulationError> {
        match value {
            "Direct" => Ok(ControllerKind::Direct),
            "Relay" => Ok(ControllerKind::Relay),
            _ => Err(SimulationError::config(format!("unsupported controller: {}", value))),
        }
    }
}

enum Admission {
    Rejected(TaskStatus, Option<Link>),
    Accepted { vm: VmId, route: Option<Route>, delay: f64 },
}

/// Next event of a download.
enum DownloadHop {
    ToNeighbor,
    ToMobile,
}

/// Drives tasks through upload, execution and download, and reports their outcomes.
///
/// The first fatal error stops processing of further events, it is retrieved by the harness with
/// [`take_error`](DeviceManager::take_error).
pub struct DeviceManager {
    kind: ControllerKind,
    config: SimulationConfig,
    tasks: BTreeMap<TaskId, Task>,
    next_task_id: TaskId,
    orchestrator: EdgeOrchestrator,
    network: Box<dyn NetworkModel>,
    mobility: Rc<dyn MobilityModel>,
    utilization: Rc<dyn CpuUtilizationModel>,
    pool: Rc<RefCell<ResourcePool>>,
    logger: TaskLogger,
    executor_id: Id,
    fatal: Option<SimulationError>,
    ctx: SimulationContext,
}

impl DeviceManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: ControllerKind,
        config: SimulationConfig,
        orchestrator: EdgeOrchestrator,
        network: Box<dyn NetworkModel>,
        mobility: Rc<dyn MobilityModel>,
        utilization: Rc<dyn CpuUtilizationModel>,
        pool: Rc<RefCell<ResourcePool>>,
        executor_id: Id,
        ctx: SimulationContext,
    ) -> Self {
        let logger = TaskLogger::new(config.warm_up_period);
        Self {
            kind,
            config,
            tasks: BTreeMap::new(),
            next_task_id: 0,
            orchestrator,
            network,
            mobility,
            utilization,
            pool,
            logger,
            executor_id,
            fatal: None,
            ctx,
        }
    }

    /// Schedules periodic updates of the network model starting with client activity.
    pub fn start(&mut self) {
        let delay = (self.config.client_activity_start_time - self.ctx.time()).max(0.);
        self.ctx.emit_self(UpdateNetworkModel {}, delay);
    }

    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn logger(&self) -> &TaskLogger {
        &self.logger
    }

    pub fn network(&self) -> &dyn NetworkModel {
        self.network.as_ref()
    }

    /// Returns the fatal error which stopped the controller.
    pub fn take_error(&mut self) -> Option<SimulationError> {
        self.fatal.take()
    }

    fn fail(&mut self, error: SimulationError) {
        log_error!(self.ctx, "fatal error: {}", error);
        if self.fatal.is_none() {
            self.fatal = Some(error);
        }
    }

    fn take_task(&mut self, task_id: TaskId) -> Result<Task, SimulationError> {
        self.tasks.remove(&task_id).ok_or(SimulationError::MissingTask(task_id))
    }

    fn submitted_location(&self, task: &Task) -> Location {
        match task.submitted_location() {
            Some(location) => *location,
            None => self.mobility.location(task.device, task.created_at),
        }
    }

    fn terminate(&mut self, mut task: Task, status: TaskStatus, link: Option<Link>) {
        if task.set_status(status) {
            task.network_error = link;
            task.finished_at = Some(self.ctx.time());
            log_debug!(self.ctx, "task {} finished with status {:?}", task.id, status);
            self.logger.report(&task);
            self.orchestrator.task_finished(&task);
        }
        self.tasks.insert(task.id, task);
    }

    // Submission ----------------------------------------------------------------------------------

    fn on_submit(&mut self, request: TaskRequest) -> Result<(), SimulationError> {
        let now = self.ctx.time();
        let mut task = Task::new(self.next_task_id, &request, now);
        self.next_task_id += 1;
        let location = self.mobility.location(task.device, now);
        task.set_submitted_location(location);

        let (vm, route, delay) = match self.admit(&mut task, location)? {
            Admission::Rejected(status, link) => {
                self.terminate(task, status, link);
                return Ok(());
            }
            Admission::Accepted { vm, route, delay } => (vm, route, delay),
        };
        let placement = self.pool.borrow().placement(vm);
        task.bind(placement);
        log_debug!(
            self.ctx,
            "task {} of device {} placed on VM {} ({:?})",
            task.id,
            task.device,
            vm,
            placement.tier
        );

        let task_id = task.id;
        match route {
            None => {
                self.ctx.emit_self_now(RequestReceivedByMobile { task_id });
            }
            Some(route) => {
                let link = route.link();
                self.network.upload_started(&location, link);
                task.set_status(TaskStatus::Uploading);
                task.upload_delay.set(link, delay);
                if route == Route::Cloud {
                    self.ctx.emit_self(RequestReceivedByCloud { task_id }, delay);
                } else if self.kind == ControllerKind::Relay && placement.access_point != Some(location.access_point) {
                    self.ctx.emit_self(RequestForwardedToNeighbor { task_id }, delay);
                } else {
                    self.ctx.emit_self(RequestReceivedByEdge { task_id }, delay);
                }
            }
        }
        self.tasks.insert(task_id, task);
        Ok(())
    }

    /// Runs the placement policy and checks that the task can be uploaded.
    fn admit(&mut self, task: &mut Task, location: Location) -> Result<Admission, SimulationError> {
        let now = self.ctx.time();
        let pool = self.pool.borrow();
        let mut view = PolicyView {
            time: now,
            warm_up_period: self.config.warm_up_period,
            location,
            pool: &pool,
            utilization: self.utilization.as_ref(),
            network: self.network.as_mut(),
            mobility: self.mobility.as_ref(),
            apps: &self.config.applications,
            ctx: &self.ctx,
        };
        let started = Instant::now();
        let target = self.orchestrator.choose_target(task, &mut view);
        task.orchestrator_overhead = started.elapsed().as_secs_f64();
        let candidates = self.orchestrator.candidates(task, target, &view)?;
        log_trace!(self.ctx, "task {}: target {:?}, candidate hosts {:?}", task.id, target, candidates);

        let route = match target {
            Target::Mobile => None,
            Target::Cloud => Some(Route::Cloud),
            Target::Edge | Target::EdgeHost(_) => Some(Route::Edge),
        };
        let mut delay = 0.;
        if let Some(route) = route {
            delay = view.network.upload_delay(now, &Transfer::upload(task, route));
            if delay <= 0. {
                return Ok(Admission::Rejected(TaskStatus::RejectedBandwidth, Some(route.link())));
            }
        }
        match self.orchestrator.choose_vm(task, &candidates, &view) {
            Some(vm) => Ok(Admission::Accepted { vm, route, delay }),
            None => Ok(Admission::Rejected(TaskStatus::RejectedCapacity, None)),
        }
    }

    // Upload --------------------------------------------------------------------------------------

    fn on_request_forwarded(&mut self, task_id: TaskId) -> Result<(), SimulationError> {
        let mut task = self.take_task(task_id)?;
        let location = self.submitted_location(&task);
        self.network.upload_finished(&location, Link::Wlan);
        let delay = self
            .network
            .upload_delay(self.ctx.time(), &Transfer::upload(&task, Route::Relay));
        if delay <= 0. {
            self.terminate(task, TaskStatus::RejectedBandwidth, Some(Link::Man));
            return Ok(());
        }
        self.network.upload_started(&location, Link::Man);
        task.upload_delay.man = delay;
        self.ctx.emit_self(RequestReceivedByRemoteEdge { task_id }, delay);
        self.tasks.insert(task_id, task);
        Ok(())
    }

    fn on_request_received(&mut self, task_id: TaskId, link: Option<Link>) -> Result<(), SimulationError> {
        let mut task = self.take_task(task_id)?;
        if let Some(link) = link {
            let location = self.submitted_location(&task);
            self.network.upload_finished(&location, link);
        }
        let result = self.submit_to_vm(&mut task);
        self.tasks.insert(task_id, task);
        result
    }

    fn submit_to_vm(&mut self, task: &mut Task) -> Result<(), SimulationError> {
        let vm_id = match task.placement() {
            Some(placement) => placement.vm,
            None => return Err(SimulationError::MissingTask(task.id)),
        };
        let demand = match self.pool.borrow().vm(vm_id) {
            Some(vm) => self.utilization.predict(task, vm),
            None => return Err(SimulationError::UnknownVm(vm_id)),
        };
        self.ctx.emit_now(
            ExecuteTask {
                task_id: task.id,
                vm: vm_id,
                length: task.length,
                demand,
                requester: self.ctx.id(),
            },
            self.executor_id,
        );
        task.set_status(TaskStatus::Processing);
        task.execution_started_at = Some(self.ctx.time());
        Ok(())
    }

    // Download ------------------------------------------------------------------------------------

    fn on_task_executed(&mut self, task_id: TaskId) -> Result<(), SimulationError> {
        let mut task = self.take_task(task_id)?;
        task.executed_at = Some(self.ctx.time());
        let placement = match task.placement() {
            Some(placement) => *placement,
            None => return Err(SimulationError::MissingTask(task_id)),
        };
        match placement.tier {
            Tier::Mobile => {
                self.ctx.emit_self_now(ResponseReceivedByMobile { task_id });
                self.tasks.insert(task_id, task);
            }
            Tier::Cloud => {
                let transfer = Transfer::download(&task, Route::Cloud);
                self.start_download(task, transfer, DownloadHop::ToMobile);
            }
            Tier::Edge => {
                let location = self.submitted_location(&task);
                if self.kind == ControllerKind::Relay && placement.access_point != Some(location.access_point) {
                    let transfer = Transfer::download(&task, Route::Relay);
                    self.start_download(task, transfer, DownloadHop::ToNeighbor);
                } else {
                    let transfer = Transfer::download(&task, Route::Edge);
                    self.start_download(task, transfer, DownloadHop::ToMobile);
                }
            }
        }
        Ok(())
    }

    /// Starts the next download hop. The device must stay at its access point until the hop ends,
    /// for relayed output this is checked on both hops.
    fn start_download(&mut self, mut task: Task, transfer: Transfer, hop: DownloadHop) {
        let now = self.ctx.time();
        let link = transfer.route.link();
        let delay = self.network.download_delay(now, &transfer);
        if delay <= 0. {
            self.terminate(task, TaskStatus::FailedBandwidth, Some(link));
            return;
        }
        let location = self.submitted_location(&task);
        let arrival_location = self.mobility.location(task.device, now + delay);
        if arrival_location.access_point != location.access_point {
            log_debug!(
                self.ctx,
                "device {} leaves access point {} before {:?} download of task {} ends",
                task.device,
                location.access_point,
                link,
                task.id
            );
            self.terminate(task, TaskStatus::FailedMobility, None);
            return;
        }
        self.network.download_started(&location, link);
        task.set_status(TaskStatus::Downloading);
        task.download_delay.set(link, delay);
        let task_id = task.id;
        match hop {
            DownloadHop::ToNeighbor => self.ctx.emit_self(ResponseForwardedToNeighbor { task_id }, delay),
            DownloadHop::ToMobile => self.ctx.emit_self(ResponseReceivedByMobile { task_id }, delay),
        };
        self.tasks.insert(task_id, task);
    }

    fn on_response_forwarded(&mut self, task_id: TaskId) -> Result<(), SimulationError> {
        let task = self.take_task(task_id)?;
        let location = self.submitted_location(&task);
        self.network.download_finished(&location, Link::Man);
        // the output is already at the device's access point
        let mut transfer = Transfer::download(&task, Route::Edge);
        transfer.host_access_point = Some(location.access_point);
        self.start_download(task, transfer, DownloadHop::ToMobile);
        Ok(())
    }

    fn on_response_received(&mut self, task_id: TaskId) -> Result<(), SimulationError> {
        let task = self.take_task(task_id)?;
        let link = match task.placement().map(|p| p.tier) {
            Some(Tier::Cloud) => Some(Link::Wan),
            Some(Tier::Edge) => Some(Link::Wlan),
            _ => None,
        };
        if let Some(link) = link {
            let location = self.submitted_location(&task);
            self.network.download_finished(&location, link);
        }
        self.terminate(task, TaskStatus::Completed, None);
        Ok(())
    }

    // Network model -------------------------------------------------------------------------------

    fn on_update_network_model(&mut self) {
        let now = self.ctx.time();
        self.network.on_periodic_update(now);
        let interval = self.config.relay_update_interval;
        if now + interval <= self.config.simulation_time {
            self.ctx.emit_self(UpdateNetworkModel {}, interval);
        }
    }
}

impl EventHandler for DeviceManager {
    fn on(&mut self, event: Event) {
        if self.fatal.is_some() {
            return;
        }
        let mut result: Result<(), SimulationError> = Ok(());
        cast!(match event.data {
            SubmitTask { request } => {
                result = self.on_submit(request);
            }
            RequestReceivedByCloud { task_id } => {
                result = self.on_request_received(task_id, Some(Link::Wan));
            }
            RequestReceivedByEdge { task_id } => {
                result = self.on_request_received(task_id, Some(Link::Wlan));
            }
            RequestReceivedByMobile { task_id } => {
                result = self.on_request_received(task_id, None);
            }
            RequestForwardedToNeighbor { task_id } => {
                result = self.on_request_forwarded(task_id);
            }
            RequestReceivedByRemoteEdge { task_id } => {
                result = self.on_request_received(task_id, Some(Link::Man));
            }
            TaskExecuted { task_id } => {
                result = self.on_task_executed(task_id);
            }
            ExecutionRejected { task_id, vm } => {
                log_error!(self.ctx, "executor rejected task {} on VM {}", task_id, vm);
                result = Err(SimulationError::UnknownVm(vm));
            }
            ResponseForwardedToNeighbor { task_id } => {
                result = self.on_response_forwarded(task_id);
            }
            ResponseReceivedByMobile { task_id } => {
                result = self.on_response_received(task_id);
            }
            UpdateNetworkModel {} => {
                self.on_update_network_model();
            }
            _ => {
                result = Err(SimulationError::UnknownEvent {
                    component: self.ctx.name().to_string(),
                    type_name: event.type_name().to_string(),
                });
            }
        });
        if let Err(error) = result {
            self.fail(error);
        }
    }
}
