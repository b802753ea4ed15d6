//! Execution of tasks on VMs.

use std::cell::RefCell;
use std::rc::Rc;

use edgesim_core::cast;
use edgesim_core::{log_debug, log_error};
use edgesim_core::{Event, EventHandler, Id, SimulationContext};

use crate::events::{ExecuteTask, ExecutionCompleted, ExecutionRejected, TaskExecuted};
use crate::resource_pool::{ResourcePool, VmId};
use crate::task::TaskId;

/// Runs tasks on VMs of the resource pool.
///
/// Predicted demand is reserved on the VM for the whole execution, which lasts `length / mips` seconds.
/// A request for a VM missing from the pool is answered with [`ExecutionRejected`].
pub struct Executor {
    pool: Rc<RefCell<ResourcePool>>,
    ctx: SimulationContext,
}

impl Executor {
    pub fn new(pool: Rc<RefCell<ResourcePool>>, ctx: SimulationContext) -> Self {
        Self { pool, ctx }
    }

    fn on_execute(&mut self, task_id: TaskId, vm_id: VmId, length: f64, demand: f64, requester: Id) {
        let mips = self.pool.borrow().vm(vm_id).map(|vm| vm.mips);
        let mips = match mips {
            Some(mips) => mips,
            None => {
                log_error!(self.ctx, "task {} is assigned to unknown VM {}", task_id, vm_id);
                self.ctx.emit_now(ExecutionRejected { task_id, vm: vm_id }, requester);
                return;
            }
        };
        self.pool.borrow_mut().reserve(vm_id, demand);
        let duration = length / mips;
        log_debug!(
            self.ctx,
            "task {} started on VM {} (demand {:.2}%, duration {:.3})",
            task_id,
            vm_id,
            demand,
            duration
        );
        self.ctx.emit_self(
            ExecutionCompleted {
                task_id,
                vm: vm_id,
                demand,
                requester,
            },
            duration,
        );
    }

    fn on_completed(&mut self, task_id: TaskId, vm_id: VmId, demand: f64, requester: Id) {
        self.pool.borrow_mut().release(vm_id, demand);
        log_debug!(self.ctx, "task {} finished on VM {}", task_id, vm_id);
        self.ctx.emit_now(TaskExecuted { task_id }, requester);
    }
}

impl EventHandler for Executor {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            ExecuteTask {
                task_id,
                vm,
                length,
                demand,
                requester,
            } => {
                self.on_execute(task_id, vm, length, demand, requester);
            }
            ExecutionCompleted {
                task_id,
                vm,
                demand,
                requester,
            } => {
                self.on_completed(task_id, vm, demand, requester);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use edgesim_core::{cast, Event, EventHandler, Simulation};

    use super::*;
    use crate::resource_pool::Tier;

    #[derive(Default)]
    struct Requester {
        executed: Vec<(f64, TaskId)>,
        rejected: Vec<(TaskId, VmId)>,
    }

    struct RequesterHandler {
        log: Rc<RefCell<Requester>>,
        ctx: SimulationContext,
    }

    impl EventHandler for RequesterHandler {
        fn on(&mut self, event: Event) {
            cast!(match event.data {
                TaskExecuted { task_id } => {
                    self.log.borrow_mut().executed.push((self.ctx.time(), task_id));
                }
                ExecutionRejected { task_id, vm } => {
                    self.log.borrow_mut().rejected.push((task_id, vm));
                }
            })
        }
    }

    fn setup() -> (Simulation, Rc<RefCell<ResourcePool>>, Id, Rc<RefCell<Requester>>, SimulationContext) {
        let mut sim = Simulation::new(1);
        let mut pool = ResourcePool::new();
        let host = pool.add_host(0, Tier::Edge, None, None);
        pool.add_vm(host, 1000., 1);
        let pool = Rc::new(RefCell::new(pool));
        let executor = Executor::new(pool.clone(), sim.create_context("executor"));
        let executor_id = sim.add_handler("executor", Rc::new(RefCell::new(executor)));
        let log = Rc::new(RefCell::new(Requester::default()));
        let requester_ctx = sim.create_context("requester");
        let handler = RequesterHandler {
            log: log.clone(),
            ctx: sim.create_context("requester"),
        };
        sim.add_handler("requester", Rc::new(RefCell::new(handler)));
        (sim, pool, executor_id, log, requester_ctx)
    }

    fn request(task_id: TaskId, vm: VmId, requester: Id) -> ExecuteTask {
        ExecuteTask {
            task_id,
            vm,
            length: 500.,
            demand: 30.,
            requester,
        }
    }

    #[test]
    fn demand_is_reserved_while_running() {
        let (mut sim, pool, executor_id, log, ctx) = setup();
        ctx.emit_now(request(7, 0, ctx.id()), executor_id);
        sim.step();
        assert_eq!(pool.borrow().vm(0).unwrap().utilization, 30.);
        sim.step_until_no_events();

        assert_eq!(log.borrow().executed, vec![(0.5, 7)]);
        assert_eq!(pool.borrow().vm(0).unwrap().utilization, 0.);
    }

    #[test]
    fn unknown_vm_is_reported_to_requester() {
        let (mut sim, pool, executor_id, log, ctx) = setup();
        ctx.emit_now(request(3, 5, ctx.id()), executor_id);
        sim.step_until_no_events();

        assert_eq!(log.borrow().rejected, vec![(3, 5)]);
        assert!(log.borrow().executed.is_empty());
        assert_eq!(pool.borrow().vm(0).unwrap().utilization, 0.);
    }
}
