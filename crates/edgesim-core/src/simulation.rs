//! Component registry and the event loop.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::Level::Trace;
use log::{debug, log_enabled};

use crate::context::SimulationContext;
use crate::handler::EventHandler;
use crate::kernel::Kernel;
use crate::logging;
use crate::Id;

/// Discrete-event simulation.
///
/// Components are registered by name. A name gets its identifier on first use, either by
/// [`create_context`](Simulation::create_context) or by [`add_handler`](Simulation::add_handler), so a
/// component may send events before its handler is attached.
pub struct Simulation {
    kernel: Rc<RefCell<Kernel>>,
    ids: HashMap<String, Id>,
    names: Vec<String>,
    handlers: Vec<Option<Rc<RefCell<dyn EventHandler>>>>,
}

impl Simulation {
    /// Creates an empty simulation whose random generator is seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            kernel: Rc::new(RefCell::new(Kernel::new(seed))),
            ids: HashMap::new(),
            names: Vec::new(),
            handlers: Vec::new(),
        }
    }

    fn register(&mut self, name: &str) -> Id {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len() as Id;
        self.ids.insert(name.to_owned(), id);
        self.names.push(name.to_owned());
        self.handlers.push(None);
        debug!(target: "simulation", "Registered component {} with id {}", name, id);
        id
    }

    /// Creates a context for the named component.
    pub fn create_context<S: AsRef<str>>(&mut self, name: S) -> SimulationContext {
        let id = self.register(name.as_ref());
        SimulationContext::new(id, name.as_ref(), self.kernel.clone())
    }

    /// Attaches the handler receiving events of the named component, returns the component identifier.
    pub fn add_handler<S: AsRef<str>>(&mut self, name: S, handler: Rc<RefCell<dyn EventHandler>>) -> Id {
        let id = self.register(name.as_ref());
        self.handlers[id as usize] = Some(handler);
        id
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.kernel.borrow().time()
    }

    /// Time of the earliest pending event.
    pub fn peek_event_time(&self) -> Option<f64> {
        self.kernel.borrow().peek_time()
    }

    /// Delivers the earliest pending event, returns `false` if there are none.
    ///
    /// Events addressed to a component without handler are logged and dropped.
    pub fn step(&mut self) -> bool {
        let next = self.kernel.borrow_mut().pop();
        let event = match next {
            Some(event) => event,
            None => return false,
        };
        match self.handlers.get(event.dst as usize) {
            Some(Some(handler)) => {
                if log_enabled!(Trace) {
                    logging::delivered(&event, &self.names[event.src as usize], &self.names[event.dst as usize]);
                }
                handler.clone().borrow_mut().on(event);
            }
            _ => logging::undelivered(&event),
        }
        true
    }

    /// Delivers events until the queue is empty.
    pub fn step_until_no_events(&mut self) {
        while self.step() {}
    }
}
