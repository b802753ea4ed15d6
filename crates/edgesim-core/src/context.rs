//! Handle through which a component reads the clock, draws random numbers and sends events.

use std::cell::RefCell;
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;

use crate::event::EventData;
use crate::kernel::Kernel;
use crate::Id;

/// Component's view of the simulation.
///
/// All methods take `&self`, so a context can be shared with helpers that only need the clock or the random
/// generator.
pub struct SimulationContext {
    id: Id,
    name: String,
    kernel: Rc<RefCell<Kernel>>,
}

impl SimulationContext {
    pub(crate) fn new(id: Id, name: &str, kernel: Rc<RefCell<Kernel>>) -> Self {
        Self {
            id,
            name: name.to_owned(),
            kernel,
        }
    }

    /// Identifier of the component.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Name of the component.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.kernel.borrow().time()
    }

    /// Draws a value uniformly from the range using the simulation-wide generator.
    pub fn gen_range<T, R>(&self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.kernel.borrow_mut().gen_range(range)
    }

    /// Draws a value from the distribution using the simulation-wide generator.
    pub fn sample_from_distribution<T, D: Distribution<T>>(&self, dist: &D) -> T {
        self.kernel.borrow_mut().sample(dist)
    }

    /// Sends the event to `dst` after `delay`.
    ///
    /// Panics if the delay is negative.
    pub fn emit<T: EventData>(&self, data: T, dst: Id, delay: f64) {
        self.kernel.borrow_mut().schedule(data, self.id, dst, delay);
    }

    /// Sends the event to `dst` at the current time.
    pub fn emit_now<T: EventData>(&self, data: T, dst: Id) {
        self.emit(data, dst, 0.);
    }

    /// Sends the event to the component itself after `delay`.
    pub fn emit_self<T: EventData>(&self, data: T, delay: f64) {
        self.emit(data, self.id, delay);
    }

    /// Sends the event to the component itself at the current time.
    pub fn emit_self_now<T: EventData>(&self, data: T) {
        self.emit(data, self.id, 0.);
    }
}
