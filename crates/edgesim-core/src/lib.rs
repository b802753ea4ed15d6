#![warn(missing_docs)]
#![doc = include_str!("../readme.md")]

pub mod context;
pub mod event;
pub mod handler;
mod kernel;
pub mod logging;
pub mod simulation;

pub use colored;
#[doc(hidden)]
pub use ::log as __log;

pub use context::SimulationContext;
pub use event::{Event, EventData};
pub use handler::EventHandler;
pub use simulation::Simulation;

/// Identifier of a simulation component.
pub type Id = u32;
