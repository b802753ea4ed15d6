//! Log records tagged with the simulation time and the component name.
//!
//! Records go through the `log` facade with the component name as target, so they can be filtered per
//! component, e.g. `RUST_LOG=device_manager=debug`.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::{error, trace};

use crate::event::Event;

/// Colors the level label if log records go to a terminal.
pub fn paint(label: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        label.color(color)
    } else {
        label.normal()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __component_record {
    ($level:ident, $label:literal, $color:ident, $ctx:expr, $($arg:tt)+) => {
        $crate::__log::$level!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::logging::paint($label, $crate::colored::Color::$color),
            $ctx.name(),
            format_args!($($arg)+)
        )
    };
}

/// Logs a debug record of the component owning the context.
///
/// ```rust
/// use edgesim_core::{log_debug, Simulation};
///
/// let mut sim = Simulation::new(123);
/// let ctx = sim.create_context("device");
/// log_debug!(ctx, "battery at {:.1}%", 87.5);
/// ```
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::__component_record!(debug, "DEBUG", Blue, $ctx, $($arg)+)
    };
}

/// Logs a trace record of the component owning the context.
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::__component_record!(trace, "TRACE", Cyan, $ctx, $($arg)+)
    };
}

/// Logs an error record of the component owning the context.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::__component_record!(error, "ERROR", Red, $ctx, $($arg)+)
    };
}

fn engine_error(event: &Event, what: &str) {
    error!(
        target: "simulation",
        "[{:.3} {} simulation] {}: {}",
        event.time,
        paint("ERROR", Color::Red),
        what,
        event.to_json()
    );
}

/// Logs an event which matched no arm of [`cast!`](crate::cast!).
#[doc(hidden)]
pub fn unhandled(event: Event) {
    engine_error(&event, "Unhandled event");
}

pub(crate) fn undelivered(event: &Event) {
    engine_error(event, "Undelivered event");
}

pub(crate) fn scheduled_in_past(event: &Event, delay: f64) {
    engine_error(event, &format!("Event with negative delay {}", delay));
}

pub(crate) fn delivered(event: &Event, src_name: &str, dst_name: &str) {
    trace!(
        target: dst_name,
        "[{:.3} {} {}] {} from {}",
        event.time,
        paint("EVENT", Color::BrightBlack),
        dst_name,
        event.to_json(),
        src_name
    );
}
