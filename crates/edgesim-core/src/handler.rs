//! Event handling.

use crate::event::Event;

/// Component which consumes events.
pub trait EventHandler {
    /// Processes the event addressed to the component.
    fn on(&mut self, event: Event);
}

/// Dispatches an event by the type of its payload.
///
/// Each arm destructures one payload type. The arms are tried in order with [`Event::downcast`], so the
/// payload is moved out without cloning. An optional trailing `_ => { ... }` arm gets the event back
/// under the same name. Without it, events of other types are logged as unhandled.
///
/// ```rust
/// use serde::Serialize;
/// use edgesim_core::{cast, Event, EventHandler};
///
/// #[derive(Serialize)]
/// struct Ping {
///     seq: u32,
/// }
///
/// #[derive(Default)]
/// struct Counter {
///     last: u32,
///     others: Vec<&'static str>,
/// }
///
/// impl EventHandler for Counter {
///     fn on(&mut self, event: Event) {
///         cast!(match event.data {
///             Ping { seq } => {
///                 self.last = seq;
///             }
///             _ => {
///                 self.others.push(event.type_name());
///             }
///         })
///     }
/// }
/// ```
#[macro_export]
macro_rules! cast {
    (@arms $event:ident; _ => $fallback:block) => {
        $fallback
    };
    (@arms $event:ident;) => {
        $crate::logging::unhandled($event)
    };
    (@arms $event:ident; $type:ident { $($fields:tt)* } => $body:block $($rest:tt)*) => {
        match $event.downcast::<$type>() {
            Ok($type { $($fields)* }) => $body,
            Err($event) => $crate::cast!(@arms $event; $($rest)*),
        }
    };
    (match $event:ident.data { $($arms:tt)+ }) => {
        $crate::cast!(@arms $event; $($arms)+)
    };
}
