//! Events and their payloads.

use downcast_rs::{impl_downcast, Downcast};
use serde::Serialize;
use serde_json::{json, Value};

use crate::Id;

/// Payload of an event.
///
/// Implemented for every serializable `'static` type, so plain structs deriving `Serialize` can be sent as events.
pub trait EventData: Downcast + erased_serde::Serialize {
    /// Name of the payload type without the module path, e.g. `TaskExecuted` or `Batch<alloc::vec::Vec<u8>>`.
    fn type_name(&self) -> &'static str;
}

impl_downcast!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + 'static> EventData for T {
    fn type_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<T>())
    }
}

/// Strips the module path of the outer type. Generic arguments are left untouched.
pub fn short_type_name(full: &'static str) -> &'static str {
    if full.starts_with(['(', '[', '&', '*']) {
        return full;
    }
    let head = full.find('<').unwrap_or(full.len());
    match full[..head].rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

/// Event delivered to a component.
pub struct Event {
    /// Sequence number, events with equal time are delivered in the increasing order of sequence numbers.
    pub seq: u64,
    /// Delivery time.
    pub time: f64,
    /// Sender.
    pub src: Id,
    /// Receiver.
    pub dst: Id,
    /// Payload.
    pub data: Box<dyn EventData>,
}

impl Event {
    /// Name of the payload type.
    pub fn type_name(&self) -> &'static str {
        (*self.data).type_name()
    }

    /// Moves the payload out if it has type `T`, otherwise returns the event intact.
    pub fn downcast<T: EventData>(self) -> Result<T, Event> {
        let Event {
            seq,
            time,
            src,
            dst,
            data,
        } = self;
        match data.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(data) => Err(Event {
                seq,
                time,
                src,
                dst,
                data,
            }),
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        json!({"type": self.type_name(), "data": &self.data, "src": self.src, "dst": self.dst})
    }
}

#[cfg(test)]
mod tests {
    use super::short_type_name;

    #[test]
    fn module_path_is_stripped() {
        assert_eq!(short_type_name("edgesim::events::TaskExecuted"), "TaskExecuted");
        assert_eq!(short_type_name("Local"), "Local");
        assert_eq!(short_type_name("a::Wrapper<b::Inner<c::Leaf>>"), "Wrapper<b::Inner<c::Leaf>>");
        assert_eq!(short_type_name("(a::X, b::Y)"), "(a::X, b::Y)");
    }
}
