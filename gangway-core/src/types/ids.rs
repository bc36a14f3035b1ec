//! Strongly-typed identifiers for gangway entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of an actor within a model.
///
/// The identifier is the actor's full dotted name (e.g. `order_flow.splitter`),
/// which is also what task initiators are derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(Arc<str>);

impl ActorId {
    /// Create an actor ID from its full name.
    #[must_use]
    pub fn new(full_name: impl AsRef<str>) -> Self {
        Self(Arc::from(full_name.as_ref()))
    }

    /// The full dotted name.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.0
    }

    /// The last segment of the full name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Port with the given name on this actor.
    #[must_use]
    pub fn port(&self, name: impl Into<String>) -> PortId {
        PortId::new(self.clone(), name)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Serialize for ActorId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ActorId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::new(name))
    }
}

/// Identifier for a port on an actor.
///
/// Ports are named connection points for inputs and outputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortId {
    /// The actor this port belongs to.
    pub actor: ActorId,
    /// The port name (e.g., "input", "output", "error").
    pub name: String,
}

impl PortId {
    /// Create a new port ID.
    #[must_use]
    pub fn new(actor: ActorId, name: impl Into<String>) -> Self {
        Self {
            actor,
            name: name.into(),
        }
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.actor, self.name)
    }
}

/// Identifiers handed out from a process-wide counter.
macro_rules! counter_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Allocate the next unique ID.
            #[must_use]
            pub fn next() -> Self {
                static COUNTER: AtomicU64 = AtomicU64::new(1);
                Self(COUNTER.fetch_add(1, Ordering::Relaxed))
            }

            /// Get the raw ID value.
            #[must_use]
            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }
    };
}

counter_id!(
    /// Unique identifier of a scheduling event.
    EventId,
    "event"
);

counter_id!(
    /// Unique identifier of a message.
    MessageId,
    "msg"
);

counter_id!(
    /// Unique identifier of a registered context callback.
    CallbackId,
    "callback"
);

/// Identifiers assigned by the context arena.
macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Create an ID from a raw value.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the raw ID value.
            #[must_use]
            pub const fn as_u64(&self) -> u64 {
                self.0
            }

            /// Parse the raw decimal form (as written into message headers).
            pub fn parse(s: &str) -> Option<Self> {
                s.trim().parse::<u64>().ok().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Identifier of a request, the root of a context tree.
    RequestId,
    "request"
);

arena_id!(
    /// Identifier of an execution context.
    ContextId,
    "ctx"
);

arena_id!(
    /// Identifier of a task.
    TaskId,
    "task"
);

/// Opaque handle for in-flight asynchronous work owned by an actor.
///
/// The director keeps the run alive while any handle is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskHandle {
    /// A persisted task.
    Task(TaskId),
    /// Ad-hoc work tied to the message being processed.
    Message(MessageId),
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(id) => id.fmt(f),
            Self::Message(id) => id.fmt(f),
        }
    }
}

impl From<TaskId> for TaskHandle {
    fn from(id: TaskId) -> Self {
        Self::Task(id)
    }
}

impl From<MessageId> for TaskHandle {
    fn from(id: MessageId) -> Self {
        Self::Message(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_id_names() {
        let id = ActorId::new("flow.sub.splitter");
        assert_eq!(id.full_name(), "flow.sub.splitter");
        assert_eq!(id.name(), "splitter");
        assert_eq!(id.to_string(), "flow.sub.splitter");

        let plain = ActorId::new("single");
        assert_eq!(plain.name(), "single");
    }

    #[test]
    fn port_display() {
        let port = ActorId::new("flow.a").port("output");
        assert_eq!(port.to_string(), "flow.a.output");
        assert_eq!(port.actor, ActorId::new("flow.a"));
    }

    #[test]
    fn counter_ids_are_unique() {
        let a = EventId::next();
        let b = EventId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn arena_id_parse() {
        assert_eq!(ContextId::parse("42"), Some(ContextId::new(42)));
        assert_eq!(ContextId::parse(" 7 "), Some(ContextId::new(7)));
        assert_eq!(ContextId::parse("ctx_7"), None);
    }

    #[test]
    fn task_handle_display() {
        assert_eq!(TaskHandle::from(TaskId::new(3)).to_string(), "task_3");
    }

    #[test]
    fn actor_id_serde_is_plain_string() {
        let json = serde_json::to_string(&ActorId::new("flow.a")).unwrap();
        assert_eq!(json, "\"flow.a\"");
        let back: ActorId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ActorId::new("flow.a"));
    }
}
