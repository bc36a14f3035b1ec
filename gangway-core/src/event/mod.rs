//! Scheduling events and the queue they wait in.
//!
//! Two kinds of event drive a director:
//!
//! - [`FireEvent`]: an explicit request to iterate an actor
//! - [`SendEvent`]: delivery of a message token to an input port
//!
//! Events are immutable once created and are consumed exactly once by a
//! handler. Handled events are kept in a bounded history; failures are kept
//! as [`EventError`]s.

mod config;
mod queue;

pub use config::QueueConfig;
pub use queue::EventQueue;

use crate::message::Message;
use crate::types::{ActorId, EventId, PortId};
use chrono::{DateTime, Utc};
use std::fmt;

/// Request to iterate an actor.
#[derive(Debug, Clone, PartialEq)]
pub struct FireEvent {
    id: EventId,
    timestamp: DateTime<Utc>,
    target: ActorId,
}

impl FireEvent {
    /// Create a fire event for the given actor, timestamped now.
    pub fn new(target: ActorId) -> Self {
        Self {
            id: EventId::next(),
            timestamp: Utc::now(),
            target,
        }
    }

    /// The actor to iterate.
    pub fn target(&self) -> &ActorId {
        &self.target
    }
}

/// Delivery of a message from an output port to an input port.
#[derive(Debug, Clone, PartialEq)]
pub struct SendEvent {
    id: EventId,
    timestamp: DateTime<Utc>,
    sending: PortId,
    receiving: PortId,
    token: Message,
}

impl SendEvent {
    /// Create a send event, timestamped now.
    pub fn new(sending: PortId, receiving: PortId, token: Message) -> Self {
        Self {
            id: EventId::next(),
            timestamp: Utc::now(),
            sending,
            receiving,
            token,
        }
    }

    /// The port the message left from.
    pub fn sending(&self) -> &PortId {
        &self.sending
    }

    /// The port the message is delivered to.
    pub fn receiving(&self) -> &PortId {
        &self.receiving
    }

    /// The message being delivered.
    pub fn token(&self) -> &Message {
        &self.token
    }
}

/// A scheduling event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Explicit iteration request.
    Fire(FireEvent),
    /// Message delivery.
    Send(SendEvent),
}

impl Event {
    /// Shorthand for a fire event.
    pub fn fire(target: ActorId) -> Self {
        Self::Fire(FireEvent::new(target))
    }

    /// Shorthand for a send event.
    pub fn send(sending: PortId, receiving: PortId, token: Message) -> Self {
        Self::Send(SendEvent::new(sending, receiving, token))
    }

    /// Unique event id.
    pub fn id(&self) -> EventId {
        match self {
            Self::Fire(e) => e.id,
            Self::Send(e) => e.id,
        }
    }

    /// Creation time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Fire(e) => e.timestamp,
            Self::Send(e) => e.timestamp,
        }
    }

    /// The actor this event iterates.
    ///
    /// For a send event this is the owner of the receiving port.
    pub fn target(&self) -> &ActorId {
        match self {
            Self::Fire(e) => &e.target,
            Self::Send(e) => &e.receiving.actor,
        }
    }

    /// The delivered message, for send events.
    pub fn token(&self) -> Option<&Message> {
        match self {
            Self::Fire(_) => None,
            Self::Send(e) => Some(&e.token),
        }
    }

    /// Short name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fire(_) => "fire",
            Self::Send(_) => "send",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fire(e) => write!(f, "{} fire {}", e.id, e.target),
            Self::Send(e) => write!(f, "{} send {} -> {}", e.id, e.sending, e.receiving),
        }
    }
}

/// An event paired with the failure raised while handling it.
#[derive(Debug, Clone)]
pub struct EventError {
    /// The event being handled.
    pub event: Event,
    /// Error code of the failure (e.g. "E304").
    pub code: &'static str,
    /// Rendered failure message.
    pub message: String,
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
}

impl EventError {
    /// Record a failure for an event.
    pub fn new(event: Event, error: &crate::error::GangwayError) -> Self {
        Self {
            event,
            code: error.code(),
            message: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.event.id(), self.message)
    }
}
