use super::{EventHandler, iterate};
use crate::director::DirectorHandle;
use dashmap::DashSet;
use gangway_core::error::Result;
use gangway_core::event::Event;
use gangway_core::types::ActorId;

/// Delivers messages carried by a [`SendEvent`](gangway_core::event::SendEvent)
/// by iterating the receiving actor.
///
/// Keeps its own inactive set in addition to the director's, reset on
/// `initialize`.
pub struct SendEventHandler {
    director: DirectorHandle,
    inactive: DashSet<ActorId>,
}

impl SendEventHandler {
    /// Create a handler for the given director.
    pub fn new(director: DirectorHandle) -> Self {
        Self {
            director,
            inactive: DashSet::new(),
        }
    }

    /// Actors this handler saw go inactive.
    pub fn inactive_actors(&self) -> Vec<ActorId> {
        self.inactive.iter().map(|a| a.key().clone()).collect()
    }
}

impl EventHandler for SendEventHandler {
    fn name(&self) -> &'static str {
        "send"
    }

    fn initialize(&self) {
        self.inactive.clear();
    }

    fn can_handle(&self, event: &Event) -> bool {
        matches!(event, Event::Send(_))
    }

    fn handle(&self, event: &Event) -> Result<()> {
        tracing::debug!(
            port = %event.target(),
            message = ?event.token().map(|m| m.id()),
            "Handling send event"
        );
        iterate(&self.director, event, Some(&self.inactive))
    }
}
