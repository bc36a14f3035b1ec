use super::{EventHandler, iterate};
use crate::director::DirectorHandle;
use gangway_core::error::Result;
use gangway_core::event::Event;

/// Iterates actors that scheduled themselves with a [`FireEvent`](gangway_core::event::FireEvent).
pub struct FireEventHandler {
    director: DirectorHandle,
}

impl FireEventHandler {
    /// Create a handler for the given director.
    pub fn new(director: DirectorHandle) -> Self {
        Self { director }
    }
}

impl EventHandler for FireEventHandler {
    fn name(&self) -> &'static str {
        "fire"
    }

    fn can_handle(&self, event: &Event) -> bool {
        matches!(event, Event::Fire(_))
    }

    fn handle(&self, event: &Event) -> Result<()> {
        tracing::debug!(actor = %event.target(), "Handling fire event");
        iterate(&self.director, event, None)
    }
}
