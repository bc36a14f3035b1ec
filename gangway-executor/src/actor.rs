//! The actor iteration capability.
//!
//! Directors drive actors through `prefire`, `fire` and `postfire`, one
//! iteration per scheduling event. Actors take `&self`: a pool dispatcher
//! may iterate different actors concurrently, while the director guarantees
//! a single actor is never iterated for two events at once.

use crate::director::DirectorHandle;
use gangway_core::error::Result;
use gangway_core::event::Event;
use gangway_core::message::Message;
use gangway_core::types::{ActorId, PortId};

/// Standard input port name.
pub const INPUT: &str = "input";
/// Standard output port name.
pub const OUTPUT: &str = "output";
/// Standard error port name.
pub const ERROR: &str = "error";

/// What an iteration knows about why it runs.
pub struct FireContext<'a> {
    /// The event driving the iteration.
    pub event: &'a Event,
    /// The director running the model.
    pub director: &'a DirectorHandle,
}

impl<'a> FireContext<'a> {
    /// Create a context for an iteration.
    pub fn new(event: &'a Event, director: &'a DirectorHandle) -> Self {
        Self { event, director }
    }

    /// The received message, for message deliveries.
    pub fn token(&self) -> Option<&'a Message> {
        self.event.token()
    }

    /// The port the message was delivered to, for message deliveries.
    pub fn receiving_port(&self) -> Option<&'a PortId> {
        match self.event {
            Event::Send(send) => Some(send.receiving()),
            Event::Fire(_) => None,
        }
    }

    /// Send a message from one of the target actor's ports.
    ///
    /// Returns the number of connected destinations.
    pub fn send(&self, port: &str, message: Message) -> Result<usize> {
        self.director.send(&self.event.target().port(port), message)
    }
}

/// A unit of dataflow computation.
pub trait Actor: Send + Sync {
    /// Identity within the model.
    fn id(&self) -> &ActorId;

    /// Prepare for a run. Sources seed their first events here.
    fn initialize(&self, _director: &DirectorHandle) -> Result<()> {
        Ok(())
    }

    /// Whether the actor is ready to fire.
    fn prefire(&self, _ctx: &FireContext<'_>) -> Result<bool> {
        Ok(true)
    }

    /// Perform the iteration.
    fn fire(&self, ctx: &FireContext<'_>) -> Result<()>;

    /// Whether the actor may be iterated again in this run.
    fn postfire(&self, _ctx: &FireContext<'_>) -> Result<bool> {
        Ok(true)
    }

    /// Release run resources.
    fn wrapup(&self) -> Result<()> {
        Ok(())
    }
}
