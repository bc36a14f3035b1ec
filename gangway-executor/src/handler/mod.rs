//! Event handlers.
//!
//! A handler turns one kind of [`Event`] into an actor iteration. The
//! dispatcher asks each registered handler in order whether it can handle
//! an event; the first that accepts it runs.

mod fire;
mod send;

pub use fire::FireEventHandler;
pub use send::SendEventHandler;

use crate::actor::FireContext;
use crate::director::DirectorHandle;
use crate::dispatch::DispatchReport;
use dashmap::DashSet;
use gangway_core::error::Result;
use gangway_core::event::{Event, EventError};
use gangway_core::types::ActorId;

/// Handles one kind of scheduling event.
pub trait EventHandler: Send + Sync {
    /// Handler name, for logs.
    fn name(&self) -> &'static str;

    /// Reset per-run state.
    fn initialize(&self) {}

    /// Whether this handler accepts the event.
    fn can_handle(&self, event: &Event) -> bool;

    /// Iterate the event's target actor.
    fn handle(&self, event: &Event) -> Result<()>;
}

/// Ordered list of handlers; the first accepting handler wins.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler.
    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub(crate) fn initialize(&self) {
        for handler in &self.handlers {
            handler.initialize();
        }
    }

    /// Run the first handler accepting `event` and record the outcome.
    ///
    /// Handler failures are recorded in `report`. Liveness invariant
    /// violations are also returned, since they mean the run is corrupt.
    pub(crate) fn handle(&self, event: Event, report: &DispatchReport) -> Result<()> {
        let Some(handler) = self.handlers.iter().find(|h| h.can_handle(&event)) else {
            tracing::debug!(event = %event, "No handler for event");
            report.record_unhandled(event);
            return Ok(());
        };

        tracing::trace!(event = %event, handler = handler.name(), "Handling event");
        let outcome = handler.handle(&event);
        if let Err(e) = &outcome {
            tracing::warn!(
                event = %event,
                handler = handler.name(),
                error = %e,
                "Event handler failed"
            );
            report.record_error(EventError::new(event.clone(), e));
        }
        report.record_delivered(event);

        match outcome {
            Err(e) if e.is_invariant_violation() => Err(e),
            _ => Ok(()),
        }
    }
}

/// One actor iteration for `event`, shared by both handlers.
///
/// Skips inactive actors. The actor is registered as iterating for the
/// event for the duration of `prefire`/`fire`/`postfire`, and marked
/// inactive when `postfire` returns `false`. `local_inactive` is an extra
/// inactive set owned by the calling handler.
pub(crate) fn iterate(
    director: &DirectorHandle,
    event: &Event,
    local_inactive: Option<&DashSet<ActorId>>,
) -> Result<()> {
    let target = event.target();
    if director.is_actor_inactive(target) || local_inactive.is_some_and(|set| set.contains(target)) {
        tracing::debug!(actor = %target, event = %event.id(), "Actor inactive, skipping event");
        return Ok(());
    }

    let actor = director.model().require_actor(target)?;
    let _span = crate::iteration_span!(target, event.id()).entered();
    director.notify_actor_iterating_for_event(target, event.id())?;

    let ctx = FireContext::new(event, director);
    let outcome = (|| {
        if !actor.prefire(&ctx)? {
            tracing::trace!(actor = %target, "Actor not ready to fire");
            return Ok(true);
        }
        actor.fire(&ctx)?;
        actor.postfire(&ctx)
    })();

    director.notify_actor_done_iterating(target, event.id())?;

    if !outcome? {
        director.set_actor_inactive(target);
        if let Some(set) = local_inactive {
            set.insert(target.clone());
        }
    }
    Ok(())
}
