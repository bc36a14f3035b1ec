//! Cheaply cloneable access to a running director.

use crate::liveness::Liveness;
use crate::model::Model;
use gangway_core::error::{GangwayError, Result};
use gangway_core::event::{Event, EventQueue};
use gangway_core::message::Message;
use gangway_core::types::{ActorId, EventId, PortId, TaskHandle};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

struct Shared {
    name: String,
    model: Arc<Model>,
    liveness: Liveness,
    queue: Arc<EventQueue>,
    stop_requested: AtomicBool,
}

/// Handle given to actors, handlers and task callbacks.
///
/// Holds what those need from the director (model, event queue and
/// liveness maps) but not the dispatcher, so holding a handle never keeps
/// a dispatcher alive.
#[derive(Clone)]
pub struct DirectorHandle {
    shared: Arc<Shared>,
}

impl DirectorHandle {
    pub(crate) fn new(name: impl Into<String>, model: Arc<Model>, queue: Arc<EventQueue>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                model,
                liveness: Liveness::new(),
                queue,
                stop_requested: AtomicBool::new(false),
            }),
        }
    }

    /// Director name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The model being run.
    pub fn model(&self) -> &Arc<Model> {
        &self.shared.model
    }

    /// Liveness bookkeeping.
    pub fn liveness(&self) -> &Liveness {
        &self.shared.liveness
    }

    /// The event queue.
    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.shared.queue
    }

    /// Enqueue an event.
    ///
    /// # Errors
    ///
    /// `EventRefused` when the director is not running or the queue is full.
    pub fn enqueue_event(&self, event: Event) -> Result<()> {
        self.shared.queue.offer(event)
    }

    /// Schedule an iteration of `actor` as soon as possible.
    pub fn fire_at_current_time(&self, actor: &ActorId) -> Result<()> {
        self.enqueue_event(Event::fire(actor.clone()))
            .map_err(|e| GangwayError::actor(actor, format_args!("error enqueuing fire event: {e}")))
    }

    /// Deliver `message` to every port connected to `from`.
    ///
    /// Returns the number of destinations. A port without connections
    /// drops the message.
    pub fn send(&self, from: &PortId, message: Message) -> Result<usize> {
        let destinations = self.shared.model.destinations(from);
        if destinations.is_empty() {
            tracing::trace!(port = %from, message = %message.id(), "Port not connected, message dropped");
            return Ok(0);
        }
        for to in destinations {
            self.enqueue_event(Event::send(from.clone(), to.clone(), message.clone()))?;
        }
        Ok(destinations.len())
    }

    /// Whether `actor` has asked never to be iterated again.
    pub fn is_actor_inactive(&self, actor: &ActorId) -> bool {
        self.shared.liveness.is_inactive(actor)
    }

    /// Mark `actor` as never to be iterated again.
    pub fn set_actor_inactive(&self, actor: &ActorId) {
        self.shared.liveness.mark_inactive(actor);
    }

    /// Whether `actor` is iterating for some event.
    pub fn is_actor_iterating(&self, actor: &ActorId) -> bool {
        self.shared.liveness.iterating_event(actor).is_some()
    }

    /// Register `actor` as iterating for `event`.
    pub fn notify_actor_iterating_for_event(&self, actor: &ActorId, event: EventId) -> Result<()> {
        self.shared.liveness.register_iterating(actor, event)
    }

    /// Release the iteration registration of `actor` for `event`.
    pub fn notify_actor_done_iterating(&self, actor: &ActorId, event: EventId) -> Result<()> {
        self.shared.liveness.release_iterating(actor, event)
    }

    /// Register in-flight work of `actor`. Keeps the director alive until finished.
    pub fn notify_actor_started_task(&self, actor: &ActorId, task: impl Into<TaskHandle>) -> Result<()> {
        let task = task.into();
        tracing::debug!(actor = %actor, task = %task, "Actor started task");
        self.shared.liveness.start_task(actor, task)
    }

    /// Release in-flight work of `actor`.
    pub fn notify_actor_finished_task(&self, actor: &ActorId, task: impl Into<TaskHandle>) -> Result<()> {
        let task = task.into();
        tracing::debug!(actor = %actor, task = %task, "Actor finished task");
        self.shared.liveness.finish_task(actor, task)
    }

    /// Ask the director to end the run after the current cycle.
    pub fn request_stop(&self) {
        if !self.shared.stop_requested.swap(true, Ordering::AcqRel) {
            tracing::info!(director = %self.shared.name, "Stop requested");
        }
    }

    /// Whether a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.shared.stop_requested.load(Ordering::Acquire)
    }

    pub(crate) fn reset(&self) {
        self.shared.liveness.clear();
        self.shared.stop_requested.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for DirectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorHandle")
            .field("name", &self.shared.name)
            .field("model", &self.shared.model.name())
            .field("queued", &self.shared.queue.len())
            .finish()
    }
}
