//! Forwarding actors.

use gangway_core::error::{GangwayError, Result};
use gangway_core::types::ActorId;
use gangway_executor::actor::{Actor, FireContext, OUTPUT};
use std::time::Duration;

/// Forwarder - passes each received message on.
///
/// The sent message is a caused copy of the received one: a fresh id, the
/// same headers, body and sequence metadata.
///
/// # Ports
/// - Input: "input" - Any message
/// - Output: "output" - Caused copy of the message
#[derive(Debug)]
pub struct Forwarder {
    id: ActorId,
}

impl Forwarder {
    /// Create a forwarder.
    pub fn new(id: impl Into<ActorId>) -> Self {
        Self { id: id.into() }
    }
}

impl Actor for Forwarder {
    fn id(&self) -> &ActorId {
        &self.id
    }

    fn fire(&self, ctx: &FireContext<'_>) -> Result<()> {
        if let Some(message) = ctx.token() {
            ctx.send(OUTPUT, message.caused_copy())?;
        }
        Ok(())
    }
}

/// Delayed forwarder - passes each message on after a delay.
///
/// The delay runs on the async runtime, outside the iteration. While it is
/// pending, the received message is registered with the director as a busy
/// task, so the run does not end before the copy is sent.
///
/// # Ports
/// - Input: "input" - Any message
/// - Output: "output" - Caused copy of the message, after the delay
#[derive(Debug)]
pub struct DelayedForwarder {
    id: ActorId,
    delay: Duration,
}

impl DelayedForwarder {
    /// Create a forwarder delaying each message by `delay`.
    pub fn new(id: impl Into<ActorId>, delay: Duration) -> Self {
        Self {
            id: id.into(),
            delay,
        }
    }

    /// The configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Actor for DelayedForwarder {
    fn id(&self) -> &ActorId {
        &self.id
    }

    fn fire(&self, ctx: &FireContext<'_>) -> Result<()> {
        let Some(message) = ctx.token() else {
            return Ok(());
        };
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| GangwayError::actor(&self.id, format_args!("no async runtime: {e}")))?;

        let director = ctx.director.clone();
        let actor = self.id.clone();
        let port = self.id.port(OUTPUT);
        let message = message.clone();
        let delay = self.delay;

        director.notify_actor_started_task(&actor, message.id())?;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = director.send(&port, message.caused_copy()) {
                tracing::error!(actor = %actor, message = %message.id(), error = %e, "Delayed send failed");
            }
            if let Err(e) = director.notify_actor_finished_task(&actor, message.id()) {
                tracing::error!(actor = %actor, message = %message.id(), error = %e, "Failed to release delayed message");
            }
        });
        Ok(())
    }
}
