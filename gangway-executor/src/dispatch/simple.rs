//! Single-thread dispatcher.

use super::{DispatchCore, DispatchFuture, DispatchReport, EventDispatcher};
use crate::handler::HandlerRegistry;
use gangway_core::error::{GangwayError, Result};
use gangway_core::event::{Event, EventQueue};
use std::sync::Arc;
use std::time::Duration;

/// Dispatcher that runs handlers on the task calling [`dispatch`](EventDispatcher::dispatch).
///
/// Iterations never overlap. An iteration that blocks stalls the scheduler.
pub struct SimpleEventDispatcher {
    core: DispatchCore,
}

impl SimpleEventDispatcher {
    /// Create a dispatcher over `queue` with the given handlers.
    pub fn new(name: impl Into<String>, queue: Arc<EventQueue>, handlers: HandlerRegistry) -> Self {
        Self {
            core: DispatchCore::new(name, queue, handlers),
        }
    }
}

impl EventDispatcher for SimpleEventDispatcher {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn initialize(&self) -> Result<()> {
        self.core.initialize();
        Ok(())
    }

    fn shutdown(&self) -> DispatchFuture<'_, ()> {
        Box::pin(async move {
            self.core.close();
            tracing::debug!(dispatcher = %self.core.name, "Dispatcher shut down");
            Ok(())
        })
    }

    fn accept(&self, event: Event) -> Result<()> {
        self.core.accept(event)
    }

    fn dispatch(&self, timeout_ms: u64) -> DispatchFuture<'_, bool> {
        Box::pin(async move {
            let Some(event) = self.core.queue.poll(Duration::from_millis(timeout_ms)).await else {
                return Ok(!self.core.queue.is_empty());
            };
            self.core
                .handle(event)
                .map_err(|e| GangwayError::Dispatch {
                    director: self.core.name.clone(),
                    cause: e.to_string(),
                })?;
            Ok(true)
        })
    }

    fn report(&self) -> &Arc<DispatchReport> {
        &self.core.report
    }
}
