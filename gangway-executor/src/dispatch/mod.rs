//! Event dispatchers.
//!
//! A dispatcher takes events off the director's [`EventQueue`] and hands
//! each one to the first registered handler that accepts it. Two
//! implementations share that resolution algorithm:
//!
//! - [`SimpleEventDispatcher`]: handles on the calling task, fully ordered
//! - [`PoolEventDispatcher`]: hands events to a bounded pool of blocking workers

mod pool;
mod report;
mod simple;

pub use pool::PoolEventDispatcher;
pub use report::DispatchReport;
pub use simple::SimpleEventDispatcher;

use crate::handler::HandlerRegistry;
use gangway_core::error::{GangwayError, Result};
use gangway_core::event::{Event, EventError, EventQueue};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for async dispatcher futures.
pub type DispatchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Strategy for turning queued events into actor iterations.
///
/// # Implementation Notes
///
/// - `accept` may be called from any thread
/// - `dispatch` must not fail because the queue is empty
/// - after `shutdown`, `accept` refuses events
pub trait EventDispatcher: Send + Sync {
    /// Dispatcher name, for logs.
    fn name(&self) -> &str;

    /// Open the queue and reset handlers and introspection.
    fn initialize(&self) -> Result<()>;

    /// Stop accepting events and wait for in-flight handling to finish.
    ///
    /// Events still queued are recorded as unhandled.
    fn shutdown(&self) -> DispatchFuture<'_, ()>;

    /// Enqueue an event.
    ///
    /// # Errors
    ///
    /// `EventRefused` when shutting down or when a bounded queue is full.
    fn accept(&self, event: Event) -> Result<()>;

    /// Process at least one event if one arrives within `timeout_ms`.
    ///
    /// Returns whether there is, or may soon be, more work.
    fn dispatch(&self, timeout_ms: u64) -> DispatchFuture<'_, bool>;

    /// Introspection record.
    fn report(&self) -> &Arc<DispatchReport>;

    /// Handled events, newest first.
    fn event_history(&self) -> Vec<Event> {
        self.report().history()
    }

    /// Events no handler accepted.
    fn unhandled_events(&self) -> Vec<Event> {
        self.report().unhandled()
    }

    /// Handler failures.
    fn event_errors(&self) -> Vec<EventError> {
        self.report().errors()
    }

    /// Reset history, unhandled events and errors.
    fn clear_events(&self) {
        self.report().clear();
    }
}

/// State shared by both dispatcher implementations.
pub(crate) struct DispatchCore {
    pub(crate) name: String,
    pub(crate) queue: Arc<EventQueue>,
    pub(crate) handlers: HandlerRegistry,
    pub(crate) report: Arc<DispatchReport>,
    /// Invariant violation raised on a worker, surfaced by the next dispatch.
    fault: Mutex<Option<String>>,
}

impl DispatchCore {
    pub(crate) fn new(name: impl Into<String>, queue: Arc<EventQueue>, handlers: HandlerRegistry) -> Self {
        let report = Arc::new(DispatchReport::new(queue.config().history_capacity));
        Self {
            name: name.into(),
            queue,
            handlers,
            report,
            fault: Mutex::new(None),
        }
    }

    pub(crate) fn initialize(&self) {
        self.report.clear();
        self.fault.lock().take();
        self.handlers.initialize();
        self.queue.open();
        tracing::debug!(dispatcher = %self.name, "Dispatcher initialized");
    }

    pub(crate) fn accept(&self, event: Event) -> Result<()> {
        self.queue.offer(event)
    }

    /// Close the queue; whatever is left is recorded as unhandled.
    pub(crate) fn close(&self) {
        let leftovers = self.queue.close();
        if !leftovers.is_empty() {
            tracing::debug!(
                dispatcher = %self.name,
                count = leftovers.len(),
                "Recording queued events as unhandled at shutdown"
            );
        }
        for event in leftovers {
            self.report.record_unhandled(event);
        }
    }

    /// Resolve and run the handler for one event.
    ///
    /// Handler failures are recorded; only invariant violations are returned.
    pub(crate) fn handle(&self, event: Event) -> Result<()> {
        self.handlers.handle(event, &self.report)
    }

    pub(crate) fn set_fault(&self, error: &GangwayError) {
        let mut fault = self.fault.lock();
        if fault.is_none() {
            *fault = Some(error.to_string());
        }
    }

    pub(crate) fn take_fault(&self) -> Result<()> {
        match self.fault.lock().take() {
            Some(cause) => Err(GangwayError::Dispatch {
                director: self.name.clone(),
                cause,
            }),
            None => Ok(()),
        }
    }
}
