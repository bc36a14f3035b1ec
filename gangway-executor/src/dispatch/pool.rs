//! Worker-pool dispatcher.

use super::{DispatchCore, DispatchFuture, DispatchReport, EventDispatcher};
use crate::handler::HandlerRegistry;
use dashmap::DashMap;
use gangway_core::error::{GangwayError, Result};
use gangway_core::event::{Event, EventQueue};
use gangway_core::types::ActorId;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Dispatcher that hands events to a bounded pool of blocking workers.
///
/// At most `workers` events are handled concurrently. Different actors may
/// iterate in parallel; events for the same actor take turns on a per-actor
/// lane, so the director's double-iteration check only trips on misuse.
pub struct PoolEventDispatcher {
    core: Arc<DispatchCore>,
    workers: usize,
    permits: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    lanes: Arc<DashMap<ActorId, Arc<Mutex<()>>>>,
}

/// Decrements the in-flight counter when a worker finishes, also on panic.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PoolEventDispatcher {
    /// Create a dispatcher with `workers` workers (at least 1).
    pub fn new(
        name: impl Into<String>,
        queue: Arc<EventQueue>,
        handlers: HandlerRegistry,
        workers: usize,
    ) -> Self {
        let workers = workers.max(1);
        Self {
            core: Arc::new(DispatchCore::new(name, queue, handlers)),
            workers,
            permits: Arc::new(Semaphore::new(workers)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            lanes: Arc::new(DashMap::new()),
        }
    }

    /// Number of workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of events currently being handled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn pool_closed(&self) -> GangwayError {
        GangwayError::Dispatch {
            director: self.core.name.clone(),
            cause: "worker pool closed".to_string(),
        }
    }
}

impl EventDispatcher for PoolEventDispatcher {
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
            // Holding every permit means no worker is running.
            let all = u32::try_from(self.workers).unwrap_or(u32::MAX);
            let _drained = self
                .permits
                .acquire_many(all)
                .await
                .map_err(|_| self.pool_closed())?;
            tracing::debug!(dispatcher = %self.core.name, "Dispatcher shut down");
            self.core.take_fault()
        })
    }

    fn accept(&self, event: Event) -> Result<()> {
        self.core.accept(event)
    }

    fn dispatch(&self, timeout_ms: u64) -> DispatchFuture<'_, bool> {
        Box::pin(async move {
            self.core.take_fault()?;

            let Some(event) = self.core.queue.poll(Duration::from_millis(timeout_ms)).await else {
                // In-flight first: a worker that is done has already enqueued its events.
                let busy = self.in_flight() > 0;
                return Ok(busy || !self.core.queue.is_empty());
            };

            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|_| self.pool_closed())?;
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            let guard = InFlightGuard(Arc::clone(&self.in_flight));
            let core = Arc::clone(&self.core);
            let lane = Arc::clone(
                self.lanes
                    .entry(event.target().clone())
                    .or_default()
                    .value(),
            );

            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let _guard = guard;
                let _turn = lane.lock();
                if let Err(e) = core.handle(event) {
                    tracing::error!(dispatcher = %core.name, error = %e, "Invariant violation on worker");
                    core.set_fault(&e);
                }
            });
            Ok(true)
        })
    }

    fn report(&self) -> &Arc<DispatchReport> {
        &self.core.report
    }
}
