//! The event-driven director.
//!
//! A [`Director`] runs a [`Model`] by repeatedly dispatching events from its
//! queue. Each call to [`Director::fire`] is one scheduling cycle; the run
//! continues while [`Director::postfire`] returns `true`, i.e. while events
//! were found or actors still have work in flight.
//!
//! ```text
//! initialize -> (fire -> postfire)* -> wrapup
//! ```
//!
//! Actors, handlers and task callbacks talk to the director through a
//! [`DirectorHandle`].

mod config;
mod handle;

pub use config::DirectorConfig;
pub use handle::DirectorHandle;

use crate::dispatch::{EventDispatcher, PoolEventDispatcher, SimpleEventDispatcher};
use crate::handler::{FireEventHandler, HandlerRegistry, SendEventHandler};
use crate::model::Model;
use gangway_core::error::{GangwayError, Result};
use gangway_core::event::{Event, EventError, EventQueue};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::Instrument;

/// Lifecycle state of a director.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectorState {
    /// Created, never initialized.
    Uninitialized,
    /// Initialized, no cycle run yet.
    Initialized,
    /// Running cycles.
    Running,
    /// Wrapped up. May be initialized again.
    WrappedUp,
}

impl fmt::Display for DirectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::WrappedUp => "wrapped up",
        };
        f.write_str(s)
    }
}

/// Outcome of [`Director::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of scheduling cycles.
    pub cycles: u64,
    /// Events handed to a handler.
    pub delivered: usize,
    /// Events no handler accepted, including those left at shutdown.
    pub unhandled: usize,
    /// Handler failures.
    pub errors: usize,
}

/// Event-driven scheduler for a model.
pub struct Director {
    handle: DirectorHandle,
    config: DirectorConfig,
    state: Mutex<DirectorState>,
    dispatcher: RwLock<Option<Arc<dyn EventDispatcher>>>,
    /// Serializes scheduling cycles.
    cycle_lock: tokio::sync::Mutex<()>,
    cycles: AtomicU64,
    not_done: AtomicBool,
}

impl Director {
    /// Create a director for `model`.
    pub fn new(model: impl Into<Arc<Model>>, config: DirectorConfig) -> Self {
        let model = model.into();
        let queue = Arc::new(EventQueue::new(config.queue.clone()));
        let name = model.name().to_string();
        let handle = DirectorHandle::new(name, model, queue);
        Self {
            handle,
            config,
            state: Mutex::new(DirectorState::Uninitialized),
            dispatcher: RwLock::new(None),
            cycle_lock: tokio::sync::Mutex::new(()),
            cycles: AtomicU64::new(0),
            not_done: AtomicBool::new(true),
        }
    }

    /// Create a director with default configuration.
    pub fn with_defaults(model: impl Into<Arc<Model>>) -> Self {
        Self::new(model, DirectorConfig::default())
    }

    /// Director name (the model name).
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Handle for actors and callbacks.
    pub fn handle(&self) -> &DirectorHandle {
        &self.handle
    }

    /// Configuration.
    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DirectorState {
        *self.state.lock()
    }

    /// Number of cycles run since the last initialize.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }

    /// The active dispatcher.
    pub fn dispatcher(&self) -> Option<Arc<dyn EventDispatcher>> {
        self.dispatcher.read().clone()
    }

    fn invalid_state(&self, operation: &'static str, state: DirectorState) -> GangwayError {
        GangwayError::InvalidState {
            director: self.name().to_string(),
            operation,
            state: state.to_string(),
        }
    }

    fn build_dispatcher(&self) -> Arc<dyn EventDispatcher> {
        let handlers = HandlerRegistry::new()
            .with(SendEventHandler::new(self.handle.clone()))
            .with(FireEventHandler::new(self.handle.clone()));
        let queue = Arc::clone(self.handle.queue());
        if self.config.uses_pool() {
            Arc::new(PoolEventDispatcher::new(
                self.name(),
                queue,
                handlers,
                self.config.dispatch_threads,
            ))
        } else {
            Arc::new(SimpleEventDispatcher::new(self.name(), queue, handlers))
        }
    }

    /// Prepare a run: reset liveness, create and open the dispatcher and
    /// initialize every actor.
    ///
    /// # Errors
    ///
    /// `InvalidState` while a run is in progress; any actor initialize error.
    pub fn initialize(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            match *state {
                DirectorState::Uninitialized | DirectorState::WrappedUp => {}
                other => return Err(self.invalid_state("initialize", other)),
            }
            *state = DirectorState::Initialized;
        }

        self.handle.reset();
        self.cycles.store(0, Ordering::Release);
        self.not_done.store(true, Ordering::Release);

        let dispatcher = self.build_dispatcher();
        *self.dispatcher.write() = Some(Arc::clone(&dispatcher));
        if let Err(e) = dispatcher.initialize() {
            self.abort_initialize(&dispatcher, &e);
            return Err(e);
        }

        tracing::info!(
            director = %self.name(),
            dispatcher = if self.config.uses_pool() { "pool" } else { "simple" },
            threads = self.config.dispatch_threads,
            actors = self.handle.model().len(),
            "Director initialized"
        );

        for actor in self.handle.model().actors() {
            if let Err(e) = actor.initialize(&self.handle) {
                tracing::error!(director = %self.name(), actor = %actor.id(), error = %e, "Actor initialize failed");
                self.abort_initialize(&dispatcher, &e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Undo a partial initialize so the director can be initialized again.
    ///
    /// Events seeded by the actors initialized so far are recorded as
    /// unhandled; every actor is wrapped up.
    fn abort_initialize(&self, dispatcher: &Arc<dyn EventDispatcher>, error: &GangwayError) {
        tracing::warn!(director = %self.name(), error = %error, "Initialize aborted");
        for event in self.handle.queue().close() {
            dispatcher.report().record_unhandled(event);
        }
        for actor in self.handle.model().actors() {
            if let Err(e) = actor.wrapup() {
                tracing::warn!(actor = %actor.id(), error = %e, "Actor wrapup failed");
            }
        }
        *self.state.lock() = DirectorState::WrappedUp;
    }

    /// Run one scheduling cycle.
    ///
    /// Dispatches for up to the configured timeout. Returns whether the run
    /// should continue: events were found, or some actor has work in flight.
    /// Cycles never overlap.
    ///
    /// # Errors
    ///
    /// `Dispatch` when dispatching failed, `InvalidState` when not initialized.
    pub async fn fire(&self) -> Result<bool> {
        let _cycle = self.cycle_lock.lock().await;
        {
            let mut state = self.state.lock();
            match *state {
                DirectorState::Initialized | DirectorState::Running => {
                    *state = DirectorState::Running;
                }
                other => return Err(self.invalid_state("fire", other)),
            }
        }
        let dispatcher = self
            .dispatcher()
            .ok_or_else(|| self.invalid_state("fire", DirectorState::Uninitialized))?;

        let cycle = self.cycles.fetch_add(1, Ordering::AcqRel) + 1;
        let found = dispatcher
            .dispatch(self.config.dispatch_timeout_ms)
            .instrument(crate::cycle_span!(self.name(), cycle))
            .await?;

        let not_done = found || self.handle.liveness().has_busy_tasks();
        self.not_done.store(not_done, Ordering::Release);
        tracing::trace!(director = %self.name(), cycle, found, not_done, "Cycle done");
        Ok(not_done)
    }

    /// Whether another cycle should run.
    pub fn postfire(&self) -> bool {
        self.not_done.load(Ordering::Acquire) && !self.handle.is_stop_requested()
    }

    /// End the run: wrap up every actor, then shut down the dispatcher.
    ///
    /// Every actor is wrapped up even when one fails; the first failure is
    /// returned. Wrapping up twice is a no-op.
    pub async fn wrapup(&self) -> Result<()> {
        {
            let state = self.state.lock();
            match *state {
                DirectorState::Initialized | DirectorState::Running => {}
                DirectorState::WrappedUp => return Ok(()),
                other => return Err(self.invalid_state("wrap up", other)),
            }
        }

        let mut first_error = None;
        for actor in self.handle.model().actors() {
            if let Err(e) = actor.wrapup() {
                tracing::warn!(actor = %actor.id(), error = %e, "Actor wrapup failed");
                first_error.get_or_insert(e);
            }
        }

        if let Some(dispatcher) = self.dispatcher() {
            if let Err(e) = dispatcher.shutdown().await {
                first_error.get_or_insert(e);
            }
        }

        *self.state.lock() = DirectorState::WrappedUp;
        tracing::info!(director = %self.name(), cycles = self.cycles(), "Director wrapped up");
        first_error.map_or(Ok(()), Err)
    }

    /// Run the model to completion.
    ///
    /// Wrap up always runs, also when a cycle fails.
    pub async fn run(&self) -> Result<RunSummary> {
        self.initialize()?;
        loop {
            match self.fire().await {
                Ok(_) if self.postfire() => {}
                Ok(_) => break,
                Err(e) => {
                    tracing::error!(director = %self.name(), error = %e, "Run aborted");
                    if let Err(wrapup) = self.wrapup().await {
                        tracing::warn!(director = %self.name(), error = %wrapup, "Wrapup after failure failed");
                    }
                    return Err(e);
                }
            }
        }
        self.wrapup().await?;
        Ok(self.summary())
    }

    /// Counters of the current or last run.
    pub fn summary(&self) -> RunSummary {
        let report = self.dispatcher().map(|d| Arc::clone(d.report()));
        RunSummary {
            cycles: self.cycles(),
            delivered: report.as_ref().map_or(0, |r| r.delivered_count()),
            unhandled: report.as_ref().map_or(0, |r| r.unhandled_count()),
            errors: report.as_ref().map_or(0, |r| r.error_count()),
        }
    }

    /// Handled events, newest first.
    pub fn event_history(&self) -> Vec<Event> {
        self.dispatcher().map(|d| d.event_history()).unwrap_or_default()
    }

    /// Events no handler accepted.
    pub fn unhandled_events(&self) -> Vec<Event> {
        self.dispatcher().map(|d| d.unhandled_events()).unwrap_or_default()
    }

    /// Handler failures.
    pub fn event_errors(&self) -> Vec<EventError> {
        self.dispatcher().map(|d| d.event_errors()).unwrap_or_default()
    }

    /// Reset the dispatcher introspection record.
    pub fn clear_events(&self) {
        if let Some(dispatcher) = self.dispatcher() {
            dispatcher.clear_events();
        }
    }
}

impl fmt::Debug for Director {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Director")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("config", &self.config)
            .field("cycles", &self.cycles())
            .finish()
    }
}
