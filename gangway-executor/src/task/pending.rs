//! Outstanding task listeners of one actor.

use gangway_core::types::CallbackId;
use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;
use std::time::Duration;

#[derive(Default)]
struct State {
    ids: HashSet<CallbackId>,
    interrupted: bool,
}

/// Set of listeners still waiting for their task to end.
///
/// An actor that is asked to finish waits here until every task it started
/// has reported an outcome.
#[derive(Default)]
pub struct PendingListeners {
    state: Mutex<State>,
    drained: Condvar,
}

impl PendingListeners {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener.
    pub fn add(&self, id: CallbackId) {
        self.state.lock().ids.insert(id);
    }

    /// Remove a listener and wake waiters. Returns whether it was present.
    pub fn remove(&self, id: CallbackId) -> bool {
        let removed = self.state.lock().ids.remove(&id);
        if removed {
            self.drained.notify_all();
        }
        removed
    }

    /// Whether a listener is pending.
    pub fn contains(&self, id: CallbackId) -> bool {
        self.state.lock().ids.contains(&id)
    }

    /// Number of pending listeners.
    pub fn len(&self) -> usize {
        self.state.lock().ids.len()
    }

    /// Whether no listener is pending.
    pub fn is_empty(&self) -> bool {
        self.state.lock().ids.is_empty()
    }

    /// Forget all listeners and clear the interrupt flag.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.ids.clear();
        state.interrupted = false;
        self.drained.notify_all();
    }

    /// Release every waiter without draining.
    pub fn interrupt(&self) {
        self.state.lock().interrupted = true;
        self.drained.notify_all();
    }

    /// Block until no listener is pending or the wait is interrupted.
    ///
    /// Wakes at least every `poll` to re-check. Returns `true` when drained.
    pub fn wait_until_drained(&self, poll: Duration) -> bool {
        let mut state = self.state.lock();
        while !state.ids.is_empty() {
            if state.interrupted {
                tracing::debug!(pending = state.ids.len(), "Wait for pending tasks interrupted");
                return false;
            }
            tracing::trace!(pending = state.ids.len(), "Waiting for pending tasks");
            self.drained.wait_for(&mut state, poll);
        }
        true
    }
}

impl std::fmt::Debug for PendingListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingListeners")
            .field("pending", &self.len())
            .finish()
    }
}
