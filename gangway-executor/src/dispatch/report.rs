//! Dispatcher introspection: history, unhandled events and errors.

use gangway_core::event::{Event, EventError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What a dispatcher did with the events it took off the queue.
///
/// Every event taken off the queue ends up either delivered to a handler
/// or in the unhandled list.
#[derive(Debug)]
pub struct DispatchReport {
    capacity: usize,
    /// Newest first.
    history: Mutex<VecDeque<Event>>,
    unhandled: Mutex<Vec<Event>>,
    errors: Mutex<Vec<EventError>>,
    delivered: AtomicUsize,
}

impl DispatchReport {
    /// Create a report keeping at most `capacity` events of history.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            history: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            unhandled: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            delivered: AtomicUsize::new(0),
        }
    }

    /// Record an event delivered to a handler.
    pub fn record_delivered(&self, event: Event) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        if self.capacity == 0 {
            return;
        }
        let mut history = self.history.lock();
        if history.len() >= self.capacity {
            history.pop_back();
        }
        history.push_front(event);
    }

    /// Record an event no handler accepted.
    pub fn record_unhandled(&self, event: Event) {
        self.unhandled.lock().push(event);
    }

    /// Record a handler failure.
    pub fn record_error(&self, error: EventError) {
        self.errors.lock().push(error);
    }

    /// Handled events, newest first.
    pub fn history(&self) -> Vec<Event> {
        self.history.lock().iter().cloned().collect()
    }

    /// Events no handler accepted, oldest first.
    pub fn unhandled(&self) -> Vec<Event> {
        self.unhandled.lock().clone()
    }

    /// Handler failures, oldest first.
    pub fn errors(&self) -> Vec<EventError> {
        self.errors.lock().clone()
    }

    /// Number of events delivered to a handler since the last clear.
    pub fn delivered_count(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Number of unhandled events.
    pub fn unhandled_count(&self) -> usize {
        self.unhandled.lock().len()
    }

    /// Number of handler failures.
    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.history.lock().clear();
        self.unhandled.lock().clear();
        self.errors.lock().clear();
        self.delivered.store(0, Ordering::Relaxed);
    }
}

impl Default for DispatchReport {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gangway_core::types::ActorId;

    #[test]
    fn history_is_bounded_and_newest_first() {
        let report = DispatchReport::new(2);
        let events: Vec<Event> = (0..3).map(|i| Event::fire(ActorId::new(format!("a{i}")))).collect();
        for event in &events {
            report.record_delivered(event.clone());
        }

        let history = report.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id(), events[2].id());
        assert_eq!(history[1].id(), events[1].id());
        assert_eq!(report.delivered_count(), 3);
    }

    #[test]
    fn clear_resets() {
        let report = DispatchReport::default();
        report.record_unhandled(Event::fire(ActorId::new("a")));
        report.record_delivered(Event::fire(ActorId::new("b")));
        report.clear();

        assert_eq!(report.unhandled_count(), 0);
        assert_eq!(report.delivered_count(), 0);
        assert!(report.history().is_empty());
    }
}
