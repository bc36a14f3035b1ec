//! In-memory FIFO of pending scheduling events.

use super::{Event, QueueConfig};
use crate::error::{GangwayError, RefusalReason, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Thread-safe event queue, bounded or unbounded.
///
/// `offer` may be called from any thread, including blocking worker
/// threads; `poll` waits asynchronously for the next event.
pub struct EventQueue {
    config: QueueConfig,
    queue: Mutex<VecDeque<Event>>,
    /// Wakes a waiting poller on offer, all pollers on close.
    notify: Notify,
    accepting: AtomicBool,
    total_accepted: AtomicUsize,
    total_polled: AtomicUsize,
}

impl EventQueue {
    /// Create a closed queue. Call [`open`](Self::open) before offering.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            accepting: AtomicBool::new(false),
            total_accepted: AtomicUsize::new(0),
            total_polled: AtomicUsize::new(0),
        }
    }

    /// Queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Start accepting events.
    pub fn open(&self) {
        let _queue = self.queue.lock();
        self.accepting.store(true, Ordering::SeqCst);
    }

    /// Stop accepting events and wake every waiting poller.
    ///
    /// Returns the events that were still queued.
    pub fn close(&self) -> Vec<Event> {
        let drained: Vec<Event> = {
            let mut queue = self.queue.lock();
            self.accepting.store(false, Ordering::SeqCst);
            queue.drain(..).collect()
        };
        self.notify.notify_waiters();
        drained
    }

    /// Whether the queue accepts new events.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Enqueue an event.
    ///
    /// # Errors
    ///
    /// `EventRefused` when the queue is closed or full.
    pub fn offer(&self, event: Event) -> Result<()> {
        let event_id = event.id();
        {
            // The flag only changes under this lock, so a concurrent close
            // either sees this event in its leftovers or refuses it.
            let mut queue = self.queue.lock();
            if !self.is_accepting() {
                return Err(GangwayError::EventRefused {
                    event_id,
                    reason: RefusalReason::ShuttingDown,
                });
            }
            if let Some(max) = self.config.max_queue_size {
                if queue.len() >= max {
                    return Err(GangwayError::EventRefused {
                        event_id,
                        reason: RefusalReason::QueueFull {
                            current: queue.len(),
                            max,
                        },
                    });
                }
            }
            queue.push_back(event);
        }

        self.total_accepted.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
        tracing::debug!(event = %event_id, "Enqueued event");
        Ok(())
    }

    /// Pop the next event without waiting.
    pub fn try_poll(&self) -> Option<Event> {
        let event = self.queue.lock().pop_front();
        if event.is_some() {
            self.total_polled.fetch_add(1, Ordering::Relaxed);
        }
        event
    }

    /// Pop the next event, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` on timeout or when the queue is closed while waiting.
    pub async fn poll(&self, timeout: Duration) -> Option<Event> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register interest before checking so an offer in between is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(event) = self.try_poll() {
                return Some(event);
            }
            if !self.is_accepting() {
                return None;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_poll();
            }
        }
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total events accepted since creation.
    pub fn total_accepted(&self) -> usize {
        self.total_accepted.load(Ordering::Relaxed)
    }

    /// Total events handed out since creation.
    pub fn total_polled(&self) -> usize {
        self.total_polled.load(Ordering::Relaxed)
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}
