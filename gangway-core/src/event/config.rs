//! Event queue configuration.

use serde::{Deserialize, Serialize};

/// Configuration for an [`EventQueue`](super::EventQueue) and the
/// dispatcher history kept alongside it.
///
/// # Example
///
/// ```
/// use gangway_core::event::QueueConfig;
///
/// let config = QueueConfig::default();
/// assert_eq!(config.max_queue_size, None);
/// assert_eq!(config.history_capacity, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of queued events before backpressure applies.
    /// `None` means unbounded.
    #[serde(default)]
    pub max_queue_size: Option<usize>,

    /// Number of handled events retained in the dispatcher history.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: None,
            history_capacity: default_history_capacity(),
        }
    }
}

impl QueueConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the queue.
    pub fn max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = Some(size);
        self
    }

    /// Set how many events the history keeps.
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }
}

fn default_history_capacity() -> usize {
    1000
}
