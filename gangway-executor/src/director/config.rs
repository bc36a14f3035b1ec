//! Director configuration.

use gangway_core::event::QueueConfig;
use serde::{Deserialize, Serialize};
use std::env;

/// Configuration of a [`Director`](super::Director).
///
/// # Example
///
/// ```
/// use gangway_executor::director::DirectorConfig;
///
/// let config = DirectorConfig::default().with_dispatch_threads(4);
/// assert!(config.uses_pool());
/// assert_eq!(config.dispatch_timeout_ms, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorConfig {
    /// Number of dispatch workers. More than one selects the pool dispatcher.
    #[serde(default = "default_dispatch_threads")]
    pub dispatch_threads: usize,

    /// How long one dispatch waits for an event, in milliseconds.
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,

    /// Event queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            dispatch_threads: default_dispatch_threads(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            queue: QueueConfig::default(),
        }
    }
}

fn default_dispatch_threads() -> usize {
    1
}

fn default_dispatch_timeout_ms() -> u64 {
    1000
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

impl DirectorConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden from the environment.
    ///
    /// - `GANGWAY_DISPATCH_THREADS`
    /// - `GANGWAY_DISPATCH_TIMEOUT_MS`
    /// - `GANGWAY_QUEUE_CAPACITY`: bound on queued events
    /// - `GANGWAY_EVENT_HISTORY`: handled events kept for introspection
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(threads) = env_parse("GANGWAY_DISPATCH_THREADS") {
            config.dispatch_threads = threads;
        }
        if let Some(timeout) = env_parse("GANGWAY_DISPATCH_TIMEOUT_MS") {
            config.dispatch_timeout_ms = timeout;
        }
        if let Some(capacity) = env_parse("GANGWAY_QUEUE_CAPACITY") {
            config.queue.max_queue_size = Some(capacity);
        }
        if let Some(history) = env_parse("GANGWAY_EVENT_HISTORY") {
            config.queue.history_capacity = history;
        }
        config
    }

    /// Set the number of dispatch workers.
    pub fn with_dispatch_threads(mut self, threads: usize) -> Self {
        self.dispatch_threads = threads;
        self
    }

    /// Set the dispatch timeout.
    pub fn with_dispatch_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.dispatch_timeout_ms = timeout_ms;
        self
    }

    /// Set the queue configuration.
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    /// Whether the pool dispatcher is used.
    pub fn uses_pool(&self) -> bool {
        self.dispatch_threads > 1
    }
}
