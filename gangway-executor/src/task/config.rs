//! Task-based actor configuration.

use super::strategy::ErrorControlStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of a [`TaskBasedActor`](super::TaskBasedActor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskActorConfig {
    /// Task type recorded on created tasks. Defaults to the actor name.
    #[serde(default)]
    pub task_type: Option<String>,

    /// Expected result type, recorded as a task attribute.
    #[serde(default)]
    pub result_type: Option<String>,

    /// Tag recorded as a context entry of created tasks.
    #[serde(default)]
    pub result_tag: Option<String>,

    /// Header names of which at least one must be present for a message to
    /// be processed. Empty means every message is processed.
    #[serde(default)]
    pub condition_tags: Vec<String>,

    /// Failure routing.
    #[serde(default)]
    pub error_strategy: ErrorControlStrategy,

    /// Re-check interval while waiting for pending tasks, in milliseconds.
    #[serde(default = "default_quiesce_poll_ms")]
    pub quiesce_poll_ms: u64,
}

fn default_quiesce_poll_ms() -> u64 {
    1000
}

impl Default for TaskActorConfig {
    fn default() -> Self {
        Self {
            task_type: None,
            result_type: None,
            result_tag: None,
            condition_tags: Vec::new(),
            error_strategy: ErrorControlStrategy::default(),
            quiesce_poll_ms: default_quiesce_poll_ms(),
        }
    }
}

impl TaskActorConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the task type.
    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }

    /// Set the result type.
    pub fn with_result_type(mut self, result_type: impl Into<String>) -> Self {
        self.result_type = Some(result_type.into());
        self
    }

    /// Set the result tag.
    pub fn with_result_tag(mut self, tag: impl Into<String>) -> Self {
        self.result_tag = Some(tag.into());
        self
    }

    /// Set the condition tags from a comma separated list.
    pub fn with_condition_tags(mut self, tags: &str) -> Self {
        self.condition_tags = parse_tags(tags);
        self
    }

    /// Set the error strategy.
    pub fn with_error_strategy(mut self, strategy: ErrorControlStrategy) -> Self {
        self.error_strategy = strategy;
        self
    }

    /// Set the quiesce poll interval.
    pub fn with_quiesce_poll(mut self, poll: Duration) -> Self {
        self.quiesce_poll_ms = u64::try_from(poll.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Quiesce poll interval.
    pub fn quiesce_poll(&self) -> Duration {
        Duration::from_millis(self.quiesce_poll_ms.max(1))
    }
}

fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
