//! Context lifecycle events and the callbacks that observe them.

use super::status::Status;
use crate::types::{CallbackId, ContextId, RequestId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextEventKind {
    /// Work started.
    Started,
    /// Work finished successfully.
    Finished,
    /// Work is waiting for an external completion signal.
    PendingCompletion,
    /// Work failed.
    Error {
        /// Failure description.
        message: String,
    },
    /// Work did not complete in time.
    TimedOut,
    /// Work was cancelled.
    Cancelled,
    /// Work was interrupted by a stop of the request.
    Interrupted,
    /// Work is being restarted.
    Restarted,
    /// Free-form report, no status change.
    Reported {
        /// Report topic.
        topic: String,
        /// Report text.
        message: String,
    },
}

impl ContextEventKind {
    /// The status a context moves to on this event, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Started => Some(Status::Started),
            Self::Finished => Some(Status::Finished),
            Self::PendingCompletion => Some(Status::PendingCompletion),
            Self::Error { .. } => Some(Status::Error),
            Self::TimedOut => Some(Status::TimedOut),
            Self::Cancelled => Some(Status::Cancelled),
            Self::Interrupted => Some(Status::Interrupted),
            Self::Restarted => Some(Status::Restarted),
            Self::Reported { .. } => None,
        }
    }

    /// Event topic name.
    pub fn topic(&self) -> &str {
        match self {
            Self::Started => "STARTED",
            Self::Finished => "FINISHED",
            Self::PendingCompletion => "PENDING_COMPLETION",
            Self::Error { .. } => "ERROR",
            Self::TimedOut => "TIMED_OUT",
            Self::Cancelled => "CANCELLED",
            Self::Interrupted => "INTERRUPTED",
            Self::Restarted => "RESTARTED",
            Self::Reported { topic, .. } => topic,
        }
    }
}

impl fmt::Display for ContextEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error { message } => write!(f, "ERROR: {message}"),
            Self::Reported { topic, message } => write!(f, "{topic}: {message}"),
            other => f.write_str(other.topic()),
        }
    }
}

/// A lifecycle event on a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEvent {
    /// The request the context belongs to.
    pub request: RequestId,
    /// The context the event applies to.
    pub context: ContextId,
    /// The task, for task-level events.
    pub task: Option<TaskId>,
    /// What happened.
    pub kind: ContextEventKind,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl ContextEvent {
    /// Create an event timestamped now.
    pub fn new(
        request: RequestId,
        context: ContextId,
        task: Option<TaskId>,
        kind: ContextEventKind,
    ) -> Self {
        Self {
            request,
            context,
            task,
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Observer of context lifecycle events.
///
/// Callbacks are invoked on the notifying thread, which is not necessarily
/// the director's. Implementations must not block.
pub trait ContextCallback: Send + Sync {
    /// Stable identity used to unsubscribe.
    fn id(&self) -> CallbackId;

    /// Handle an event.
    fn on_event(&self, event: &ContextEvent);
}
