//! Lifecycle status of requests, contexts and tasks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing status of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Created, nothing started yet.
    #[default]
    Created,
    /// Work in progress.
    Started,
    /// Suspended by the process manager.
    Paused,
    /// Being restarted after a stop or failure.
    Restarted,
    /// Waiting for an external completion signal.
    PendingCompletion,
    /// Completed successfully.
    Finished,
    /// Completed with an error.
    Error,
    /// Did not complete in time.
    TimedOut,
    /// Cancelled.
    Cancelled,
    /// Interrupted by a stop of the request.
    Interrupted,
}

impl Status {
    /// Whether the work completed successfully.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Whether no further transitions are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Error | Self::TimedOut | Self::Cancelled | Self::Interrupted
        )
    }

    /// Upper-case name as written in task attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Started => "STARTED",
            Self::Paused => "PAUSED",
            Self::Restarted => "RESTARTED",
            Self::PendingCompletion => "PENDING_COMPLETION",
            Self::Finished => "FINISHED",
            Self::Error => "ERROR",
            Self::TimedOut => "TIMED_OUT",
            Self::Cancelled => "CANCELLED",
            Self::Interrupted => "INTERRUPTED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_vs_terminal() {
        assert!(Status::Finished.is_finished());
        assert!(Status::Finished.is_terminal());
        assert!(!Status::Error.is_finished());
        assert!(Status::Error.is_terminal());
        assert!(!Status::Restarted.is_terminal());
        assert!(!Status::PendingCompletion.is_terminal());
    }

    #[test]
    fn serde_names() {
        let json = serde_json::to_string(&Status::TimedOut).unwrap();
        assert_eq!(json, "\"TIMED_OUT\"");
        assert_eq!(Status::TimedOut.to_string(), "TIMED_OUT");
    }
}
