//! Error types for gangway.
//!
//! Errors carry the identifiers involved (actor, event, task, context) so a
//! failure can be traced back to the scheduling decision that produced it.

use crate::types::{ActorId, ContextId, EventId, RequestId, TaskHandle, TaskId};
use std::fmt;
use thiserror::Error;

/// Why an event was refused at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusalReason {
    /// The dispatcher is shut down or not yet initialized.
    ShuttingDown,
    /// The bounded queue is full.
    QueueFull {
        /// Current queue size.
        current: usize,
        /// Maximum queue size.
        max: usize,
    },
}

impl fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShuttingDown => f.write_str("dispatcher is shutting down"),
            Self::QueueFull { current, max } => {
                write!(f, "queue full ({current}/{max} pending events)")
            }
        }
    }
}

/// The main error type for gangway operations.
#[derive(Error, Debug)]
pub enum GangwayError {
    // =========================================================================
    // Event/Dispatch Errors (E100-E199)
    // =========================================================================
    /// An event was refused by the dispatcher.
    #[error("E101: Event {event_id} refused: {reason}")]
    EventRefused {
        /// The refused event.
        event_id: EventId,
        /// Why it was refused.
        reason: RefusalReason,
    },

    /// A dispatch cycle failed.
    #[error("E102: Error during dispatching of events in {director}: {cause}")]
    Dispatch {
        /// The director running the cycle.
        director: String,
        /// Reason for the failure.
        cause: String,
    },

    /// Operation not allowed in the director's current state.
    #[error("E103: Director {director} cannot {operation} while {state}")]
    InvalidState {
        /// The director.
        director: String,
        /// The attempted operation.
        operation: &'static str,
        /// The current state.
        state: String,
    },

    // =========================================================================
    // Liveness Bookkeeping Errors (E200-E299)
    // =========================================================================
    /// An actor was registered as iterating for a second, different event.
    #[error("E201: Actor {actor} iterating other event {current} instead of given event {given}")]
    ConflictingIteration {
        /// The actor.
        actor: ActorId,
        /// The event currently driving the iteration.
        current: EventId,
        /// The conflicting event.
        given: EventId,
    },

    /// Released an iteration that was not registered for that event.
    #[error("E202: Actor {actor} is not iterating for event {given}")]
    IterationNotRegistered {
        /// The actor.
        actor: ActorId,
        /// The event given on release.
        given: EventId,
        /// The event actually registered, if any.
        current: Option<EventId>,
    },

    /// A task handle is owned by a different actor.
    #[error("E203: Task {task} not found for actor {actor}")]
    TaskOwnerMismatch {
        /// The task handle.
        task: TaskHandle,
        /// The actor claiming the task.
        actor: ActorId,
        /// The registered owner, if any.
        owner: Option<ActorId>,
    },

    // =========================================================================
    // Actor/Model Errors (E300-E399)
    // =========================================================================
    /// Actor not found in the model.
    #[error("E301: Actor '{actor}' not found in model")]
    ActorNotFound {
        /// The missing actor.
        actor: ActorId,
    },

    /// Duplicate actor registration.
    #[error("E302: Actor '{actor}' already registered in model")]
    DuplicateActor {
        /// The duplicated actor.
        actor: ActorId,
    },

    /// Connection references an unknown actor.
    #[error("E303: Invalid connection from {from} to {to}: {cause}")]
    InvalidConnection {
        /// Source port.
        from: String,
        /// Destination port.
        to: String,
        /// Reason.
        cause: String,
    },

    /// Actor iteration failed.
    #[error("E304: Actor {actor} execution failed: {cause}")]
    ActorExecution {
        /// The failing actor.
        actor: ActorId,
        /// Reason for the failure.
        cause: String,
    },

    /// Received message is missing something the actor needs.
    #[error("E305: Actor {actor} received invalid message: {cause}")]
    InvalidMessage {
        /// The receiving actor.
        actor: ActorId,
        /// What is wrong.
        cause: String,
    },

    // =========================================================================
    // Process Model Errors (E400-E499)
    // =========================================================================
    /// Context not found in the arena.
    #[error("E401: Context {context} not found")]
    ContextNotFound {
        /// The missing context.
        context: ContextId,
    },

    /// Task not found in the arena.
    #[error("E402: Task {task} not found")]
    TaskNotFound {
        /// The missing task.
        task: TaskId,
    },

    /// Request not found.
    #[error("E403: Request {request} not found")]
    RequestNotFound {
        /// The missing request.
        request: RequestId,
    },

    /// A message carried no usable request or scope reference.
    #[error("E404: Cannot resolve process context: {cause}")]
    ScopeResolution {
        /// Why resolution failed.
        cause: String,
    },

    /// Persisting a task failed.
    #[error("E405: Failed to persist task {task}: {cause}")]
    Persistence {
        /// The task being persisted.
        task: TaskId,
        /// Reason for the failure.
        cause: String,
    },

    // =========================================================================
    // Task Processing Errors (E500-E599)
    // =========================================================================
    /// Preparing or creating a task failed.
    #[error("E501: Task creation failed for actor {actor}: {cause}")]
    TaskCreation {
        /// The actor creating the task.
        actor: ActorId,
        /// Reason for the failure.
        cause: String,
    },

    /// Actor-specific task processing failed.
    #[error("E502: Task {task} processing failed: {cause}")]
    TaskProcessing {
        /// The failing task.
        task: TaskId,
        /// Reason for the failure.
        cause: String,
    },

    /// Task timed out.
    #[error("E503: Task {task} timed out")]
    TaskTimeout {
        /// The task that timed out.
        task: TaskId,
    },
}

impl GangwayError {
    /// Get the error code (e.g., "E101").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::EventRefused { .. } => "E101",
            Self::Dispatch { .. } => "E102",
            Self::InvalidState { .. } => "E103",
            Self::ConflictingIteration { .. } => "E201",
            Self::IterationNotRegistered { .. } => "E202",
            Self::TaskOwnerMismatch { .. } => "E203",
            Self::ActorNotFound { .. } => "E301",
            Self::DuplicateActor { .. } => "E302",
            Self::InvalidConnection { .. } => "E303",
            Self::ActorExecution { .. } => "E304",
            Self::InvalidMessage { .. } => "E305",
            Self::ContextNotFound { .. } => "E401",
            Self::TaskNotFound { .. } => "E402",
            Self::RequestNotFound { .. } => "E403",
            Self::ScopeResolution { .. } => "E404",
            Self::Persistence { .. } => "E405",
            Self::TaskCreation { .. } => "E501",
            Self::TaskProcessing { .. } => "E502",
            Self::TaskTimeout { .. } => "E503",
        }
    }

    /// Whether this is a bookkeeping invariant violation.
    ///
    /// These are integration errors and are never retried.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::ConflictingIteration { .. }
                | Self::IterationNotRegistered { .. }
                | Self::TaskOwnerMismatch { .. }
        )
    }

    /// Create an actor execution error.
    pub fn actor(actor: &ActorId, cause: impl fmt::Display) -> Self {
        Self::ActorExecution {
            actor: actor.clone(),
            cause: cause.to_string(),
        }
    }
}

/// Error codes attached to task failures routed through an error-control strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The task finished with an error.
    TaskError,
    /// The task timed out.
    TaskTimeout,
    /// Task attributes could not be initialized.
    TaskInitError,
    /// Fatal failure while creating the task.
    ActorExecutionFatal,
    /// Generic actor failure.
    ActorExecutionError,
}

impl ErrorCode {
    /// The textual code written into error message headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskError => "TASK_ERROR",
            Self::TaskTimeout => "TASK_TIMEOUT",
            Self::TaskInitError => "TASK_INIT_ERROR",
            Self::ActorExecutionFatal => "ACTOR_EXECUTION_FATAL",
            Self::ActorExecutionError => "ACTOR_EXECUTION_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for gangway operations.
pub type Result<T> = std::result::Result<T, GangwayError>;
