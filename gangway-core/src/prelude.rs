//! Prelude for convenient imports.
//!
//! ```
//! use gangway_core::prelude::*;
//! ```

// Core types
pub use crate::types::{
    ActorId, CallbackId, ContextId, EventId, MessageId, PortId, RequestId, TaskHandle, TaskId,
};

// Error handling
pub use crate::error::{ErrorCode, GangwayError, RefusalReason, Result};

// Events
pub use crate::event::{Event, EventError, EventQueue, FireEvent, QueueConfig, SendEvent};

// Messages
pub use crate::message::{Message, MessageBody, SequenceInfo, headers};

// Process model
pub use crate::process::{
    Attributes, Context, ContextCallback, ContextEvent, ContextEventKind, ContextStore, ForkLink,
    MemoryPersister, MemoryProcessManager, ProcessManager, ProcessManagerService,
    ProcessPersister, Request, Status, Task, persist_scoped,
};
