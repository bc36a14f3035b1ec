//! Gangway Core Library
//!
//! This crate provides the foundational types for the gangway dataflow
//! scheduler: identifiers, the error taxonomy, scheduling events and their
//! queue, messages, and the process model of requests, contexts and tasks.
//!
//! # Key Components
//!
//! - **Event**: `FireEvent`/`SendEvent` and the thread-safe `EventQueue`
//! - **Message**: payload tokens with correlation headers and sequence metadata
//! - **Process**: the `ContextStore` arena, `ProcessManager` and context callbacks
//! - **Types**: strongly-typed identifiers
//!
//! # Example
//!
//! ```
//! use gangway_core::prelude::*;
//!
//! let store = ContextStore::new();
//! let request = store.create_request("order-42", Attributes::new());
//! let children = store.fork_sequence(request.root, 3).unwrap();
//! assert_eq!(children.len(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod message;
pub mod prelude;
pub mod process;
pub mod types;

// Re-export key types at crate root for convenience
pub use error::{ErrorCode, GangwayError, Result};
pub use event::{Event, EventQueue};
pub use message::Message;
pub use types::{ActorId, ContextId, EventId, PortId, RequestId, TaskId};
