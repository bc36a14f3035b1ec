//! Core types for gangway.
//!
//! - `ActorId` / `PortId`: model topology identifiers
//! - `EventId`, `MessageId`, `CallbackId`: process-wide counters
//! - `RequestId`, `ContextId`, `TaskId`: assigned by the context arena
//! - `TaskHandle`: opaque in-flight work handle tracked by the director

mod ids;

pub use ids::{
    ActorId, CallbackId, ContextId, EventId, MessageId, PortId, RequestId, TaskHandle, TaskId,
};
