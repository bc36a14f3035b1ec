//! Process model: requests, contexts and tasks.
//!
//! A [`Request`] roots a tree of [`Context`]s kept in a [`ContextStore`]
//! arena. Contexts can be forked into correlated children and joined back.
//! A [`Task`] is one actor's unit of asynchronous work; its lifecycle is
//! driven through a [`ProcessManager`] and observed by [`ContextCallback`]s.

mod callback;
mod manager;
mod persister;
mod service;
mod status;
mod store;

pub use callback::{ContextCallback, ContextEvent, ContextEventKind};
pub use manager::{MemoryProcessManager, ProcessManager};
pub use persister::{MemoryPersister, ProcessPersister, persist_scoped};
pub use service::ProcessManagerService;
pub use status::Status;
pub use store::{Attributes, Context, ContextStore, ForkLink, Request, Task};

/// Well-known task attribute names.
pub mod attributes {
    /// Full name of the actor that created the task.
    pub const CREATOR: &str = "creator";
    /// Id of the owning request.
    pub const REQUEST_ID: &str = "requestId";
    /// External reference id of the owning request.
    pub const REFERENCE_ID: &str = "referenceId";
    /// Scope group the task was created in.
    pub const SCOPE_GROUP: &str = "ctxtScopeGroup";
    /// Scope the task was created in.
    pub const SCOPE: &str = "ctxtScope";
    /// Expected result type.
    pub const RESULT_TYPE: &str = "resultType";
    /// Context entry tagging the task's results.
    pub const RESULT_TAG: &str = "resultTag";
}
