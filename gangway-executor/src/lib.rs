//! Gangway Executor - event-driven scheduling of dataflow models.
//!
//! This crate provides the execution infrastructure for gangway:
//! - Actors, models and port connections
//! - Event handlers for self-scheduling and message delivery
//! - Single-thread and worker-pool event dispatchers
//! - The director scheduling loop with actor liveness bookkeeping
//! - Task-based actors with an asynchronous task lifecycle
//! - Logging setup
//!
//! # Example
//!
//! ```no_run
//! use gangway_executor::prelude::*;
//!
//! # async fn run(model: Model) -> gangway_core::Result<()> {
//! let director = Director::new(model, DirectorConfig::default().with_dispatch_threads(4));
//! let summary = director.run().await?;
//! println!("{} events in {} cycles", summary.delivered, summary.cycles);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod actor;
pub mod director;
pub mod dispatch;
pub mod handler;
pub mod liveness;
pub mod model;
pub mod observability;
pub mod task;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::actor::{Actor, ERROR, FireContext, INPUT, OUTPUT};
    pub use crate::director::{Director, DirectorConfig, DirectorHandle, DirectorState, RunSummary};
    pub use crate::dispatch::{
        DispatchReport, EventDispatcher, PoolEventDispatcher, SimpleEventDispatcher,
    };
    pub use crate::handler::{EventHandler, FireEventHandler, HandlerRegistry, SendEventHandler};
    pub use crate::liveness::Liveness;
    pub use crate::model::{Model, ModelBuilder};
    pub use crate::observability::{LogFormat, TracingConfig, init_tracing};
    pub use crate::task::{
        ErrorControlStrategy, PendingListeners, TaskActorConfig, TaskBasedActor, TaskProcessor,
    };
}
