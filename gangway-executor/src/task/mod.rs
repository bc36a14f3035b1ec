//! Asynchronous task lifecycle.
//!
//! A [`TaskBasedActor`] creates one process task per received message and
//! hands it to its [`TaskProcessor`]. The processor reports completion later
//! through the request's process manager; a per-task callback then emits the
//! result or routes the failure. Until then the task counts as busy work
//! for the director.

mod actor;
mod callback;
mod config;
mod pending;
mod processor;
mod strategy;

pub use actor::TaskBasedActor;
pub use config::TaskActorConfig;
pub use pending::PendingListeners;
pub use processor::TaskProcessor;
pub use strategy::ErrorControlStrategy;
