//! Flow actors: sources and forwarders.

mod forwarder;
mod source;

pub use forwarder::{DelayedForwarder, Forwarder};
pub use source::RequestSource;
