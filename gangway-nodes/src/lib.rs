//! Standard actors for gangway flows.
//!
//! ## Fork/Join (`forkjoin::*`)
//! - [`forkjoin::Splitter`] - Forks a context per delimited value part
//! - [`forkjoin::Joiner`] - Merges a completed sequence back into its parent
//!
//! ## Flow (`flow::*`)
//! - [`flow::Forwarder`] - Passes a caused copy of each message on
//! - [`flow::DelayedForwarder`] - Forwards after a delay, keeping the run alive meanwhile
//! - [`flow::RequestSource`] - Starts requests and emits their root contexts

#![warn(missing_docs)]

pub mod flow;
pub mod forkjoin;

pub use flow::{DelayedForwarder, Forwarder, RequestSource};
pub use forkjoin::{Joiner, NO_SPLIT, Splitter, SplitterConfig};

/// Prelude for commonly used types.
pub mod prelude {
    pub use crate::flow::{DelayedForwarder, Forwarder, RequestSource};
    pub use crate::forkjoin::{Joiner, NO_SPLIT, Splitter, SplitterConfig};
}
