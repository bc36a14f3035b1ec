//! Fork/join actors.
//!
//! A [`Splitter`] forks the context of a message into one child context per
//! value part and emits the children as a sequence. A [`Joiner`] waits for a
//! complete sequence and merges the children back into the parent.

mod joiner;
mod splitter;

pub use joiner::Joiner;
pub use splitter::{NO_SPLIT, Splitter, SplitterConfig};
