//! Logging setup for gangway processes.
//!
//! The scheduler logs through `tracing`; this module installs a
//! `tracing-subscriber` pipeline for binaries and tests that want output.
//!
//! Output format is picked with `GANGWAY_LOG_FORMAT`:
//! - `json` - one JSON object per event
//! - `pretty` - multi-line human-readable output
//! - `compact` - single-line output
//!
//! Unset, terminals get `pretty` and everything else `json`.
//!
//! # Example
//!
//! ```no_run
//! use gangway_executor::observability::{LogFormat, TracingConfig, init_tracing};
//!
//! let config = TracingConfig::builder()
//!     .log_format(LogFormat::Json)
//!     .log_filter("info,gangway=debug")
//!     .build();
//! let _guard = init_tracing(config)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig, TracingConfigBuilder};
pub use tracing_setup::{TracingGuard, init_tracing};

/// Target under which routed task failures are recorded.
pub const EXECUTION_TRACE_TARGET: &str = "gangway::trace";

/// Span for one director scheduling cycle.
#[macro_export]
macro_rules! cycle_span {
    ($director:expr, $cycle:expr) => {
        tracing::debug_span!("director_cycle", director = %$director, cycle = $cycle)
    };
}

/// Span for one actor iteration driven by an event.
#[macro_export]
macro_rules! iteration_span {
    ($actor:expr, $event:expr) => {
        tracing::debug_span!("actor_iteration", actor = %$actor, event = %$event)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert_eq!(config.log_filter(), "info");
        assert!(!config.include_location());
    }

    #[test]
    fn builder_overrides() {
        let config = TracingConfig::builder()
            .log_format(LogFormat::Pretty)
            .log_filter("debug")
            .include_thread_names(true)
            .build();

        assert_eq!(config.log_format(), LogFormat::Pretty);
        assert_eq!(config.log_filter(), "debug");
        assert!(config.include_thread_names());
        assert!(!config.include_thread_ids());
    }

    #[test]
    fn from_env_without_variables() {
        let config = TracingConfig::from_env();
        assert!(!config.log_filter().is_empty());
    }
}
