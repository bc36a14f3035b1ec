//! Tracing subscriber installation.

use super::config::{LogFormat, TracingConfig};
use anyhow::{Context, Result};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Handle returned by [`init_tracing`]; hold it for the life of the process.
#[derive(Debug)]
pub struct TracingGuard {
    format: LogFormat,
}

impl TracingGuard {
    /// The format the subscriber was installed with.
    pub fn format(&self) -> LogFormat {
        self.format
    }
}

/// Install a global tracing subscriber.
///
/// Invalid filter directives fall back to `info`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: TracingConfig) -> Result<TracingGuard> {
    let filter = EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    macro_rules! layer {
        ($format:ident) => {
            fmt::layer()
                .$format()
                .with_file(config.include_location())
                .with_line_number(config.include_location())
                .with_target(config.include_target())
                .with_thread_names(config.include_thread_names())
                .with_thread_ids(config.include_thread_ids())
        };
    }

    match config.log_format() {
        LogFormat::Json => registry
            .with(
                layer!(json)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .try_init(),
        LogFormat::Pretty => registry.with(layer!(pretty)).try_init(),
        LogFormat::Compact => registry.with(layer!(compact)).try_init(),
    }
    .context("Failed to initialize tracing subscriber")?;

    Ok(TracingGuard {
        format: config.log_format(),
    })
}
