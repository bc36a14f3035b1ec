//! Logging configuration.

use std::env;
use std::str::FromStr;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line output.
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        })
    }
}

/// Configuration of the tracing subscriber.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    log_format: LogFormat,
    /// `EnvFilter` directive string, e.g. "info,gangway_executor=debug".
    log_filter: String,
    include_location: bool,
    include_target: bool,
    include_thread_names: bool,
    include_thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: "info".to_string(),
            include_location: false,
            include_target: true,
            include_thread_names: false,
            include_thread_ids: false,
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl TracingConfig {
    /// Create a new builder.
    pub fn builder() -> TracingConfigBuilder {
        TracingConfigBuilder::default()
    }

    /// Read the configuration from the environment.
    ///
    /// - `GANGWAY_LOG_FORMAT`: "json", "pretty" or "compact"
    /// - `GANGWAY_LOG_LEVEL`, falling back to `RUST_LOG`: filter directives
    /// - `GANGWAY_LOG_LOCATION`: include file and line
    /// - `GANGWAY_LOG_THREAD_NAMES` / `GANGWAY_LOG_THREAD_IDS`: include thread info
    ///
    /// Without `GANGWAY_LOG_FORMAT`, a terminal gets pretty output and
    /// anything else gets JSON.
    pub fn from_env() -> Self {
        let log_format = match env::var("GANGWAY_LOG_FORMAT") {
            Ok(value) => value.parse().unwrap_or_default(),
            Err(_) if std::io::IsTerminal::is_terminal(&std::io::stdout()) => LogFormat::Pretty,
            Err(_) => LogFormat::Json,
        };

        let log_filter = env::var("GANGWAY_LOG_LEVEL")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());

        Self {
            log_format,
            log_filter,
            include_location: env_flag("GANGWAY_LOG_LOCATION"),
            include_target: true,
            include_thread_names: env_flag("GANGWAY_LOG_THREAD_NAMES"),
            include_thread_ids: env_flag("GANGWAY_LOG_THREAD_IDS"),
        }
    }

    /// Output format.
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Filter directives.
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Whether events carry file and line.
    pub fn include_location(&self) -> bool {
        self.include_location
    }

    /// Whether events carry their target.
    pub fn include_target(&self) -> bool {
        self.include_target
    }

    /// Whether events carry the thread name.
    pub fn include_thread_names(&self) -> bool {
        self.include_thread_names
    }

    /// Whether events carry the thread id.
    pub fn include_thread_ids(&self) -> bool {
        self.include_thread_ids
    }
}

/// Builder for [`TracingConfig`].
#[derive(Debug, Clone, Default)]
pub struct TracingConfigBuilder {
    config: TracingConfig,
}

impl TracingConfigBuilder {
    /// Set the output format.
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.log_format = format;
        self
    }

    /// Set the filter directives.
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.log_filter = filter.into();
        self
    }

    /// Include file and line.
    pub fn include_location(mut self, include: bool) -> Self {
        self.config.include_location = include;
        self
    }

    /// Include the event target.
    pub fn include_target(mut self, include: bool) -> Self {
        self.config.include_target = include;
        self
    }

    /// Include thread names.
    pub fn include_thread_names(mut self, include: bool) -> Self {
        self.config.include_thread_names = include;
        self
    }

    /// Include thread ids.
    pub fn include_thread_ids(mut self, include: bool) -> Self {
        self.config.include_thread_ids = include;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TracingConfig {
        self.config
    }
}
