//! Herald Logging
//!
//! The buses log through [`tracing`]. This crate installs the process-wide
//! subscriber that turns those events into output, configured from
//! `HERALD_*` environment variables.
//!
//! # Usage
//!
//! ```rust,no_run
//! // Reads HERALD_DEBUG, HERALD_LOG_LEVEL, HERALD_LOG_FORMAT, ...
//! herald_log::init();
//!
//! tracing::info!("buses ready");
//! ```
//!
//! # Environment Variables
//!
//! - `HERALD_DEBUG=1` - Default the level to `debug`
//! - `HERALD_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `HERALD_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `HERALD_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `HERALD_LOG_TARGET=1|0` - Include the event target (module path)
//!
//! `RUST_LOG`, when set, takes precedence over the configured level.

use herald_core::EnvLoader;
use once_cell::sync::OnceCell;
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

// ============================================================================
// Errors
// ============================================================================

/// Logging setup errors
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),

    #[error("Unknown log format: {0}")]
    UnknownFormat(String),

    #[error("Invalid logging configuration: {0}")]
    Config(#[from] herald_core::ConfigError),

    #[error("Failed to install log subscriber: {0}")]
    Init(#[from] TryInitError),
}

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level of events that reach the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// No output at all
    Off,
}

impl Level {
    /// Directive understood by [`EnvFilter`]
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" | "none" => Ok(Level::Off),
            _ => Err(LogError::UnknownLevel(s.to_string())),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_directive().to_uppercase())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line, human oriented
    Pretty,
    /// Single line per event
    Compact,
    /// One JSON object per event
    Json,
}

impl FromStr for Format {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            _ => Err(LogError::UnknownFormat(s.to_string())),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include the event target
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Compact,
            timestamps: true,
            target: true,
        }
    }
}

impl LogConfig {
    /// Read the configuration from `HERALD_*` variables.
    ///
    /// Unset variables keep their defaults; malformed ones are errors.
    pub fn from_env() -> Result<Self, LogError> {
        let env = EnvLoader::herald();
        let debug = env.load_flag("debug", false)?;

        let level = match env.load_var("log_level") {
            Some(value) => value.parse()?,
            None if debug => Level::Debug,
            None => Level::Info,
        };

        let format = match env.load_var("log_format") {
            Some(value) => value.parse()?,
            None => Format::Compact,
        };

        Ok(Self {
            level,
            format,
            timestamps: env.load_flag("log_timestamps", true)?,
            target: env.load_flag("log_target", true)?,
        })
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.target = enabled;
        self
    }

    /// Filter for this configuration; `RUST_LOG` wins when it is set.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_directive()))
    }
}

// ============================================================================
// Subscriber Installation
// ============================================================================

static INSTALLED: OnceCell<LogConfig> = OnceCell::new();

/// Install the global subscriber from the environment.
///
/// Safe to call more than once; only the first call installs anything. A
/// malformed environment falls back to [`LogConfig::default`] and is reported
/// once the subscriber is running.
pub fn init() {
    let (config, env_error) = match LogConfig::from_env() {
        Ok(config) => (config, None),
        Err(e) => (LogConfig::default(), Some(e)),
    };

    // Another subscriber may already be installed by the host application
    if try_init(config).is_ok() {
        if let Some(e) = env_error {
            tracing::warn!("Ignoring logging environment: {}", e);
        }
    }
}

/// Install the global subscriber with an explicit configuration.
///
/// Fails if this process already has a global subscriber.
pub fn try_init(config: LogConfig) -> Result<(), LogError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(fmt_layer(&config))
        .with(config.env_filter())
        .try_init()?;

    let _ = INSTALLED.set(config);
    Ok(())
}

/// Configuration of the installed subscriber, if [`init`] or [`try_init`] ran.
pub fn installed_config() -> Option<&'static LogConfig> {
    INSTALLED.get()
}

fn fmt_layer<S>(config: &LogConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_fmt::layer()
        .with_target(config.target)
        .with_writer(std::io::stderr);

    match (config.format, config.timestamps) {
        (Format::Json, true) => layer.json().boxed(),
        (Format::Json, false) => layer.json().without_time().boxed(),
        (Format::Pretty, true) => layer.pretty().boxed(),
        (Format::Pretty, false) => layer.pretty().without_time().boxed(),
        (Format::Compact, true) => layer.compact().boxed(),
        (Format::Compact, false) => layer.compact().without_time().boxed(),
    }
}

// ============================================================================
// Tests
// ============================================================================
