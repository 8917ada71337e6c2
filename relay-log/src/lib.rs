//! Logging setup for approval-relay.
//!
//! Every crate in the workspace logs through `tracing`. This crate owns the
//! process-wide subscriber and the environment variables that shape it.
//!
//! # Usage
//!
//! ```rust
//! relay_log::init();
//! tracing::info!(port = 8000, "relay started");
//! ```
//!
//! # Environment Variables
//!
//! - `RELAY_DEBUG=1` - Enable debug logging
//! - `RELAY_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `RELAY_LOG_FORMAT=pretty|json|compact` - Set output format (default `json`)
//! - `RELAY_LOG_COLOR=1|0` - Enable/disable colors
//!
//! `RUST_LOG`, when set, takes precedence over `RELAY_LOG_LEVEL` so that
//! per-module directives (`relay_events=debug,info`) keep working.

use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level emitted by the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl Level {
    /// Directive understood by [`EnvFilter`].
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
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" | "none" => Ok(Level::Off),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_directive())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Single-line output
    Compact,
    /// One JSON object per line
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether ANSI colors are enabled (ignored for JSON)
    pub color: bool,
    /// Whether to include the module path of each record
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
            module_path: true,
        }
    }
}

impl LogConfig {
    /// Read configuration from `RELAY_*` environment variables.
    pub fn from_env() -> Self {
        let debug = env_flag("RELAY_DEBUG").unwrap_or(false);

        let level = env::var("RELAY_LOG_LEVEL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("RELAY_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Format::Json);

        let color = env_flag("RELAY_LOG_COLOR")
            .unwrap_or_else(|| env::var("NO_COLOR").is_err() && env::var("TERM").is_ok());

        let module_path = env_flag("RELAY_LOG_MODULE").unwrap_or(true);

        Self {
            debug,
            level,
            format,
            color,
            module_path,
        }
    }

    /// Build the filter: `RUST_LOG` wins, otherwise the configured level.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_directive()))
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

// ============================================================================
// Public API
// ============================================================================

/// Get the configuration read from the environment.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

/// Install the global subscriber using the environment configuration.
///
/// Safe to call more than once; later calls are no-ops once a global
/// subscriber exists (including one installed by a test harness).
pub fn init() {
    let _ = try_init_with(config());
}

/// Install the global subscriber for `config`.
///
/// Fails if a global subscriber has already been set.
pub fn try_init_with(config: &LogConfig) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(config.filter());

    match config.format {
        #[cfg(feature = "json")]
        Format::Json => registry
            .with(fmt::layer().json().with_target(config.module_path))
            .try_init(),
        #[cfg(not(feature = "json"))]
        Format::Json => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(false)
                    .with_target(config.module_path),
            )
            .try_init(),
        Format::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_ansi(config.color)
                    .with_target(config.module_path),
            )
            .try_init(),
        Format::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(config.color)
                    .with_target(config.module_path),
            )
            .try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("debug".parse::<Level>(), Ok(Level::Debug));
        assert_eq!("DEBUG".parse::<Level>(), Ok(Level::Debug));
        assert_eq!("warning".parse::<Level>(), Ok(Level::Warn));
        assert!("invalid".parse::<Level>().is_err());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("pretty".parse::<Format>(), Ok(Format::Pretty));
        assert_eq!("compact".parse::<Format>(), Ok(Format::Compact));
        assert_eq!("json".parse::<Format>(), Ok(Format::Json));
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.format, Format::Json);
        assert!(!config.debug);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LogConfig {
            format: Format::Compact,
            ..LogConfig::default()
        };
        let _ = try_init_with(&config);
        assert!(try_init_with(&config).is_err());
        init();
    }
}
