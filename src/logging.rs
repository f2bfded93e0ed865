//! Tracing subscriber setup for hosts embedding busnav.
//!
//! The engine only emits `tracing` events. Hosts that have no subscriber of
//! their own call [`init`] once at startup. `RUST_LOG` takes precedence over
//! the level passed in. Output goes to stderr so it never mixes with JSON
//! responses on stdout.

use std::fmt;
use std::io;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use crate::error::BusnavError;

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// The matching `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = BusnavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(BusnavError::InvalidArguments {
                message: format!("unknown log level '{}'", other),
            }),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_tracing_level())
    }
}

/// Log line format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Install a text subscriber at `level`.
///
/// Does nothing if a global subscriber is already installed.
pub fn init(level: LogLevel) {
    if try_init(level, LogFormat::Text).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Install a subscriber, reporting failure instead of ignoring it.
pub fn try_init(level: LogLevel, format: LogFormat) -> Result<(), BusnavError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| BusnavError::InternalError {
        message: format!("failed to install tracing subscriber: {}", e),
    })
}
