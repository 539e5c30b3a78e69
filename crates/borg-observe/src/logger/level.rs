use std::{fmt, str::FromStr};

use tracing::Level;

use crate::logger::error::LoggerError;

/// Verbosity threshold for the exporter's own logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerLevel(pub(crate) Level);

impl LoggerLevel {
    pub fn new(level: &str) -> Result<Self, LoggerError> {
        level.parse()
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self(Level::INFO)
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => return Err(LoggerError::InvalidLogLevel(s.to_string())),
        };
        Ok(Self(level))
    }
}

impl fmt::Display for LoggerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // EnvFilter directives are lowercase.
        f.write_str(&self.0.as_str().to_ascii_lowercase())
    }
}
