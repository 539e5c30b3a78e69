use crate::logger::{format::LoggerFormat, level::LoggerLevel};

/// How the exporter writes its own logs.
///
/// Text output is colored only when stdout is a terminal. Dependencies log at WARN at most,
/// whatever `level` says.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: LoggerLevel,
}
