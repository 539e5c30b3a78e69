use thiserror::Error;
use tracing_subscriber::{filter::ParseError, util::TryInitError};

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?} (expected text, json or journald)")]
    InvalidFormat(String),

    #[error("unknown log level {0:?} (expected trace, debug, info, warn or error)")]
    InvalidLogLevel(String),

    #[error("journald logging needs Linux and the `journald` feature")]
    JournaldNotSupported,

    #[error("cannot connect to journald: {0}")]
    Journald(#[source] std::io::Error),

    #[error("invalid log filter {directive:?}: {source}")]
    Filter {
        directive: String,
        #[source]
        source: ParseError,
    },

    #[error("a global log subscriber is already installed")]
    AlreadyInitialized,

    #[error("failed to install log subscriber: {0}")]
    Install(#[source] TryInitError),
}
