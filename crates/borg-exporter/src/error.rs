use borg_observe::LoggerError;
use thiserror::Error;

/// Fatal conditions before the exporter starts serving. Each one exits the process with 1.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialize logger: {0}")]
    Logger(#[from] LoggerError),
}
