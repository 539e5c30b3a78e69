use std::time::Duration;

use thiserror::Error;

pub type RunResult<T> = Result<T, RunError>;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("deadline exceeded after {elapsed:?}")]
    Timeout { elapsed: Duration },
    #[error("non-zero exit code: {code}")]
    NonZeroExit { code: i32, stderr: String },
    #[error("killed by signal")]
    KilledBySignal { stderr: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    /// Stderr captured before the failure, empty when none was collected.
    pub fn stderr(&self) -> &str {
        match self {
            RunError::NonZeroExit { stderr, .. } | RunError::KilledBySignal { stderr } => stderr,
            _ => "",
        }
    }
}
