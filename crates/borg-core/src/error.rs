use std::fmt;

use borg_exec::RunError;
use borg_model::ParseError;
use thiserror::Error;

/// Why collection failed for a repository. Only used for diagnostics; every category counts
/// as one failed collection in the metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// borg could not be started, or its pipes failed.
    Launch,
    /// The cycle deadline expired before borg finished.
    Timeout,
    /// borg exited non-zero or was killed by a signal.
    Exit,
    /// borg succeeded but its output was not a valid info document.
    Parse,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Launch => "launch",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Exit => "exit",
            ErrorCategory::Parse => "parse",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CollectCause {
    #[error("borg command error: {0}")]
    Run(#[from] RunError),
    #[error("borg output parsing error: {0}")]
    Parse(#[from] ParseError),
}

/// Failure to collect one repository. The cycle continues with the next one.
#[derive(Debug, Error)]
#[error("repository {repository}: {cause}")]
pub struct RepositoryError {
    pub repository: String,
    pub category: ErrorCategory,
    #[source]
    pub cause: CollectCause,
    /// borg's stderr, verbatim. Empty when nothing was captured.
    pub stderr: String,
}

impl RepositoryError {
    pub fn run(repository: impl Into<String>, err: RunError) -> Self {
        let category = match &err {
            RunError::Launch { .. } | RunError::Io(_) => ErrorCategory::Launch,
            RunError::Timeout { .. } => ErrorCategory::Timeout,
            RunError::NonZeroExit { .. } | RunError::KilledBySignal { .. } => ErrorCategory::Exit,
        };
        Self {
            repository: repository.into(),
            category,
            stderr: err.stderr().to_string(),
            cause: err.into(),
        }
    }

    pub fn parse(repository: impl Into<String>, err: ParseError, stderr: String) -> Self {
        Self {
            repository: repository.into(),
            category: ErrorCategory::Parse,
            cause: err.into(),
            stderr,
        }
    }
}
