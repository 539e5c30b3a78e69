//! Subprocess adapter for the borg CLI.
//!
//! [`CommandRunner`] is the seam the collector depends on; [`ProcessRunner`] is the real
//! implementation on top of `tokio::process`.

mod error;
pub use error::{RunError, RunResult};

pub mod proc;
pub use proc::{CommandOutput, CommandRunner, ProcessRunner};

mod util;
pub use util::KILL_GRACE;
