use std::process::Stdio;

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::Instant,
};
use tracing::{debug, trace};

use crate::{
    error::{RunError, RunResult},
    util::{cmd_program, kill_graceful},
};

/// Output of a command that exited with status 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    /// Decoded lossily; borg diagnostics are meant for humans.
    pub stderr: String,
}

/// Runs a program to completion under a deadline.
///
/// The deadline is absolute so several invocations can share one budget. A run that hits
/// the deadline can return up to [`KILL_GRACE`] late while the child is being stopped.
///
/// [`KILL_GRACE`]: crate::KILL_GRACE
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], deadline: Instant)
    -> RunResult<CommandOutput>;
}

/// [`CommandRunner`] spawning real child processes.
///
/// stdout and stderr are piped and fully captured; stdin is closed.
/// When the deadline passes the child gets SIGTERM, then SIGKILL after a short grace.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        deadline: Instant,
    ) -> RunResult<CommandOutput> {
        let started = Instant::now();
        if started >= deadline {
            debug!(target: "borg.exec.proc", program, "deadline already expired; not spawning");
            return Err(RunError::Timeout {
                elapsed: std::time::Duration::ZERO,
            });
        }

        trace!(target: "borg.exec.proc", program, ?args, "spawn");

        let mut cmd = cmd_program(program, args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| RunError::Launch {
            program: program.to_string(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let finished = tokio::time::timeout_at(deadline, async {
            tokio::join!(child.wait(), read_all(stdout), read_all(stderr))
        })
        .await;

        let (status, stdout, stderr) = match finished {
            Ok(parts) => parts,
            Err(_) => {
                debug!(target: "borg.exec.proc", program, "deadline exceeded; killing child");
                if let Err(e) = kill_graceful(&mut child).await {
                    debug!(target: "borg.exec.proc", program, error = %e, "failed to kill child");
                }
                return Err(RunError::Timeout {
                    elapsed: started.elapsed(),
                });
            }
        };

        let status = status?;
        let stdout = stdout?;
        let stderr = String::from_utf8_lossy(&stderr?).into_owned();

        match status.code() {
            Some(0) => {
                trace!(target: "borg.exec.proc", program, bytes = stdout.len(), "exit success");
                Ok(CommandOutput { stdout, stderr })
            }
            Some(code) => {
                debug!(target: "borg.exec.proc", program, code, "exit non-zero");
                Err(RunError::NonZeroExit { code, stderr })
            }
            None => Err(RunError::KilledBySignal { stderr }),
        }
    }
}

async fn read_all<R>(pipe: Option<R>) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
