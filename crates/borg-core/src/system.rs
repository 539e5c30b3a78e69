use std::{sync::OnceLock, time::Duration};

use borg_exec::CommandRunner;
use tokio::time::Instant;
use tracing::{debug, warn};

static HOSTNAME: OnceLock<String> = OnceLock::new();

/// Host name of the machine running the exporter, `"unknown"` if it cannot be read.
pub fn hostname() -> &'static str {
    HOSTNAME.get_or_init(|| {
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    })
}

/// Ask `<borg_path> --version` for the installed borg release.
///
/// Returns the trimmed stdout, or an empty string if the command fails for any reason.
pub async fn borg_version(
    runner: &dyn CommandRunner,
    borg_path: &str,
    timeout: Duration,
) -> String {
    let args = ["--version".to_string()];
    match runner.run(borg_path, &args, Instant::now() + timeout).await {
        Ok(out) => {
            let version = String::from_utf8_lossy(&out.stdout).trim().to_string();
            debug!(target: "borg.core.collect", %version, "borg version detected");
            version
        }
        Err(e) => {
            warn!(target: "borg.core.collect", borg_path, error = %e, "failed to get borg version");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use borg_exec::{CommandOutput, RunError, RunResult};

    use super::*;

    struct VersionRunner(Option<&'static str>);

    #[async_trait]
    impl CommandRunner for VersionRunner {
        async fn run(
            &self,
            program: &str,
            args: &[String],
            _deadline: Instant,
        ) -> RunResult<CommandOutput> {
            assert_eq!(program, "/usr/bin/borg");
            assert_eq!(args, ["--version"]);
            match self.0 {
                Some(out) => Ok(CommandOutput {
                    stdout: out.as_bytes().to_vec(),
                    stderr: String::new(),
                }),
                None => Err(RunError::NonZeroExit {
                    code: 2,
                    stderr: "usage".into(),
                }),
            }
        }
    }

    #[test]
    fn hostname_is_stable_and_non_empty() {
        assert!(!hostname().is_empty());
        assert_eq!(hostname(), hostname());
    }

    #[tokio::test]
    async fn version_is_trimmed_stdout() {
        let runner = VersionRunner(Some("borg 1.2.8\n"));
        let v = borg_version(&runner, "/usr/bin/borg", Duration::from_secs(5)).await;
        assert_eq!(v, "borg 1.2.8");
    }

    #[tokio::test]
    async fn failed_version_command_yields_empty_version() {
        let runner = VersionRunner(None);
        let v = borg_version(&runner, "/usr/bin/borg", Duration::from_secs(5)).await;
        assert_eq!(v, "");
    }
}
