use std::{fmt, time::Duration};

use borg_core::CollectorConfig;
use borg_observe::{LoggerConfig, LoggerFormat, LoggerLevel};
use clap::Parser;

use crate::error::StartupError;

/// Command line, with an environment variable behind every option.
#[derive(Debug, Parser)]
#[command(
    name = "borg-exporter",
    version,
    about = "Prometheus exporter for borg backup repositories"
)]
pub struct Cli {
    /// Address to serve metrics on; `:PORT` listens on every interface, IPv6 and IPv4.
    #[arg(long, env = "LISTEN_ADDRESS", default_value = ":9099")]
    pub listen_address: String,

    /// Path under which metrics are exposed.
    #[arg(long, env = "METRICS_PATH", default_value = "/metrics")]
    pub metrics_path: String,

    /// How often repositories are collected.
    #[arg(long, env = "METRICS_REFRESH_INTERVAL", default_value = "4h")]
    pub metrics_refresh_interval: String,

    /// How often the scheduler re-reads the wall clock while waiting.
    #[arg(long, env = "SCHEDULER_CHECK_INTERVAL", default_value = "20s")]
    pub scheduler_check_interval: String,

    /// Time budget for one collection cycle over all repositories.
    #[arg(long, env = "COMMAND_TIMEOUT", default_value = "120s")]
    pub command_timeout: String,

    /// Comma separated list of repositories.
    #[arg(long, env = "BORG_REPOSITORIES")]
    pub borg_repositories: String,

    /// Path to the borg binary.
    #[arg(long, env = "BORG_PATH", default_value = "borg")]
    pub borg_path: String,

    /// Extra argument placed before `info`, passed as a single word.
    #[arg(long, env = "BORG_OPTS", allow_hyphen_values = true)]
    pub borg_opts: Option<String>,

    /// One of trace, debug, info, warn, error.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// One of text, json, journald.
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_address: ListenAddress,
    pub metrics_path: String,
    pub refresh_interval: Duration,
    pub check_interval: Duration,
    pub collector: CollectorConfig,
    pub logger: LoggerConfig,
}

impl TryFrom<Cli> for Config {
    type Error = StartupError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let repositories = split_repositories(&cli.borg_repositories);
        if repositories.is_empty() {
            return Err(StartupError::Config(
                "borg-repositories must name at least one repository".into(),
            ));
        }

        check_metrics_path(&cli.metrics_path)?;

        let level = LoggerLevel::new(&cli.log_level)
            .map_err(|e| StartupError::Config(format!("log-level: {e}")))?;
        let format = cli
            .log_format
            .parse::<LoggerFormat>()
            .map_err(|e| StartupError::Config(format!("log-format: {e}")))?;

        Ok(Self {
            listen_address: listen_address(&cli.listen_address)?,
            metrics_path: cli.metrics_path,
            refresh_interval: positive_duration(
                "metrics-refresh-interval",
                &cli.metrics_refresh_interval,
            )?,
            check_interval: positive_duration(
                "scheduler-check-interval",
                &cli.scheduler_check_interval,
            )?,
            collector: CollectorConfig {
                repositories,
                borg_path: cli.borg_path,
                borg_opts: cli.borg_opts.filter(|o| !o.is_empty()),
                command_timeout: positive_duration("command-timeout", &cli.command_timeout)?,
            },
            logger: LoggerConfig { format, level },
        })
    }
}

fn split_repositories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
        .collect()
}

/// Where the HTTP server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddress {
    /// `:PORT`: every interface of every address family the host supports.
    AllInterfaces(u16),
    /// `host:port`, resolved at bind time.
    Exact(String),
}

impl ListenAddress {
    /// Addresses to try, in order, until one binds.
    ///
    /// `[::]` is dual-stack on hosts that allow it; IPv4-only hosts fall back to `0.0.0.0`.
    pub fn candidates(&self) -> Vec<String> {
        match self {
            Self::AllInterfaces(port) => vec![format!("[::]:{port}"), format!("0.0.0.0:{port}")],
            Self::Exact(address) => vec![address.clone()],
        }
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllInterfaces(port) => write!(f, ":{port}"),
            Self::Exact(address) => f.write_str(address),
        }
    }
}

fn listen_address(raw: &str) -> Result<ListenAddress, StartupError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(StartupError::Config("listen-address is empty".into()));
    }
    match raw.strip_prefix(':') {
        Some(port) => port.parse().map(ListenAddress::AllInterfaces).map_err(|_| {
            StartupError::Config(format!("listen-address {raw:?} has an invalid port"))
        }),
        None => Ok(ListenAddress::Exact(raw.to_string())),
    }
}

/// The metrics route must be a literal path the router can mount next to `/health`.
fn check_metrics_path(path: &str) -> Result<(), StartupError> {
    let invalid = |why: &str| Err(StartupError::Config(format!("metrics-path {path:?} {why}")));

    if !path.starts_with('/') {
        return invalid("must start with '/'");
    }
    if path == "/health" {
        return invalid("is reserved for the liveness endpoint");
    }
    if path.contains(['{', '}']) {
        return invalid("must not contain '{' or '}'");
    }
    if path.split('/').any(|seg| seg.starts_with([':', '*'])) {
        return invalid("must not have segments starting with ':' or '*'");
    }
    Ok(())
}

fn positive_duration(option: &str, raw: &str) -> Result<Duration, StartupError> {
    match parse_duration(raw) {
        Ok(d) if d.is_zero() => Err(StartupError::Config(format!("{option} must be positive"))),
        Ok(d) => Ok(d),
        Err(e) => Err(StartupError::Config(format!("{option}: {e}"))),
    }
}

/// Parse a duration such as "4h", "1h30m", "1.5s" or "500ms".
///
/// Accepted units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `0` is zero;
/// any other number needs a unit. Signs are not accepted.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let s = raw.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err("empty duration".into());
    }

    let mut rest = s;
    let mut nanos = 0f64;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (num, tail) = rest.split_at(num_len);
        if num.is_empty() || num == "." {
            return Err(format!("invalid duration {raw:?}"));
        }
        let value: f64 = num
            .parse()
            .map_err(|_| format!("invalid number {num:?} in duration {raw:?}"))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in duration {raw:?}")),
            other => return Err(format!("unknown unit {other:?} in duration {raw:?}")),
        };

        nanos += value * scale;
        rest = tail;
    }

    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(format!("duration {raw:?} is out of range"));
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}
