use std::io::IsTerminal;

use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::{Level, Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, time::OffsetTime},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::{SubscriberInitExt, TryInitError},
};

use crate::logger::{
    config::LoggerConfig, error::LoggerError, format::LoggerFormat, level::LoggerLevel,
};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = mk_filter(cfg.level)?;
    let output = match cfg.format {
        LoggerFormat::Text => fmt::layer()
            .with_ansi(std::io::stdout().is_terminal())
            .with_timer(mk_timer())
            .boxed(),
        LoggerFormat::Json => fmt::layer()
            .json()
            .with_ansi(false)
            .with_timer(mk_timer())
            .boxed(),
        LoggerFormat::Journald => journald_layer()?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .map_err(classify)
}

/// `<deps>,borg=<level>`: the configured level applies to `borg*` targets, everything else
/// is capped at WARN.
fn directive(level: LoggerLevel) -> String {
    let deps = level.0.min(Level::WARN);
    format!("{},borg={level}", deps.as_str().to_ascii_lowercase())
}

fn mk_filter(level: LoggerLevel) -> Result<EnvFilter, LoggerError> {
    let directive = directive(level);
    match EnvFilter::try_new(&directive) {
        Ok(filter) => Ok(filter),
        Err(source) => Err(LoggerError::Filter { directive, source }),
    }
}

fn mk_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn classify(e: TryInitError) -> LoggerError {
    let taken = std::error::Error::source(&e).is_some_and(|s| s.is::<SetGlobalDefaultError>());
    if taken {
        LoggerError::AlreadyInitialized
    } else {
        LoggerError::Install(e)
    }
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald_layer<S>() -> Result<BoxedLayer<S>, LoggerError>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_journald::layer().map_err(LoggerError::Journald)?;
    Ok(layer
        .with_syslog_identifier("borg-exporter".to_string())
        .boxed())
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald_layer<S>() -> Result<BoxedLayer<S>, LoggerError>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    Err(LoggerError::JournaldNotSupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_are_capped_at_warn() {
        let cases = [
            ("trace", "warn,borg=trace"),
            ("debug", "warn,borg=debug"),
            ("info", "warn,borg=info"),
            ("warn", "warn,borg=warn"),
            ("error", "error,borg=error"),
        ];
        for (level, expected) in cases {
            let level = LoggerLevel::new(level).unwrap();
            assert_eq!(directive(level), expected);
            assert!(mk_filter(level).is_ok());
        }
    }

    #[test]
    fn second_install_reports_already_initialized() {
        let cfg = LoggerConfig::default();
        let first = install(&cfg);
        let second = install(&cfg);
        assert!(first.is_ok() || matches!(first, Err(LoggerError::AlreadyInitialized)));
        assert!(matches!(second, Err(LoggerError::AlreadyInitialized)));
    }
}
