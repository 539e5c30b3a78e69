mod config;
mod error;
mod format;
mod level;
mod log;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use format::LoggerFormat;
pub use level::LoggerLevel;

/// Install the process-wide subscriber. Can succeed only once per process.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    log::install(cfg)?;
    tracing::debug!(
        target: "borg.observe",
        format = %cfg.format,
        level = %cfg.level,
        "logger initialized"
    );
    Ok(())
}
