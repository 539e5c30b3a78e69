//! borg-exporter: Prometheus metrics for borg backup repositories.
//!
//! ```text
//! borg-exporter --borg-repositories ssh://backup-host/backups/a,/srv/borg/b
//! ```
//!
//! Startup order:
//! 1. configuration and logger
//! 2. `borg --version` and metric registration
//! 3. listener bind, then one initial collection cycle
//! 4. periodic collection loop and HTTP server until SIGINT/SIGTERM

mod config;
mod error;
mod http;

use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use borg_core::{Collector, Scheduler, SharedCache, SystemClock, borg_version, hostname};
use borg_exec::{CommandRunner, ProcessRunner};
use borg_model::JsonInfoParser;
use borg_observe::logger_init;
use borg_prometheus::{BorgMetrics, Registry};
use clap::{Parser, error::ErrorKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    config::{Cli, Config},
    error::StartupError,
    http::MetricsApi,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: "borg.exporter", error = %format!("{e:#}"), "exporter failed");
            eprintln!("borg-exporter: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = Config::try_from(cli)?;
    logger_init(&cfg.logger).map_err(StartupError::from)?;
    info!(
        target: "borg.exporter",
        version = env!("CARGO_PKG_VERSION"),
        repositories = cfg.collector.repositories.len(),
        "starting borg exporter"
    );

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let version = borg_version(
        runner.as_ref(),
        &cfg.collector.borg_path,
        cfg.collector.command_timeout,
    )
    .await;

    let metrics = BorgMetrics::new(hostname(), &version).context("building metric families")?;
    let registry = Registry::new();
    metrics
        .register(&registry)
        .context("registering metric families")?;

    let clock = Arc::new(SystemClock);
    let collector = Arc::new(Collector::new(
        cfg.collector.clone(),
        SharedCache::new(metrics),
        runner,
        Arc::new(JsonInfoParser),
        clock.clone(),
    ));

    let listener = http::bind(&cfg.listen_address).await?;

    info!(target: "borg.exporter", "starting initial metrics collection");
    collector.collect_and_log().await;
    info!(target: "borg.exporter", "initial metrics collection done");

    let cancel = CancellationToken::new();

    let scheduler = Scheduler::new(cfg.refresh_interval, cfg.check_interval, clock);
    info!(
        target: "borg.exporter",
        refresh_interval = ?cfg.refresh_interval,
        check_interval = ?cfg.check_interval,
        "starting metrics collection loop"
    );
    let loop_handle = {
        let collector = collector.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { collector.run_periodic(scheduler, cancel).await })
    };

    let app = MetricsApi::new(registry, cfg.metrics_path.clone()).router();
    info!(
        target: "borg.exporter",
        address = %cfg.listen_address,
        local = ?listener.local_addr().ok(),
        metrics_path = %cfg.metrics_path,
        "serving metrics"
    );
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await;

    cancel.cancel();
    if let Err(e) = loop_handle.await {
        warn!(target: "borg.exporter", error = %e, "collection loop ended abnormally");
    }
    served.context("http server failed")?;

    info!(target: "borg.exporter", "borg exporter stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM, or when `cancel` fires for another reason.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(target: "borg.exporter", error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(target: "borg.exporter", error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(target: "borg.exporter", "received SIGINT, shutting down"),
        _ = terminate => info!(target: "borg.exporter", "received SIGTERM, shutting down"),
        _ = cancel.cancelled() => {}
    }
    cancel.cancel();
}
