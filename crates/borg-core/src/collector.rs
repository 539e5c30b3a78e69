use std::{sync::Arc, time::Duration};

use borg_exec::CommandRunner;
use borg_model::InfoParser;
use borg_prometheus::BorgMetrics;
use time::OffsetDateTime;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    cache::SharedCache, clock::Clock, error::RepositoryError, projection::project_info,
    scheduler::Scheduler,
};

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Repositories in collection order.
    pub repositories: Vec<String>,
    pub borg_path: String,
    /// Passed to borg as one argument before `info`, never split.
    pub borg_opts: Option<String>,
    /// Budget for a whole cycle, shared by every repository in it.
    pub command_timeout: Duration,
}

impl CollectorConfig {
    /// `[borg_opts] info --last 1 --json <repository>`
    pub fn info_args(&self, repository: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(6);
        if let Some(opts) = &self.borg_opts {
            args.push(opts.clone());
        }
        args.extend(["info", "--last", "1", "--json"].map(String::from));
        args.push(repository.to_string());
        args
    }
}

/// Runs collection cycles and writes their results into the shared metric set.
pub struct Collector {
    config: CollectorConfig,
    cache: SharedCache,
    runner: Arc<dyn CommandRunner>,
    parser: Arc<dyn InfoParser>,
    clock: Arc<dyn Clock>,
}

impl Collector {
    pub fn new(
        config: CollectorConfig,
        cache: SharedCache,
        runner: Arc<dyn CommandRunner>,
        parser: Arc<dyn InfoParser>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            cache,
            runner,
            parser,
            clock,
        }
    }

    #[inline]
    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// One cycle over every configured repository.
    ///
    /// Transient series are cleared first, so repositories that are no longer configured
    /// disappear. A failing repository is recorded and skipped; the returned errors are empty
    /// only if every repository succeeded.
    pub async fn collect(&self) -> Vec<RepositoryError> {
        let Some(mut state) = self.cache.begin_collection().await else {
            info!(target: "borg.core.collect", "metrics collection already in progress, skipping");
            return Vec::new();
        };

        state.metrics.reset_transient();
        let deadline = Instant::now() + self.config.command_timeout;

        let mut errors = Vec::new();
        for repository in &self.config.repositories {
            match self.collect_repository(&state.metrics, repository, deadline).await {
                Ok(()) => state.touch(self.clock.now()),
                Err(e) => errors.push(e),
            }
        }
        errors
    }

    /// [`collect`](Self::collect), logging every failure. Returns the number of failures.
    pub async fn collect_and_log(&self) -> usize {
        let errors = self.collect().await;
        if !errors.is_empty() {
            error!(target: "borg.core.collect", failed = errors.len(), "collection failed with the following error(s):");
            for e in &errors {
                error!(
                    target: "borg.core.collect",
                    repository = %e.repository,
                    category = %e.category,
                    error = %e.cause,
                    stderr = %e.stderr,
                    "repository collection failed"
                );
            }
        }
        errors.len()
    }

    /// Drive collection from `scheduler` until `cancel` fires.
    ///
    /// A cycle that already started runs to completion (or to its deadline) before the loop
    /// notices cancellation.
    pub async fn run_periodic(&self, mut scheduler: Scheduler, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            if scheduler.should_run() {
                info!(target: "borg.core.collect", "refreshing metrics");
                self.collect_and_log().await;
                info!(target: "borg.core.collect", "refreshing metrics done");
                scheduler.update_last_run();
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = scheduler.wait_for_next_run() => {}
            }
        }
        debug!(target: "borg.core.collect", "collection loop stopped");
    }

    async fn collect_repository(
        &self,
        metrics: &BorgMetrics,
        repository: &str,
        deadline: Instant,
    ) -> Result<(), RepositoryError> {
        let start = self.clock.now();
        debug!(target: "borg.core.collect", repository, "collecting metrics");
        metrics.init_collect_errors(repository);

        let args = self.config.info_args(repository);
        let result = self.runner.run(&self.config.borg_path, &args, deadline).await;

        let now = self.clock.now();
        let elapsed = seconds_between(start, now);
        metrics.set_last_collect_duration(repository, elapsed);
        metrics.set_last_collect_timestamp(repository, now.unix_timestamp() as f64);
        debug!(
            target: "borg.core.collect",
            repository,
            elapsed,
            ok = result.is_ok(),
            "borg info finished"
        );

        let outcome = result
            .map_err(|e| RepositoryError::run(repository, e))
            .and_then(|out| {
                self.parser
                    .parse_info(&out.stdout)
                    .map_err(|e| RepositoryError::parse(repository, e, out.stderr))
            });

        match outcome {
            Ok(doc) => {
                project_info(metrics, repository, &doc);
                metrics.set_last_collect_error(repository, false);
                Ok(())
            }
            Err(e) => {
                metrics.set_last_collect_error(repository, true);
                metrics.inc_collect_errors(repository);
                Err(e)
            }
        }
    }
}

fn seconds_between(start: OffsetDateTime, end: OffsetDateTime) -> f64 {
    (end - start).as_seconds_f64().max(0.0)
}
