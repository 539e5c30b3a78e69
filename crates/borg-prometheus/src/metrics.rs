use prometheus::{CounterVec, GaugeVec, Opts, Registry, core::Collector};

use crate::error::MetricsError;

const REPOSITORY: &[&str] = &["repository"];

/// Label values of `borg_last_archive_info`.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveInfoLabels<'a> {
    pub repository: &'a str,
    pub comment: &'a str,
    pub start_time: &'a str,
    pub end_time: &'a str,
    pub hostname: &'a str,
    pub id: &'a str,
    pub name: &'a str,
    pub username: &'a str,
}

/// Label values of `borg_repository_info`.
#[derive(Debug, Clone, Copy)]
pub struct RepositoryInfoLabels<'a> {
    pub repository: &'a str,
    pub id: &'a str,
    pub last_modified: &'a str,
    pub location: &'a str,
}

/// The complete, fixed family set of the exporter.
///
/// Cloning is cheap and every clone writes to the same series, so one copy can live behind
/// the collector's lock while another is registered for scraping.
#[derive(Clone)]
pub struct BorgMetrics {
    // last archive
    last_backup_duration: GaugeVec,
    last_backup_compressed_size: GaugeVec,
    last_backup_deduplicated_size: GaugeVec,
    last_backup_original_size: GaugeVec,
    last_backup_files: GaugeVec,
    last_backup_timestamp: GaugeVec,

    // repository totals
    total_chunks: GaugeVec,
    total_unique_chunks: GaugeVec,
    total_size: GaugeVec,
    total_compressed_size: GaugeVec,
    deduplicated_size: GaugeVec,
    deduplicated_compressed_size: GaugeVec,

    // collection bookkeeping
    last_collect_duration: GaugeVec,
    last_collect_timestamp: GaugeVec,
    last_collect_error: GaugeVec,
    collect_errors: CounterVec,

    // info
    last_archive_info: GaugeVec,
    repository_info: GaugeVec,
    system_info: GaugeVec,
}

fn repo_gauge(name: &str, help: &str) -> Result<GaugeVec, MetricsError> {
    Ok(GaugeVec::new(Opts::new(name, help), REPOSITORY)?)
}

impl BorgMetrics {
    /// Build every family and set `borg_system_info` once.
    pub fn new(hostname: &str, borg_version: &str) -> Result<Self, MetricsError> {
        let metrics = Self {
            last_backup_duration: repo_gauge(
                "borg_last_backup_duration_seconds",
                "Duration of the last backup in seconds",
            )?,
            last_backup_compressed_size: repo_gauge(
                "borg_last_backup_compressed_size_bytes",
                "Compressed size of the last backup in bytes",
            )?,
            last_backup_deduplicated_size: repo_gauge(
                "borg_last_backup_deduplicated_size_bytes",
                "Deduplicated size of the last backup in bytes",
            )?,
            last_backup_original_size: repo_gauge(
                "borg_last_backup_original_size_bytes",
                "Original size of the last backup in bytes",
            )?,
            last_backup_files: repo_gauge(
                "borg_last_backup_files",
                "Number of files in the last backup",
            )?,
            last_backup_timestamp: repo_gauge(
                "borg_last_backup_timestamp",
                "Start time of the last backup as UNIX seconds",
            )?,

            total_chunks: repo_gauge("borg_total_chunks", "Total number of chunks")?,
            total_unique_chunks: repo_gauge(
                "borg_total_unique_chunks",
                "Total number of unique chunks",
            )?,
            total_size: repo_gauge("borg_total_size_bytes", "Total size of all chunks in bytes")?,
            total_compressed_size: repo_gauge(
                "borg_total_compressed_size_bytes",
                "Total compressed size of all chunks in bytes",
            )?,
            deduplicated_size: repo_gauge(
                "borg_deduplicated_size_bytes",
                "Size of unique chunks in bytes",
            )?,
            deduplicated_compressed_size: repo_gauge(
                "borg_deduplicated_compressed_size_bytes",
                "Compressed size of unique chunks in bytes",
            )?,

            last_collect_duration: repo_gauge(
                "borg_last_collect_duration_seconds",
                "Duration of the last metrics collection",
            )?,
            last_collect_timestamp: repo_gauge(
                "borg_last_collect_timestamp",
                "Timestamp of the last metrics collection",
            )?,
            last_collect_error: repo_gauge(
                "borg_last_collect_error",
                "1 if the last collection failed, 0 if successful",
            )?,
            collect_errors: CounterVec::new(
                Opts::new(
                    "borg_collect_errors",
                    "Number of errors encountered by borg exporter",
                ),
                REPOSITORY,
            )?,

            last_archive_info: GaugeVec::new(
                Opts::new(
                    "borg_last_archive_info",
                    "Information about the last backup archive",
                ),
                &[
                    "repository",
                    "comment",
                    "start_time",
                    "end_time",
                    "hostname",
                    "id",
                    "name",
                    "username",
                ],
            )?,
            repository_info: GaugeVec::new(
                Opts::new(
                    "borg_repository_info",
                    "Information about the backup repository",
                ),
                &["repository", "id", "last_modified", "location"],
            )?,
            system_info: GaugeVec::new(
                Opts::new(
                    "borg_system_info",
                    "Information about the borg backup system",
                ),
                &["hostname", "borg_version"],
            )?,
        };

        metrics
            .system_info
            .with_label_values(&[hostname, borg_version])
            .set(1.0);

        Ok(metrics)
    }

    /// Register every family with `registry`.
    ///
    /// Families already present in this registry are skipped, so repeated calls succeed.
    pub fn register(&self, registry: &Registry) -> Result<(), MetricsError> {
        for collector in self.collectors() {
            match registry.register(collector) {
                Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Clear every labelled series of the per-cycle families.
    ///
    /// `borg_collect_errors` and `borg_system_info` are left alone.
    pub fn reset_transient(&self) {
        for family in self.transient() {
            family.reset();
        }
    }

    fn transient(&self) -> [&GaugeVec; 17] {
        [
            &self.last_backup_duration,
            &self.last_backup_compressed_size,
            &self.last_backup_deduplicated_size,
            &self.last_backup_original_size,
            &self.last_backup_files,
            &self.last_backup_timestamp,
            &self.total_chunks,
            &self.total_unique_chunks,
            &self.total_size,
            &self.total_compressed_size,
            &self.deduplicated_size,
            &self.deduplicated_compressed_size,
            &self.last_collect_duration,
            &self.last_collect_timestamp,
            &self.last_collect_error,
            &self.last_archive_info,
            &self.repository_info,
        ]
    }

    fn collectors(&self) -> Vec<Box<dyn Collector>> {
        let mut all: Vec<Box<dyn Collector>> = self
            .transient()
            .into_iter()
            .map(|g| Box::new(g.clone()) as Box<dyn Collector>)
            .collect();
        all.push(Box::new(self.collect_errors.clone()));
        all.push(Box::new(self.system_info.clone()));
        all
    }

    // ------------------------------------------------------------------------
    // last archive
    // ------------------------------------------------------------------------

    pub fn set_last_backup_duration(&self, repository: &str, seconds: f64) {
        self.last_backup_duration.with_label_values(&[repository]).set(seconds);
    }

    pub fn set_last_backup_compressed_size(&self, repository: &str, bytes: f64) {
        self.last_backup_compressed_size.with_label_values(&[repository]).set(bytes);
    }

    pub fn set_last_backup_deduplicated_size(&self, repository: &str, bytes: f64) {
        self.last_backup_deduplicated_size.with_label_values(&[repository]).set(bytes);
    }

    pub fn set_last_backup_original_size(&self, repository: &str, bytes: f64) {
        self.last_backup_original_size.with_label_values(&[repository]).set(bytes);
    }

    pub fn set_last_backup_files(&self, repository: &str, files: f64) {
        self.last_backup_files.with_label_values(&[repository]).set(files);
    }

    pub fn set_last_backup_timestamp(&self, repository: &str, unix_seconds: f64) {
        self.last_backup_timestamp.with_label_values(&[repository]).set(unix_seconds);
    }

    // ------------------------------------------------------------------------
    // repository totals
    // ------------------------------------------------------------------------

    pub fn set_total_chunks(&self, repository: &str, chunks: f64) {
        self.total_chunks.with_label_values(&[repository]).set(chunks);
    }

    pub fn set_total_unique_chunks(&self, repository: &str, chunks: f64) {
        self.total_unique_chunks.with_label_values(&[repository]).set(chunks);
    }

    pub fn set_total_size(&self, repository: &str, bytes: f64) {
        self.total_size.with_label_values(&[repository]).set(bytes);
    }

    pub fn set_total_compressed_size(&self, repository: &str, bytes: f64) {
        self.total_compressed_size.with_label_values(&[repository]).set(bytes);
    }

    pub fn set_deduplicated_size(&self, repository: &str, bytes: f64) {
        self.deduplicated_size.with_label_values(&[repository]).set(bytes);
    }

    pub fn set_deduplicated_compressed_size(&self, repository: &str, bytes: f64) {
        self.deduplicated_compressed_size.with_label_values(&[repository]).set(bytes);
    }

    // ------------------------------------------------------------------------
    // collection bookkeeping
    // ------------------------------------------------------------------------

    pub fn set_last_collect_duration(&self, repository: &str, seconds: f64) {
        self.last_collect_duration.with_label_values(&[repository]).set(seconds);
    }

    pub fn set_last_collect_timestamp(&self, repository: &str, unix_seconds: f64) {
        self.last_collect_timestamp.with_label_values(&[repository]).set(unix_seconds);
    }

    pub fn set_last_collect_error(&self, repository: &str, failed: bool) {
        let value = if failed { 1.0 } else { 0.0 };
        self.last_collect_error.with_label_values(&[repository]).set(value);
    }

    /// Make the error counter for `repository` visible at 0 without incrementing it.
    pub fn init_collect_errors(&self, repository: &str) {
        let _ = self.collect_errors.with_label_values(&[repository]);
    }

    pub fn inc_collect_errors(&self, repository: &str) {
        self.collect_errors.with_label_values(&[repository]).inc();
    }

    // ------------------------------------------------------------------------
    // info
    // ------------------------------------------------------------------------

    pub fn set_last_archive_info(&self, labels: &ArchiveInfoLabels<'_>) {
        self.last_archive_info
            .with_label_values(&[
                labels.repository,
                labels.comment,
                labels.start_time,
                labels.end_time,
                labels.hostname,
                labels.id,
                labels.name,
                labels.username,
            ])
            .set(1.0);
    }

    pub fn set_repository_info(&self, labels: &RepositoryInfoLabels<'_>) {
        self.repository_info
            .with_label_values(&[
                labels.repository,
                labels.id,
                labels.last_modified,
                labels.location,
            ])
            .set(1.0);
    }
}
