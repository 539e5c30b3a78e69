use borg_model::InfoDocument;
use borg_prometheus::{ArchiveInfoLabels, BorgMetrics, RepositoryInfoLabels};

/// Write everything an info document says about `repository` into `metrics`.
///
/// Without archives only the repository-wide families are written; the `last_backup` and
/// `last_archive_info` series stay absent for this cycle.
pub fn project_info(metrics: &BorgMetrics, repository: &str, doc: &InfoDocument) {
    if let Some(latest) = doc.latest_archive() {
        let stats = &latest.stats;
        metrics.set_last_backup_duration(repository, latest.duration_seconds);
        metrics.set_last_backup_compressed_size(repository, stats.compressed_size as f64);
        metrics.set_last_backup_deduplicated_size(repository, stats.deduplicated_size as f64);
        metrics.set_last_backup_original_size(repository, stats.original_size as f64);
        metrics.set_last_backup_files(repository, stats.nfiles as f64);
        metrics.set_last_backup_timestamp(repository, latest.start.unix_seconds() as f64);

        let start_time = latest.start.to_rfc3339();
        let end_time = latest.end.to_rfc3339();
        metrics.set_last_archive_info(&ArchiveInfoLabels {
            repository,
            comment: &latest.comment,
            start_time: &start_time,
            end_time: &end_time,
            hostname: &latest.hostname,
            id: &latest.id,
            name: &latest.name,
            username: &latest.username,
        });
    }

    let cache = &doc.cache.stats;
    metrics.set_total_chunks(repository, cache.total_chunks as f64);
    metrics.set_total_unique_chunks(repository, cache.total_unique_chunks as f64);
    metrics.set_total_size(repository, cache.total_size as f64);
    metrics.set_total_compressed_size(repository, cache.total_compressed_size as f64);
    metrics.set_deduplicated_size(repository, cache.deduplicated_size as f64);
    metrics.set_deduplicated_compressed_size(repository, cache.deduplicated_compressed_size as f64);

    let last_modified = doc.repository.last_modified.to_rfc3339();
    metrics.set_repository_info(&RepositoryInfoLabels {
        repository,
        id: &doc.repository.id,
        last_modified: &last_modified,
        location: &doc.repository.location,
    });
}
