//! Prometheus metric families exported for borg repositories.
//!
//! This crate owns the fixed set of families in [`BorgMetrics`] and knows which of them are
//! cleared between collection cycles. It does not run an HTTP server; the exporter binary
//! mounts [`encode_text`] behind its own `/metrics` route.
//!
//! ## Example
//! ```rust
//! use borg_prometheus::{BorgMetrics, Registry, encode_text};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = BorgMetrics::new("backup-host", "borg 1.2.8")?;
//! let registry = Registry::new();
//! metrics.register(&registry)?;
//!
//! metrics.set_last_backup_files("ssh://backup-host/repo", 42.0);
//! let body = encode_text(&registry)?;
//! assert!(String::from_utf8(body)?.contains("borg_last_backup_files"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! Gauges labelled by `repository` (cleared every cycle):
//! - `borg_last_backup_duration_seconds`
//! - `borg_last_backup_{compressed,deduplicated,original}_size_bytes`
//! - `borg_last_backup_files`, `borg_last_backup_timestamp`
//! - `borg_total_chunks`, `borg_total_unique_chunks`
//! - `borg_total_size_bytes`, `borg_total_compressed_size_bytes`
//! - `borg_deduplicated_size_bytes`, `borg_deduplicated_compressed_size_bytes`
//! - `borg_last_archive_info`, `borg_repository_info` (value 1, details in labels)
//! - `borg_last_collect_{duration_seconds,timestamp,error}`
//!
//! Never cleared:
//! - `borg_collect_errors{repository}` - Counter
//! - `borg_system_info{hostname, borg_version}` - set once at construction

mod error;
pub use error::MetricsError;

mod metrics;
pub use metrics::{ArchiveInfoLabels, BorgMetrics, RepositoryInfoLabels};

pub use prometheus::{Encoder, Registry, TextEncoder};

/// Encode everything registered in `registry` in the Prometheus text format.
pub fn encode_text(registry: &Registry) -> Result<Vec<u8>, MetricsError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(buffer)
}

/// Content type matching [`encode_text`] output.
pub fn text_content_type() -> String {
    TextEncoder::new().format_type().to_string()
}
