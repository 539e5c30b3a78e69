use crate::timestamp::BorgTimestamp;

/// Root of `borg info --last 1 --json`.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoDocument {
    /// Oldest first; the last element is the most recent archive.
    pub archives: Vec<Archive>,
    pub cache: CacheInfo,
    pub repository: RepositoryMeta,
    pub encryption: Encryption,
}

impl InfoDocument {
    /// Most recent archive, if the repository has any.
    #[inline]
    pub fn latest_archive(&self) -> Option<&Archive> {
        self.archives.last()
    }
}

/// One snapshot within a repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    pub comment: String,
    pub duration_seconds: f64,
    pub start: BorgTimestamp,
    pub end: BorgTimestamp,
    pub hostname: String,
    pub id: String,
    pub name: String,
    pub username: String,
    pub stats: ArchiveStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub compressed_size: i64,
    pub deduplicated_size: i64,
    pub original_size: i64,
    pub nfiles: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheInfo {
    pub path: String,
    pub stats: CacheStats,
}

/// Totals over every chunk in the repository store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_chunks: i64,
    pub total_unique_chunks: i64,
    pub total_size: i64,
    pub total_compressed_size: i64,
    /// `unique_size` in borg output.
    pub deduplicated_size: i64,
    /// `unique_csize` in borg output.
    pub deduplicated_compressed_size: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryMeta {
    pub id: String,
    pub last_modified: BorgTimestamp,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encryption {
    pub mode: String,
}
