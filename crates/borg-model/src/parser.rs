use serde::Deserialize;

use crate::{
    domain::{
        Archive, ArchiveStats, CacheInfo, CacheStats, Encryption, InfoDocument, RepositoryMeta,
    },
    error::ParseError,
    timestamp::BorgTimestamp,
};

/// Decodes the raw bytes borg writes to stdout.
///
/// The collector only knows this trait, so tests can hand it canned documents.
pub trait InfoParser: Send + Sync {
    fn parse_info(&self, bytes: &[u8]) -> Result<InfoDocument, ParseError>;
}

/// `serde_json` backed parser for borg 1.x output.
///
/// Unknown fields are ignored so newer borg releases keep working.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonInfoParser;

impl InfoParser for JsonInfoParser {
    fn parse_info(&self, bytes: &[u8]) -> Result<InfoDocument, ParseError> {
        let raw: RawInfo = serde_json::from_slice(bytes)?;
        raw.try_into()
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawInfo {
    archives: Vec<RawArchive>,
    #[serde(default)]
    cache: RawCache,
    repository: RawRepository,
    #[serde(default)]
    encryption: RawEncryption,
}

#[derive(Debug, Deserialize)]
struct RawArchive {
    #[serde(default)]
    comment: String,
    #[serde(default)]
    duration: f64,
    start: String,
    end: String,
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    stats: RawArchiveStats,
}

#[derive(Debug, Default, Deserialize)]
struct RawArchiveStats {
    #[serde(default)]
    compressed_size: i64,
    #[serde(default)]
    deduplicated_size: i64,
    #[serde(default)]
    original_size: i64,
    #[serde(default)]
    nfiles: i64,
}

#[derive(Debug, Default, Deserialize)]
struct RawCache {
    #[serde(default)]
    path: String,
    #[serde(default)]
    stats: RawCacheStats,
}

#[derive(Debug, Default, Deserialize)]
struct RawCacheStats {
    #[serde(default)]
    total_chunks: i64,
    #[serde(default)]
    total_unique_chunks: i64,
    #[serde(default)]
    total_size: i64,
    #[serde(default)]
    total_csize: i64,
    #[serde(default)]
    unique_size: i64,
    #[serde(default)]
    unique_csize: i64,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    #[serde(default)]
    id: String,
    last_modified: String,
    #[serde(default)]
    location: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawEncryption {
    #[serde(default)]
    mode: String,
}

// ============================================================================
// Conversion
// ============================================================================

fn timestamp(field: impl Into<String>, value: String) -> Result<BorgTimestamp, ParseError> {
    BorgTimestamp::parse(&value).map_err(|source| ParseError::Timestamp {
        field: field.into(),
        value,
        source,
    })
}

impl TryFrom<RawInfo> for InfoDocument {
    type Error = ParseError;

    fn try_from(raw: RawInfo) -> Result<Self, Self::Error> {
        let archives = raw
            .archives
            .into_iter()
            .enumerate()
            .map(|(idx, a)| a.into_archive(idx))
            .collect::<Result<Vec<_>, _>>()?;

        let repository = RepositoryMeta {
            last_modified: timestamp("repository.last_modified", raw.repository.last_modified)?,
            id: raw.repository.id,
            location: raw.repository.location,
        };

        let s = raw.cache.stats;
        let cache = CacheInfo {
            path: raw.cache.path,
            stats: CacheStats {
                total_chunks: s.total_chunks,
                total_unique_chunks: s.total_unique_chunks,
                total_size: s.total_size,
                total_compressed_size: s.total_csize,
                deduplicated_size: s.unique_size,
                deduplicated_compressed_size: s.unique_csize,
            },
        };

        Ok(InfoDocument {
            archives,
            cache,
            repository,
            encryption: Encryption {
                mode: raw.encryption.mode,
            },
        })
    }
}

impl RawArchive {
    fn into_archive(self, idx: usize) -> Result<Archive, ParseError> {
        Ok(Archive {
            start: timestamp(format!("archives[{idx}].start"), self.start)?,
            end: timestamp(format!("archives[{idx}].end"), self.end)?,
            comment: self.comment,
            duration_seconds: self.duration,
            hostname: self.hostname,
            id: self.id,
            name: self.name,
            username: self.username,
            stats: ArchiveStats {
                compressed_size: self.stats.compressed_size,
                deduplicated_size: self.stats.deduplicated_size,
                original_size: self.stats.original_size,
                nfiles: self.stats.nfiles,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../testdata/borg-info.json");

    fn parse(s: &str) -> Result<InfoDocument, ParseError> {
        JsonInfoParser.parse_info(s.as_bytes())
    }

    #[test]
    fn parses_sample_output() {
        let doc = parse(SAMPLE).unwrap();

        assert_eq!(doc.archives.len(), 1);
        let latest = doc.latest_archive().unwrap();
        assert_eq!(latest.comment, "");
        assert_eq!(latest.duration_seconds, 4540.154685);
        assert_eq!(latest.hostname, "my-hostname");
        assert_eq!(
            latest.id,
            "a0ef59abfd45d22460a586053e7266e24b9989d00d44aae8442d3d8e6fe92cbf"
        );
        assert_eq!(latest.name, "my-hostname-2024-10-28T20:37:03.464475");
        assert_eq!(latest.username, "root");
        assert_eq!(latest.start.unix_seconds(), 1_730_147_824);
        assert_eq!(latest.end.unix_seconds(), 1_730_152_364);
        assert_eq!(
            latest.stats,
            ArchiveStats {
                compressed_size: 687_831_993_433,
                deduplicated_size: 53_654_483_387,
                original_size: 1_341_294_469_810,
                nfiles: 13_079_758,
            }
        );

        assert_eq!(
            doc.cache.stats,
            CacheStats {
                total_chunks: 139_398_821,
                total_unique_chunks: 1_675_085,
                total_size: 7_047_547_605_252,
                total_compressed_size: 4_055_905_565_460,
                deduplicated_size: 454_963_879_225,
                deduplicated_compressed_size: 304_339_691_351,
            }
        );

        assert_eq!(
            doc.repository.id,
            "c58db5835b4fbd34ac8c747897674d46c58db5835b4fbd34ac8c747897674d46"
        );
        assert_eq!(doc.repository.location, "ssh://backup-host/backups/backup-name");
        assert_eq!(
            doc.repository.last_modified.to_rfc3339(),
            "2024-10-28T22:00:45Z"
        );
        assert_eq!(doc.encryption.mode, "none");
    }

    #[test]
    fn empty_archives_is_valid() {
        let doc = parse(
            r#"{"archives": [], "repository": {"id": "r", "last_modified": "2024-01-01T00:00:00.000000", "location": "/srv/borg"}}"#,
        )
        .unwrap();
        assert!(doc.latest_archive().is_none());
        assert_eq!(doc.cache.stats, CacheStats::default());
        assert_eq!(doc.repository.location, "/srv/borg");
    }

    #[test]
    fn latest_archive_is_last_element() {
        let doc = parse(
            r#"{
                "archives": [
                    {"name": "old", "start": "2024-01-01T00:00:00.000000", "end": "2024-01-01T00:10:00.000000"},
                    {"name": "new", "start": "2024-01-02T00:00:00.000000", "end": "2024-01-02T00:10:00.000000"}
                ],
                "repository": {"last_modified": "2024-01-02T00:10:00.000000"}
            }"#,
        )
        .unwrap();
        assert_eq!(doc.latest_archive().unwrap().name, "new");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let doc = parse(
            r#"{
                "archives": [],
                "repository": {"id": "r", "last_modified": "2024-01-01T00:00:00.000000", "location": "l", "version": 2},
                "security_dir": "/root/.config/borg/security/r",
                "future_section": {"nested": [1, 2, 3]}
            }"#,
        )
        .unwrap();
        assert_eq!(doc.repository.id, "r");
    }

    #[test]
    fn bad_timestamp_names_field() {
        let err = parse(
            r#"{
                "archives": [{"start": "2024-01-01T00:00:00.000000", "end": "2024-01-01T00:10:00Z"}],
                "repository": {"last_modified": "2024-01-01T00:00:00.000000"}
            }"#,
        )
        .unwrap_err();
        match err {
            ParseError::Timestamp { field, value, .. } => {
                assert_eq!(field, "archives[0].end");
                assert_eq!(value, "2024-01-01T00:10:00Z");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = parse(r#"{"archives": [], "repository": {"last_modified": "yesterday"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("repository.last_modified"));
    }

    #[test]
    fn oversize_numbers_are_rejected() {
        let err = parse(
            r#"{
                "archives": [{
                    "start": "2024-01-01T00:00:00.000000",
                    "end": "2024-01-01T00:10:00.000000",
                    "stats": {"original_size": 9223372036854775808}
                }],
                "repository": {"last_modified": "2024-01-01T00:00:00.000000"}
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(parse("{"), Err(ParseError::Json(_))));
        assert!(matches!(parse(""), Err(ParseError::Json(_))));
        assert!(matches!(
            JsonInfoParser.parse_info(&[0xff, 0xfe]),
            Err(ParseError::Json(_))
        ));
    }
}
