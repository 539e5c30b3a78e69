//! Typed model of `borg info --json` output.
//!
//! The collector never touches raw JSON: it depends on the [`InfoParser`] capability and
//! receives an [`InfoDocument`] whose timestamps are already decoded into [`BorgTimestamp`].

mod domain;
pub use domain::{
    Archive, ArchiveStats, CacheInfo, CacheStats, Encryption, InfoDocument, RepositoryMeta,
};

mod error;
pub use error::ParseError;

mod parser;
pub use parser::{InfoParser, JsonInfoParser};

mod timestamp;
pub use timestamp::BorgTimestamp;
