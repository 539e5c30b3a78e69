use std::{fmt, str::FromStr};

use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

/// Layout borg uses for every timestamp: microsecond precision, no offset.
const BORG_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]");

/// RFC 3339 in UTC with whole seconds, the form used for label values.
const LABEL_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// A borg timestamp, interpreted as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BorgTimestamp(OffsetDateTime);

impl BorgTimestamp {
    /// Parse `YYYY-MM-DDTHH:MM:SS.ffffff`. Anything else (offsets, other precisions) is rejected.
    pub fn parse(s: &str) -> Result<Self, time::error::Parse> {
        let naive = PrimitiveDateTime::parse(s, BORG_FORMAT)?;
        Ok(Self(naive.assume_utc()))
    }

    /// Whole UNIX seconds.
    #[inline]
    pub fn unix_seconds(&self) -> i64 {
        self.0.unix_timestamp()
    }

    /// RFC 3339 UTC string, e.g. `2024-10-28T20:37:04Z`.
    pub fn to_rfc3339(&self) -> String {
        // The label layout has no fallible components for UTC datetimes.
        self.0.format(LABEL_FORMAT).unwrap_or_default()
    }

    #[inline]
    pub fn as_datetime(&self) -> OffsetDateTime {
        self.0
    }
}

impl From<OffsetDateTime> for BorgTimestamp {
    fn from(dt: OffsetDateTime) -> Self {
        Self(dt.to_offset(time::UtcOffset::UTC))
    }
}

impl FromStr for BorgTimestamp {
    type Err = time::error::Parse;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BorgTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_as_utc() {
        let ts = BorgTimestamp::parse("2024-10-28T21:52:44.000000").unwrap();
        assert_eq!(ts.unix_seconds(), 1_730_152_364);
        assert_eq!(ts.to_rfc3339(), "2024-10-28T21:52:44Z");
    }

    #[test]
    fn keeps_microseconds_but_labels_whole_seconds() {
        let ts = BorgTimestamp::parse("2024-10-28T20:37:03.464475").unwrap();
        assert_eq!(ts.as_datetime().microsecond(), 464_475);
        assert_eq!(ts.unix_seconds(), 1_730_147_823);
        assert_eq!(ts.to_string(), "2024-10-28T20:37:03Z");
    }

    #[test]
    fn rejects_other_layouts() {
        for bad in [
            "2024-10-28T21:52:44",
            "2024-10-28T21:52:44.000",
            "2024-10-28T21:52:44.000000Z",
            "2024-10-28T21:52:44.000000+02:00",
            "2024-10-28 21:52:44.000000",
            "",
        ] {
            assert!(BorgTimestamp::parse(bad).is_err(), "{bad} should be rejected");
        }
    }
}
