//! # Version records
//!
//! A [`VersionRecord`] is one removable artifact of a package: the date it is
//! attributed to, its version label, and its `subdir/filename` path. Dates come
//! from the `YYMMDD` stamp nightly builds embed in their version string
//! (`0.13.0a200104`), falling back on the upload timestamp.

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

/// A letter, an optional digit, then `YYMMDD`.
static VERSION_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-z][0-9]?([0-9]{2})([0-9]{2})([0-9]{2})").unwrap()
});

/// One artifact of a package as reported by the search service.
///
/// Field order matters: the derived ordering sorts by date, then version,
/// then path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionRecord {
    /// Calendar date attributed to the build.
    pub effective_date: NaiveDate,
    /// Version label exactly as the search service reported it.
    pub version: String,
    /// `subdir/filename`, unique within one package.
    pub relative_path: String,
}

impl VersionRecord {
    pub fn new(version: &str, timestamp_ms: i64, subdir: &str, file_name: &str) -> Self {
        VersionRecord {
            effective_date: effective_date(version, timestamp_ms),
            version: version.to_string(),
            relative_path: format!("{subdir}/{file_name}"),
        }
    }
}

/// Extract the date embedded in a version string like `0.13.0a200104`.
///
/// The first match wins and the two-digit year is read as `2000 + YY`.
/// Returns `None` when there is no stamp, or when the stamp is not a real
/// calendar date.
pub fn version_to_date(version: &str) -> Option<NaiveDate> {
    let caps = VERSION_DATE.captures(version)?;
    let field = |i: usize| caps[i].parse::<u32>().ok();

    let year = 2000 + field(1)? as i32;
    let month = field(2)?;
    let day = field(3)?;

    let date = NaiveDate::from_ymd_opt(year, month, day);
    if date.is_none() {
        tracing::warn!(version, year, month, day, "version stamp is not a calendar date");
    }
    date
}

/// The date for a build: the version stamp if present, else the UTC date of
/// `timestamp_ms` (milliseconds since the epoch).
pub fn effective_date(version: &str, timestamp_ms: i64) -> NaiveDate {
    version_to_date(version).unwrap_or_else(|| {
        DateTime::from_timestamp_millis(timestamp_ms)
            .unwrap_or_default()
            .date_naive()
    })
}
