//! Instant parsing and formatting helpers.
//!
//! # Responsibility
//! - Parse the timestamp shapes found in snapshot exports into UTC instants.
//! - Render instants in the single textual form used by the store.
//!
//! # Invariants
//! - Every parsed value is normalized to UTC.
//! - Values without an offset are interpreted as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// UTC instant used for every date-like field.
pub type Timestamp = DateTime<Utc>;

/// `2020-01-01T00:00:00Z`, stamped on imported records as administrative marker.
const ADMINISTRATIVE_MARKER_EPOCH_SECS: i64 = 1_577_836_800;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M",
];

/// Error returned when a value does not match any supported timestamp shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampParseError {
    pub value: String,
}

impl Display for TimestampParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported timestamp `{}`", self.value)
    }
}

impl Error for TimestampParseError {}

/// Returns the uniform instant marking records as historical consolidation.
pub fn administrative_marker() -> Timestamp {
    DateTime::from_timestamp(ADMINISTRATIVE_MARKER_EPOCH_SECS, 0).unwrap_or_default()
}

/// Parses RFC 3339, offset-less ISO date-times and bare dates.
///
/// # Errors
/// - Returns `TimestampParseError` when no supported shape matches.
pub fn parse_timestamp(value: &str) -> Result<Timestamp, TimestampParseError> {
    let trimmed = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(trimmed, format) {
            return Ok(parsed.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed.and_utc());
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(TimestampParseError {
        value: value.to_string(),
    })
}

/// Formats an instant as RFC 3339 UTC (`Z` suffix, sub-seconds only when set).
pub fn format_timestamp(value: Timestamp) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::{administrative_marker, format_timestamp, parse_timestamp};
    use chrono::{TimeZone, Timelike, Utc};

    #[test]
    fn parses_rfc3339_with_offset_into_utc() {
        let parsed = parse_timestamp("2023-08-05T18:09:06+01:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 8, 5, 17, 9, 6).unwrap());
    }

    #[test]
    fn parses_offset_without_colon() {
        let parsed = parse_timestamp("2024-01-10T08:00:00.123456+0100").unwrap();
        assert_eq!(parsed.hour(), 7);
        assert_eq!(parsed.nanosecond(), 123_456_000);
        assert_eq!(
            parse_timestamp("2024-01-10 08:00:00+0100").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 10, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn parses_naive_values_as_utc() {
        let parsed = parse_timestamp("2024-01-09T23:59:59.5").unwrap();
        assert_eq!(parsed.nanosecond(), 500_000_000);
        assert_eq!(parsed.second(), 59);

        let spaced = parse_timestamp("2020-01-01 00:00:00Z").unwrap();
        assert_eq!(spaced, administrative_marker());
    }

    #[test]
    fn parses_bare_date_as_midnight() {
        let parsed = parse_timestamp("2024-01-10").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        let error = parse_timestamp("yesterday").unwrap_err();
        assert_eq!(error.value, "yesterday");
    }

    #[test]
    fn format_is_parseable_and_utc() {
        let marker = administrative_marker();
        assert_eq!(format_timestamp(marker), "2020-01-01T00:00:00Z");
        assert_eq!(parse_timestamp(&format_timestamp(marker)).unwrap(), marker);
    }
}
