//! Parsing of the scheduled start time supplied with new URLs

use crate::RelayError;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Naive layouts accepted in addition to RFC 3339, read as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses a schedule date into a UTC timestamp
///
/// RFC 3339 input keeps its offset and is converted to UTC. Input without an
/// offset (as produced by browser `datetime-local` fields) is taken as UTC.
pub fn parse_scheduled_at(input: &str) -> Result<DateTime<Utc>, RelayError> {
    let input = input.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| RelayError::InvalidDate(input.to_string()))
}
