//! STIX timestamp parsing and formatting.
//!
//! STIX timestamps are RFC 3339 in UTC with a trailing `Z`. On output we always
//! emit millisecond precision, which is what the `X-TAXII-Date-Added-*`
//! headers carry.

use chrono::{DateTime, SecondsFormat, Utc};

/// Parse a STIX/RFC 3339 timestamp into UTC.
pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value.trim()).map(|dt| dt.with_timezone(&Utc))
}

/// Format a timestamp the way STIX expects it on the wire.
#[must_use]
pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
