//! Timestamp utilities
//!
//! Stored timestamps are RFC 3339 UTC with microsecond precision, so a
//! lexical comparison in SQL orders them in time.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format for TEXT columns
pub fn to_rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 timestamp as stored in TEXT columns
pub fn parse_rfc3339(value: &str) -> crate::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| crate::Error::Internal(format!("Invalid timestamp '{}': {}", value, e)))
}
