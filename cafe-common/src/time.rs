//! Timestamp utilities
//!
//! Timestamps are stored as RFC 3339 UTC text with exactly three fractional
//! digits and a `Z` suffix, so string comparison in SQL matches time order.

use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Corrupt timestamp '{}': {}", s, e)))
}

/// Parse a `YYYY-MM-DD` calendar day
pub fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("Fecha inválida (se espera AAAA-MM-DD): {}", s)))
}

/// Today's calendar day in UTC
pub fn today() -> NaiveDate {
    now().date_naive()
}

/// Inclusive storage-format bounds of a UTC day: 00:00:00.000 to 23:59:59.999
pub fn day_bounds(day: NaiveDate) -> (String, String) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (format_timestamp(start), format_timestamp(end))
}

/// The `days` calendar days ending with `last`, oldest first
pub fn trailing_days(last: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days as i64)
        .rev()
        .map(|back| last - Duration::days(back))
        .collect()
}
