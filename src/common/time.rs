//! Simple time helpers used by multiple services.

use chrono::Utc;

/// Current timestamp in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current UTC time as an ISO-8601 string without offset, e.g.
/// `2024-05-01T12:30:00.123456`.
pub fn now_iso() -> String {
    Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}
