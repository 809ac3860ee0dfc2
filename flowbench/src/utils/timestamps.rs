//! Timestamp helpers.

use chrono::{DateTime, Utc};

/// A UTC wall-clock instant.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Converts a timestamp to fractional seconds since the Unix epoch.
#[must_use]
pub fn unix_seconds(ts: Timestamp) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

/// Seconds elapsed between two timestamps, never negative.
#[must_use]
pub fn seconds_between(start: Timestamp, end: Timestamp) -> f64 {
    let micros = (end - start).num_microseconds().unwrap_or(i64::MAX);
    (micros.max(0) as f64) / 1_000_000.0
}
