//! Utility functions for identifier generation and timestamp handling.

mod ids;
pub mod timestamps;

pub use ids::{generate_event_id, generate_run_id, sentinel_id};
pub use timestamps::{now_utc, unix_seconds, Timestamp};
