//! Identifier generation for events, runs and stop sentinels.

use chrono::Utc;
use uuid::Uuid;

const SENTINEL_PREFIX: &str = "__STOP__";

/// Generates a fresh event identifier (UUID v4, hyphenated).
#[must_use]
pub fn generate_event_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a run identifier: UTC wall time plus a random suffix.
///
/// Format: `YYYYmmdd_HHMMSS_xxxxxxxx`.
#[must_use]
pub fn generate_run_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), &suffix[..8])
}

/// Returns the stop-sentinel identity for a run.
///
/// Namespaced by the run id so it never collides with a UUID event id.
#[must_use]
pub fn sentinel_id(run_id: &str) -> String {
    format!("{SENTINEL_PREFIX}{run_id}")
}
