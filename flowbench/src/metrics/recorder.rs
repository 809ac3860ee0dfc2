//! Mutable metrics recorder.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::summary::{LatencySummary, MetricsSummary, QueueDepthSample};
use crate::utils::timestamps::seconds_between;
use crate::utils::{now_utc, unix_seconds, Timestamp};

#[derive(Debug, Default)]
struct MetricsState {
    counters: BTreeMap<String, u64>,
    latencies_ms: Vec<f64>,
    queue_depth_samples: Vec<QueueDepthSample>,
    finished_at: Option<Timestamp>,
}

/// Counters, latency samples and queue-depth snapshots for one run.
#[derive(Debug)]
pub struct Metrics {
    started_at: Timestamp,
    state: Mutex<MetricsState>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Creates a recorder whose start time is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: now_utc(),
            state: Mutex::new(MetricsState::default()),
        }
    }

    /// Adds `n` to the counter `key`, creating it at zero first.
    pub fn inc(&self, key: &str, n: u64) {
        let mut state = self.state.lock();
        *state.counters.entry(key.to_string()).or_insert(0) += n;
    }

    /// Returns the current value of a counter (zero if never incremented).
    #[must_use]
    pub fn counter(&self, key: &str) -> u64 {
        self.state.lock().counters.get(key).copied().unwrap_or(0)
    }

    /// Appends one latency sample in milliseconds.
    pub fn observe_latency_ms(&self, ms: f64) {
        self.state.lock().latencies_ms.push(ms);
    }

    /// Appends a timestamped queue-depth snapshot.
    pub fn sample_queue_depth(&self, depths: BTreeMap<String, usize>) {
        let sample = QueueDepthSample {
            depths,
            ts: unix_seconds(now_utc()),
        };
        self.state.lock().queue_depth_samples.push(sample);
    }

    /// Fixes the finish timestamp. Calling it again overwrites the previous value.
    pub fn finalize(&self) {
        self.state.lock().finished_at = Some(now_utc());
    }

    /// When the recorder was created.
    #[must_use]
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// When the run was finalized, if it was.
    #[must_use]
    pub fn finished_at(&self) -> Option<Timestamp> {
        self.state.lock().finished_at
    }

    /// Derives a read-only summary without changing recorded state.
    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        let state = self.state.lock();
        let end = state.finished_at.unwrap_or_else(now_utc);

        MetricsSummary {
            duration_s: seconds_between(self.started_at, end),
            counters: state.counters.clone(),
            latency_ms: LatencySummary::from_samples(&state.latencies_ms),
            queue_depth_samples: state.queue_depth_samples.clone(),
        }
    }
}
