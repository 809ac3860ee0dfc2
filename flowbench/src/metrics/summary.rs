//! Read-only metrics summaries, as stored in run artifacts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Summary of a run's metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Run duration in seconds.
    pub duration_s: f64,
    /// Counter values by name.
    pub counters: BTreeMap<String, u64>,
    /// Latency statistics over all stage invocations.
    pub latency_ms: LatencySummary,
    /// Queue-depth snapshots in the order they were taken.
    pub queue_depth_samples: Vec<QueueDepthSample>,
}

impl MetricsSummary {
    /// Returns a counter value, or `None` if it was never incremented.
    #[must_use]
    pub fn counter(&self, key: &str) -> Option<u64> {
        self.counters.get(key).copied()
    }
}

/// Latency statistics in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Number of samples.
    pub count: usize,
    /// Median (nearest rank).
    pub p50: Option<f64>,
    /// 95th percentile (nearest rank).
    pub p95: Option<f64>,
    /// Arithmetic mean.
    pub mean: Option<f64>,
}

impl LatencySummary {
    /// Computes statistics over a sorted copy of `samples`.
    #[must_use]
    pub fn from_samples(samples: &[f64]) -> Self {
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = if sorted.is_empty() {
            None
        } else {
            Some(sorted.iter().sum::<f64>() / sorted.len() as f64)
        };

        Self {
            count: sorted.len(),
            p50: nearest_rank(&sorted, 50.0),
            p95: nearest_rank(&sorted, 95.0),
            mean,
        }
    }
}

/// One snapshot of every queue's depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueDepthSample {
    /// Depth by queue name.
    #[serde(flatten)]
    pub depths: BTreeMap<String, usize>,
    /// Unix time of the snapshot in seconds.
    #[serde(rename = "_ts")]
    pub ts: f64,
}

/// Nearest-rank percentile of an ascending slice.
///
/// The index is `round(p / 100 * (len - 1))` with halves rounded to even.
#[must_use]
pub fn nearest_rank(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let last = sorted.len() - 1;
    let idx = round_half_even((p / 100.0) * last as f64) as usize;
    Some(sorted[idx.min(last)])
}

fn round_half_even(x: f64) -> f64 {
    let floor = x.floor();
    let frac = x - floor;
    if frac > 0.5 {
        floor + 1.0
    } else if frac < 0.5 || floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nearest_rank() {
        let sorted = [10.0, 20.0, 30.0, 40.0];

        assert_eq!(nearest_rank(&sorted, 50.0), Some(30.0));
        assert_eq!(nearest_rank(&sorted, 95.0), Some(40.0));
        assert_eq!(nearest_rank(&sorted, 0.0), Some(10.0));
        assert_eq!(nearest_rank(&[], 50.0), None);
        assert_eq!(nearest_rank(&[7.0], 95.0), Some(7.0));
    }

    #[test]
    fn test_nearest_rank_ties_round_to_even() {
        let six: Vec<f64> = (1..=6).map(f64::from).collect();
        assert_eq!(nearest_rank(&six, 50.0), Some(3.0));

        let thirty_one: Vec<f64> = (1..=31).map(f64::from).collect();
        assert_eq!(nearest_rank(&thirty_one, 95.0), Some(29.0));

        let four: Vec<f64> = (1..=4).map(f64::from).collect();
        assert_eq!(nearest_rank(&four, 50.0), Some(3.0));
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(0.5), 0.0);
        assert_eq!(round_half_even(1.5), 2.0);
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(2.4), 2.0);
        assert_eq!(round_half_even(2.6), 3.0);
    }

    #[test]
    fn test_queue_depth_sample_shape() {
        let sample = QueueDepthSample {
            depths: BTreeMap::from([("q0".to_string(), 2)]),
            ts: 12.5,
        };

        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value, json!({"q0": 2, "_ts": 12.5}));

        let back: QueueDepthSample = serde_json::from_value(value).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_latency_summary_serializes_nulls() {
        let value = serde_json::to_value(LatencySummary::from_samples(&[])).unwrap();
        assert_eq!(value, json!({"count": 0, "p50": null, "p95": null, "mean": null}));
    }
}
