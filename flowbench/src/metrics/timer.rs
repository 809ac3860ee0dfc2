//! Latency timing for stage invocations.

use std::time::Instant;

use super::Metrics;

/// Records the elapsed wall time as a latency sample when dropped.
#[derive(Debug)]
pub struct LatencyTimer<'a> {
    start: Instant,
    metrics: &'a Metrics,
}

impl<'a> LatencyTimer<'a> {
    /// Starts timing.
    #[must_use]
    pub fn start(metrics: &'a Metrics) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer<'_> {
    fn drop(&mut self) {
        self.metrics.observe_latency_ms(self.elapsed_ms());
    }
}
