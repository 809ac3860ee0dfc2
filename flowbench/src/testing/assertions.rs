//! Assertions over run results.

use crate::core::Event;
use crate::metrics::MetricsSummary;

/// Asserts that a counter has the expected value. A missing counter counts as zero.
pub fn assert_counter(metrics: &MetricsSummary, key: &str, expected: u64) {
    let actual = metrics.counter(key).unwrap_or(0);
    assert_eq!(
        actual, expected,
        "Expected counter '{}' to be {}, got {}. Counters: {:?}",
        key, expected, actual, metrics.counters
    );
}

/// Asserts that the run recorded no hard failure.
pub fn assert_no_hard_fail(metrics: &MetricsSummary) {
    assert!(
        metrics.counter("pipeline.hard_fail").is_none(),
        "Expected no hard failure, counters: {:?}",
        metrics.counters
    );
}

/// Asserts that `received` holds events with the ids of `sent`, in the same order.
pub fn assert_order_preserved(sent: &[Event], received: &[Event]) {
    let sent: Vec<&str> = sent.iter().map(Event::id).collect();
    let received: Vec<&str> = received.iter().map(Event::id).collect();
    assert_eq!(sent, received, "Event order changed between source and sink");
}
