//! Retrying stage runner for middle stages.

use std::fmt::Debug;
use std::sync::Arc;

use tracing::{debug, warn};

use super::fault::FaultInjector;
use super::idempotency::IdempotencyGuard;
use super::retry::RetryPolicy;
use crate::core::{Event, Message, Sentinel};
use crate::errors::{FlowbenchError, ProcessingError, Result};
use crate::metrics::{LatencyTimer, Metrics};
use crate::queue::BoundedQueue;
use crate::stages::Transform;

/// Lifecycle of a middle stage within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// The stage should be invoked again.
    Running,
    /// The stage forwarded the stop sentinel and is finished.
    Stopped,
}

impl StageState {
    /// Returns true if the stage is still running.
    #[must_use]
    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

/// A transform wired between two queues, with retry, fault injection and
/// per-run deduplication.
pub struct Stage {
    name: String,
    input: Arc<BoundedQueue>,
    output: Option<Arc<BoundedQueue>>,
    retry: RetryPolicy,
    faults: FaultInjector,
    guard: IdempotencyGuard,
    transform: Box<dyn Transform>,
}

impl Stage {
    /// Creates a stage with the default retry policy, no fault injection and
    /// idempotency enabled.
    pub fn new(
        name: impl Into<String>,
        input: Arc<BoundedQueue>,
        output: Option<Arc<BoundedQueue>>,
        transform: Box<dyn Transform>,
    ) -> Self {
        Self {
            name: name.into(),
            input,
            output,
            retry: RetryPolicy::default(),
            faults: FaultInjector::disabled(),
            guard: IdempotencyGuard::new(true),
            transform,
        }
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Enables fault injection with the given probability and seed.
    #[must_use]
    pub fn with_fault_injection(mut self, probability: f64, seed: Option<u64>) -> Self {
        self.faults = FaultInjector::new(probability, seed);
        self
    }

    /// Enables or disables deduplication by event id.
    #[must_use]
    pub fn with_idempotency(mut self, enabled: bool) -> Self {
        self.guard = IdempotencyGuard::new(enabled);
        self
    }

    /// The stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The queue this stage reads from.
    #[must_use]
    pub fn input(&self) -> &Arc<BoundedQueue> {
        &self.input
    }

    /// The queue this stage writes to, if any.
    #[must_use]
    pub fn output(&self) -> Option<&Arc<BoundedQueue>> {
        self.output.as_ref()
    }

    /// The retry policy.
    #[must_use]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Returns true if the stage can take a step without waiting: its input
    /// holds a message and its output has room for one.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.input.size() > 0 && self.output.as_ref().map_or(true, |q| q.has_room())
    }

    /// Forgets events processed in a previous run.
    pub fn reset(&mut self) {
        self.guard.clear();
    }

    /// Processes one message from the input queue.
    ///
    /// Every invocation records one latency sample and acknowledges the
    /// dequeued message, including when it fails.
    ///
    /// # Errors
    ///
    /// Returns [`FlowbenchError::ExhaustedRetries`] once the retry budget is
    /// spent, and [`FlowbenchError::UnexpectedSentinel`] for a stop message of
    /// another run.
    pub async fn run_one(&mut self, metrics: &Metrics, sentinel: &Sentinel) -> Result<StageState> {
        let input = Arc::clone(&self.input);
        let message = input.get(None).await?;
        let _timer = LatencyTimer::start(metrics);
        let _ack = input.task_guard();

        let event = match message {
            Message::Stop(received) if &received == sentinel => {
                if let Some(output) = &self.output {
                    output.put(Message::Stop(received), None).await?;
                }
                debug!(stage = %self.name, "Stage stopped");
                return Ok(StageState::Stopped);
            }
            Message::Stop(received) => {
                return Err(FlowbenchError::UnexpectedSentinel {
                    stage: self.name.clone(),
                    expected: sentinel.id().to_string(),
                    received: received.id().to_string(),
                });
            }
            Message::Data(event) => event,
        };

        if self.guard.is_duplicate(event.id()) {
            metrics.inc(&self.counter("deduped"), 1);
            return Ok(StageState::Running);
        }

        let processed = self.process_with_retry(&event, metrics).await?;
        self.guard.record(event.id());

        match (processed, &self.output) {
            (Some(out), Some(output)) => {
                output.put(Message::Data(out), None).await?;
                metrics.inc(&self.counter("out"), 1);
            }
            // No downstream queue means the event goes nowhere.
            _ => metrics.inc(&self.counter("dropped"), 1),
        }

        Ok(StageState::Running)
    }

    async fn process_with_retry(
        &mut self,
        event: &Event,
        metrics: &Metrics,
    ) -> Result<Option<Event>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(event) {
                Ok(processed) => return Ok(processed),
                Err(error) => {
                    metrics.inc(&self.counter("errors"), 1);

                    if !self.retry.allows_retry_after(attempt) {
                        metrics.inc(&self.counter("failed"), 1);
                        warn!(
                            stage = %self.name,
                            event_id = %event.id(),
                            attempts = attempt,
                            error = %error,
                            "Retries exhausted"
                        );
                        return Err(FlowbenchError::ExhaustedRetries {
                            stage: self.name.clone(),
                            attempts: attempt,
                            source: error,
                        });
                    }

                    metrics.inc(&self.counter("retries"), 1);
                    let delay = self.retry.delay_for_attempt(attempt);
                    debug!(
                        stage = %self.name,
                        attempt,
                        delay_s = delay.as_secs_f64(),
                        error = %error,
                        "Retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn attempt(&mut self, event: &Event) -> std::result::Result<Option<Event>, ProcessingError> {
        self.faults.maybe_fail(&self.name)?;
        self.transform.process(event)
    }

    fn counter(&self, suffix: &str) -> String {
        format!("{}.{suffix}", self.name)
    }
}

impl Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("input", &self.input.name())
            .field("output", &self.output.as_ref().map(|q| q.name()))
            .field("retry", &self.retry)
            .field("fault_probability", &self.faults.probability())
            .field("idempotency", &self.guard.is_enabled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{Identity, MockTransform};
    use crate::testing::{order_event, DropWhere, FailTimes, FailingTransform};
    use pretty_assertions::assert_eq;

    fn queues() -> (Arc<BoundedQueue>, Arc<BoundedQueue>) {
        (
            Arc::new(BoundedQueue::unbounded("q0")),
            Arc::new(BoundedQueue::unbounded("q1")),
        )
    }

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(attempts)
            .with_base_delay_s(0.0)
    }

    #[tokio::test]
    async fn test_passes_event_downstream() {
        let (input, output) = queues();
        let mut stage = Stage::new("t", input.clone(), Some(output.clone()), Box::new(Identity));
        let metrics = Metrics::new();
        let event = order_event(1);

        input.put(Message::Data(event.clone()), None).await.unwrap();
        let state = stage.run_one(&metrics, &Sentinel::for_run("r")).await.unwrap();

        assert_eq!(state, StageState::Running);
        assert_eq!(output.try_get(), Some(Message::Data(event)));
        assert_eq!(metrics.counter("t.out"), 1);
        assert_eq!(input.unfinished(), 0);
        assert_eq!(metrics.summary().latency_ms.count, 1);
    }

    #[tokio::test]
    async fn test_forwards_sentinel_and_stops() {
        let (input, output) = queues();
        let mut stage = Stage::new("t", input.clone(), Some(output.clone()), Box::new(Identity));
        let sentinel = Sentinel::for_run("r");

        input.put(Message::Stop(sentinel.clone()), None).await.unwrap();
        let state = stage.run_one(&Metrics::new(), &sentinel).await.unwrap();

        assert_eq!(state, StageState::Stopped);
        assert_eq!(output.try_get(), Some(Message::Stop(sentinel)));
    }

    #[tokio::test]
    async fn test_foreign_sentinel_is_error() {
        let (input, output) = queues();
        let mut stage = Stage::new("t", input.clone(), Some(output.clone()), Box::new(Identity));

        input.put(Message::Stop(Sentinel::for_run("old")), None).await.unwrap();
        let err = stage
            .run_one(&Metrics::new(), &Sentinel::for_run("new"))
            .await
            .unwrap_err();

        assert!(matches!(err, FlowbenchError::UnexpectedSentinel { .. }));
        assert_eq!(output.size(), 0);
        assert_eq!(input.unfinished(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_is_not_reprocessed() {
        let (input, output) = queues();
        let mut mock = MockTransform::new();
        mock.expect_process()
            .times(1)
            .returning(|event| Ok(Some(event.clone())));
        let mut stage = Stage::new("t", input.clone(), Some(output.clone()), Box::new(mock));
        let metrics = Metrics::new();
        let sentinel = Sentinel::for_run("r");
        let event = order_event(1);

        input.put(Message::Data(event.clone()), None).await.unwrap();
        input.put(Message::Data(event), None).await.unwrap();
        stage.run_one(&metrics, &sentinel).await.unwrap();
        stage.run_one(&metrics, &sentinel).await.unwrap();

        assert_eq!(metrics.counter("t.out"), 1);
        assert_eq!(metrics.counter("t.deduped"), 1);
        assert_eq!(output.size(), 1);
    }

    #[tokio::test]
    async fn test_duplicates_pass_when_idempotency_disabled() {
        let (input, output) = queues();
        let mut stage = Stage::new("t", input.clone(), Some(output.clone()), Box::new(Identity))
            .with_idempotency(false);
        let metrics = Metrics::new();
        let sentinel = Sentinel::for_run("r");
        let event = order_event(1);

        input.put(Message::Data(event.clone()), None).await.unwrap();
        input.put(Message::Data(event), None).await.unwrap();
        stage.run_one(&metrics, &sentinel).await.unwrap();
        stage.run_one(&metrics, &sentinel).await.unwrap();

        assert_eq!(metrics.counter("t.out"), 2);
        assert_eq!(metrics.counter("t.deduped"), 0);
    }

    #[tokio::test]
    async fn test_reset_forgets_seen_events() {
        let (input, output) = queues();
        let mut stage = Stage::new("t", input.clone(), Some(output), Box::new(Identity));
        let metrics = Metrics::new();
        let sentinel = Sentinel::for_run("r");
        let event = order_event(1);

        input.put(Message::Data(event.clone()), None).await.unwrap();
        stage.run_one(&metrics, &sentinel).await.unwrap();
        stage.reset();
        input.put(Message::Data(event), None).await.unwrap();
        stage.run_one(&metrics, &sentinel).await.unwrap();

        assert_eq!(metrics.counter("t.out"), 2);
    }

    #[tokio::test]
    async fn test_drop_is_counted_not_failed() {
        let (input, output) = queues();
        let mut stage = Stage::new(
            "t",
            input.clone(),
            Some(output.clone()),
            Box::new(DropWhere::new(|_: &Event| true)),
        );
        let metrics = Metrics::new();

        input.put(Message::Data(order_event(1)), None).await.unwrap();
        let state = stage.run_one(&metrics, &Sentinel::for_run("r")).await.unwrap();

        assert_eq!(state, StageState::Running);
        assert_eq!(metrics.counter("t.dropped"), 1);
        assert_eq!(metrics.counter("t.out"), 0);
        assert_eq!(output.size(), 0);
    }

    #[tokio::test]
    async fn test_output_without_downstream_counts_as_dropped() {
        let input = Arc::new(BoundedQueue::unbounded("q0"));
        let mut stage = Stage::new("t", input.clone(), None, Box::new(Identity));
        let metrics = Metrics::new();

        input.put(Message::Data(order_event(1)), None).await.unwrap();
        let state = stage.run_one(&metrics, &Sentinel::for_run("r")).await.unwrap();

        assert_eq!(state, StageState::Running);
        assert_eq!(metrics.counter("t.dropped"), 1);
        assert_eq!(metrics.counter("t.out"), 0);
        assert_eq!(input.unfinished(), 0);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let (input, output) = queues();
        let mut stage = Stage::new("t", input.clone(), Some(output.clone()), Box::new(FailTimes::new(2)))
            .with_retry(fast_retry(3));
        let metrics = Metrics::new();

        input.put(Message::Data(order_event(1)), None).await.unwrap();
        stage.run_one(&metrics, &Sentinel::for_run("r")).await.unwrap();

        assert_eq!(metrics.counter("t.errors"), 2);
        assert_eq!(metrics.counter("t.retries"), 2);
        assert_eq!(metrics.counter("t.failed"), 0);
        assert_eq!(metrics.counter("t.out"), 1);
    }

    #[tokio::test]
    async fn test_certain_fault_exhausts_attempts() {
        let (input, output) = queues();
        let mut stage = Stage::new("t", input.clone(), Some(output.clone()), Box::new(Identity))
            .with_retry(fast_retry(4))
            .with_fault_injection(1.0, Some(7));
        let metrics = Metrics::new();

        input.put(Message::Data(order_event(1)), None).await.unwrap();
        let err = stage
            .run_one(&metrics, &Sentinel::for_run("r"))
            .await
            .unwrap_err();

        match err {
            FlowbenchError::ExhaustedRetries { stage, attempts, source } => {
                assert_eq!(stage, "t");
                assert_eq!(attempts, 4);
                assert_eq!(source, ProcessingError::Injected("t".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(metrics.counter("t.errors"), 4);
        assert_eq!(metrics.counter("t.retries"), 3);
        assert_eq!(metrics.counter("t.failed"), 1);
        assert_eq!(input.unfinished(), 0);
        assert_eq!(metrics.summary().latency_ms.count, 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_recorded_as_seen() {
        let (input, output) = queues();
        let mut stage = Stage::new("t", input.clone(), Some(output), Box::new(FailingTransform::new("boom")))
            .with_retry(fast_retry(1));
        let metrics = Metrics::new();
        let event = order_event(1);

        input.put(Message::Data(event.clone()), None).await.unwrap();
        input.put(Message::Data(event), None).await.unwrap();
        assert!(stage.run_one(&metrics, &Sentinel::for_run("r")).await.is_err());
        assert!(stage.run_one(&metrics, &Sentinel::for_run("r")).await.is_err());

        assert_eq!(metrics.counter("t.deduped"), 0);
        assert_eq!(metrics.counter("t.failed"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_between_attempts() {
        let (input, output) = queues();
        let mut stage = Stage::new("t", input.clone(), Some(output), Box::new(FailTimes::new(2)))
            .with_retry(RetryPolicy::new().with_base_delay_s(1.0).with_backoff(2.0));
        let metrics = Metrics::new();

        input.put(Message::Data(order_event(1)), None).await.unwrap();
        let started = tokio::time::Instant::now();
        stage.run_one(&metrics, &Sentinel::for_run("r")).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= std::time::Duration::from_secs(3), "{elapsed:?}");
        assert!(elapsed < std::time::Duration::from_secs(4), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_readiness() {
        let input = Arc::new(BoundedQueue::unbounded("q0"));
        let output = Arc::new(BoundedQueue::new("q1", 1));
        let stage = Stage::new("t", input.clone(), Some(output.clone()), Box::new(Identity));

        assert!(!stage.is_ready());
        input.put(Message::Data(order_event(1)), None).await.unwrap();
        assert!(stage.is_ready());
        output.put(Message::Data(order_event(2)), None).await.unwrap();
        assert!(!stage.is_ready());
    }
}
