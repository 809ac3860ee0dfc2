//! Scripted stages for testing.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{Event, Message, Sentinel};
use crate::errors::{FlowbenchError, ProcessingError, Result};
use crate::metrics::Metrics;
use crate::queue::BoundedQueue;
use crate::stages::{Sink, Source, Transform};

/// A source that emits a prepared list of events, in order.
///
/// Emits `min(count, events.len())` events. Duplicates in the list are
/// emitted as-is, which makes it useful for idempotency tests.
#[derive(Debug, Clone)]
pub struct VecSource {
    name: String,
    events: Vec<Event>,
}

impl VecSource {
    /// Creates a new source.
    #[must_use]
    pub fn new(name: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            name: name.into(),
            events,
        }
    }
}

#[async_trait]
impl Source for VecSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn emit(&mut self, count: usize, output: &BoundedQueue, metrics: &Metrics) -> Result<()> {
        let counter = format!("{}.out", self.name);
        for event in self.events.iter().take(count) {
            output.put(Message::Data(event.clone()), None).await?;
            metrics.inc(&counter, 1);
        }
        Ok(())
    }
}

/// A sink that keeps every event it receives.
#[derive(Debug, Clone)]
pub struct CollectingSink {
    name: String,
    received: Arc<Mutex<Vec<Event>>>,
}

impl CollectingSink {
    /// Creates a new sink.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the events received so far, in arrival order.
    #[must_use]
    pub fn received(&self) -> Vec<Event> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl Sink for CollectingSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn consume(
        &mut self,
        input: &BoundedQueue,
        sentinel: &Sentinel,
        metrics: &Metrics,
    ) -> Result<()> {
        let counter = format!("{}.in", self.name);
        loop {
            let message = input.get(None).await?;
            let _ack = input.task_guard();
            match message {
                Message::Stop(received) if &received == sentinel => return Ok(()),
                Message::Stop(received) => {
                    return Err(FlowbenchError::UnexpectedSentinel {
                        stage: self.name.clone(),
                        expected: sentinel.id().to_string(),
                        received: received.id().to_string(),
                    })
                }
                Message::Data(event) => {
                    metrics.inc(&counter, 1);
                    self.received.lock().push(event);
                }
            }
        }
    }
}

/// A transform that always fails.
#[derive(Debug, Clone)]
pub struct FailingTransform {
    error: ProcessingError,
}

impl FailingTransform {
    /// Creates a transform failing with a transient error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ProcessingError::transient(message),
        }
    }
}

impl Transform for FailingTransform {
    fn process(&mut self, _event: &Event) -> Result<Option<Event>, ProcessingError> {
        Err(self.error.clone())
    }
}

/// A transform that fails a fixed number of times, then passes events through.
#[derive(Debug, Clone)]
pub struct FailTimes {
    remaining: u32,
}

impl FailTimes {
    /// Creates a transform that fails the first `failures` calls.
    #[must_use]
    pub fn new(failures: u32) -> Self {
        Self {
            remaining: failures,
        }
    }
}

impl Transform for FailTimes {
    fn process(&mut self, event: &Event) -> Result<Option<Event>, ProcessingError> {
        if self.remaining > 0 {
            self.remaining -= 1;
            return Err(ProcessingError::transient("scripted failure"));
        }
        Ok(Some(event.clone()))
    }
}

/// A transform that drops events matching a predicate and passes the rest.
pub struct DropWhere<F>
where
    F: Fn(&Event) -> bool + Send,
{
    predicate: F,
}

impl<F> DropWhere<F>
where
    F: Fn(&Event) -> bool + Send,
{
    /// Creates a new dropping transform.
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> std::fmt::Debug for DropWhere<F>
where
    F: Fn(&Event) -> bool + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropWhere").finish_non_exhaustive()
    }
}

impl<F> Transform for DropWhere<F>
where
    F: Fn(&Event) -> bool + Send,
{
    fn process(&mut self, event: &Event) -> Result<Option<Event>, ProcessingError> {
        if (self.predicate)(event) {
            Ok(None)
        } else {
            Ok(Some(event.clone()))
        }
    }
}

/// A pass-through transform that records the id of every event it sees.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransform {
    seen: Arc<Mutex<Vec<String>>>,
}

impl RecordingTransform {
    /// Creates a new recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ids processed so far. Clones share the record.
    #[must_use]
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

impl Transform for RecordingTransform {
    fn process(&mut self, event: &Event) -> Result<Option<Event>, ProcessingError> {
        self.seen.lock().push(event.id().to_string());
        Ok(Some(event.clone()))
    }
}
