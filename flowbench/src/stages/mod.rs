//! Stage plugin contracts and built-in implementations.
//!
//! A pipeline is a [`Source`], any number of [`Transform`]s wrapped in
//! retrying [`Stage`](crate::pipeline::Stage) runners, and a [`Sink`].

mod ingest;
mod registry;
mod sink;
mod transform;
mod validate;

pub use ingest::{OrdersIngest, DEFAULT_INGEST_SEED};
pub use registry::{build_sink, build_source, build_transform};
pub use sink::{ConsoleSink, DEFAULT_SINK_LIMIT};
pub use transform::AddTotal;
pub use validate::{ValidateOrder, DEFAULT_REQUIRED_FIELDS};

use async_trait::async_trait;
use std::fmt::Debug;

use crate::core::{Event, Sentinel};
use crate::errors::{ProcessingError, Result};
use crate::metrics::Metrics;
use crate::queue::BoundedQueue;

/// The first stage of a pipeline: fills the first queue with events.
#[async_trait]
pub trait Source: Send + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Puts up to `count` events onto `output`.
    ///
    /// The scheduler appends the stop sentinel after this returns.
    async fn emit(&mut self, count: usize, output: &BoundedQueue, metrics: &Metrics) -> Result<()>;
}

/// The transformation applied by a middle stage.
///
/// `Ok(None)` is an intentional drop; `Err` is a failed attempt that the
/// stage runner may retry.
#[cfg_attr(test, mockall::automock)]
pub trait Transform: Send {
    /// Processes one event.
    fn process(&mut self, event: &Event) -> Result<Option<Event>, ProcessingError>;
}

/// The last stage of a pipeline: drains the final queue.
#[async_trait]
pub trait Sink: Send + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Reads `input` until the stop sentinel arrives.
    async fn consume(
        &mut self,
        input: &BoundedQueue,
        sentinel: &Sentinel,
        metrics: &Metrics,
    ) -> Result<()>;
}

/// A closure-based transform.
pub struct FnTransform<F>
where
    F: FnMut(&Event) -> Result<Option<Event>, ProcessingError> + Send,
{
    func: F,
}

impl<F> FnTransform<F>
where
    F: FnMut(&Event) -> Result<Option<Event>, ProcessingError> + Send,
{
    /// Wraps a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Debug for FnTransform<F>
where
    F: FnMut(&Event) -> Result<Option<Event>, ProcessingError> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTransform").finish_non_exhaustive()
    }
}

impl<F> Transform for FnTransform<F>
where
    F: FnMut(&Event) -> Result<Option<Event>, ProcessingError> + Send,
{
    fn process(&mut self, event: &Event) -> Result<Option<Event>, ProcessingError> {
        (self.func)(event)
    }
}

/// Passes every event through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transform for Identity {
    fn process(&mut self, event: &Event) -> Result<Option<Event>, ProcessingError> {
        Ok(Some(event.clone()))
    }
}

/// Rounds to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Payload;

    #[test]
    fn test_fn_transform() {
        let mut calls = 0;
        let mut transform = FnTransform::new(|event: &Event| {
            calls += 1;
            if event.payload().is_empty() {
                Ok(None)
            } else {
                Ok(Some(event.clone()))
            }
        });

        let event = Event::new(Payload::new());
        assert_eq!(transform.process(&event).unwrap(), None);
        drop(transform);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_identity() {
        let event = Event::new(Payload::new());
        assert_eq!(Identity.process(&event).unwrap(), Some(event));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.345_6), 12.35);
        assert_eq!(round2(3.0 * 19.99), 59.97);
    }
}
