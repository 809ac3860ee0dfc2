//! Error types for the flowbench engine.
//!
//! Failures inside one stage invocation are [`ProcessingError`]s and are
//! retried locally. Everything that escapes a stage, a queue or the builder
//! is a [`FlowbenchError`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::MetricsSummary;

/// Result alias used throughout the crate.
pub type Result<T, E = FlowbenchError> = std::result::Result<T, E>;

/// The main error type for flowbench operations.
#[derive(Debug, Error)]
pub enum FlowbenchError {
    /// A queue operation exceeded its wait bound.
    #[error("{0}")]
    Queue(#[from] QueueError),

    /// A stage kept failing after its retry budget was spent.
    #[error("Stage '{stage}' failed after {attempts} attempt(s): {source}")]
    ExhaustedRetries {
        /// The stage name.
        stage: String,
        /// Number of attempts made.
        attempts: u32,
        /// The error of the final attempt.
        #[source]
        source: ProcessingError,
    },

    /// The pipeline definition is malformed.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A stop sentinel from another run arrived on a queue.
    #[error("Stage '{stage}' received stop sentinel '{received}', expected '{expected}'")]
    UnexpectedSentinel {
        /// The stage that received it.
        stage: String,
        /// The sentinel id the run expects.
        expected: String,
        /// The sentinel id that arrived.
        received: String,
    },

    /// A run aborted on a hard failure.
    #[error("{0}")]
    Aborted(Box<AbortedRun>),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowbenchError {
    /// Returns the aborted run details, if this error ended a run.
    #[must_use]
    pub fn aborted_run(&self) -> Option<&AbortedRun> {
        match self {
            Self::Aborted(run) => Some(run),
            _ => None,
        }
    }
}

/// Errors raised by [`BoundedQueue`](crate::queue::BoundedQueue) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The operation did not complete within its timeout.
    #[error("Timed out after {waited:?} waiting on queue '{queue}'")]
    Timeout {
        /// The queue name.
        queue: String,
        /// How long the caller waited.
        waited: Duration,
    },
}

/// A failure of a single transformation attempt.
///
/// Every variant is eligible for retry under the stage's policy.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ProcessingError {
    /// The transformation failed for a transient reason.
    #[error("Processing failed: {0}")]
    Transient(String),

    /// A business rule rejected the event.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A synthetic failure produced by fault injection.
    #[error("Injected failure in stage {0}")]
    Injected(String),
}

impl ProcessingError {
    /// Creates a transient error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Error raised when a pipeline definition cannot be built.
#[derive(Debug, Clone, Error)]
#[error("Configuration error: {message}")]
pub struct ConfigurationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl ConfigurationError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Adds a single stage.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stages.push(stage.into());
        self
    }
}

/// A run that was aborted before the sink observed the stop sentinel.
///
/// No artifact exists for such a run; the metrics are returned here so the
/// caller can still report what happened.
#[derive(Debug, Error)]
#[error("Run {run_id} of pipeline '{pipeline_name}' aborted: {cause}")]
pub struct AbortedRun {
    /// The run identifier.
    pub run_id: String,
    /// The pipeline name.
    pub pipeline_name: String,
    /// Metrics captured up to the failure.
    pub metrics: MetricsSummary,
    /// The failure that aborted the run.
    #[source]
    pub cause: FlowbenchError,
}
