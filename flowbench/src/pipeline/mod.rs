//! Pipeline building and execution.
//!
//! This module provides:
//! - Retry policies, fault injection and per-stage deduplication
//! - The retrying stage runner
//! - The run scheduler
//! - A builder that wires queues and stages

mod builder;
mod fault;
mod idempotency;
mod retry;
mod scheduler;
mod stage;

#[cfg(test)]
mod integration_tests;

pub use builder::{PipelineBuilder, TransformSpec};
pub use fault::FaultInjector;
pub use idempotency::IdempotencyGuard;
pub use retry::RetryPolicy;
pub use scheduler::{Pipeline, DEFAULT_SAMPLE_EVERY, HARD_FAIL_COUNTER};
pub use stage::{Stage, StageState};
