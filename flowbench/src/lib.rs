//! # Flowbench
//!
//! A deterministic, single-task engine for staged data pipelines.
//!
//! A pipeline is a source, a chain of retrying transform stages and a sink,
//! connected by bounded FIFO queues. Flowbench provides:
//!
//! - **Backpressure**: producers wait on full queues instead of dropping
//! - **Retries**: per-stage exponential backoff with seeded fault injection
//! - **Idempotency**: stages skip events they already processed in a run
//! - **Sentinel termination**: a typed stop message drains every stage in order
//! - **Run artifacts**: counters, latency percentiles and queue-depth samples
//!   persisted as JSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowbench::prelude::*;
//!
//! # async fn demo() -> flowbench::errors::Result<()> {
//! let mut pipeline = PipelineBuilder::new("orders")
//!     .capacity(10)
//!     .source(Box::new(OrdersIngest::new("ingest", 123)))
//!     .transform(TransformSpec::new("add_total", Box::new(AddTotal::new())))
//!     .sink(Box::new(ConsoleSink::stdout("sink", 5)))
//!     .build()?;
//!
//! let artifact = pipeline.run(100).await?;
//! println!("{}", artifact.render_report());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{parse_pipeline, parse_pipeline_str, LoadedConfig, PipelineConfig};
    pub use crate::core::{Event, Message, Payload, RunArtifact, Sentinel};
    pub use crate::errors::{
        AbortedRun, ConfigurationError, FlowbenchError, ProcessingError, QueueError,
    };
    pub use crate::metrics::{Metrics, MetricsSummary};
    pub use crate::pipeline::{
        Pipeline, PipelineBuilder, RetryPolicy, Stage, StageState, TransformSpec,
        HARD_FAIL_COUNTER,
    };
    pub use crate::queue::BoundedQueue;
    pub use crate::stages::{
        AddTotal, ConsoleSink, FnTransform, OrdersIngest, Sink, Source, Transform, ValidateOrder,
    };
}
