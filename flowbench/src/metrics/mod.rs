//! Run-scoped metrics recording.
//!
//! A [`Metrics`] recorder is created per run and shared by reference between
//! the source, the middle stages and the sink. It is finalized once by the
//! scheduler and summarized into a [`MetricsSummary`] for the run artifact.

mod recorder;
mod summary;
mod timer;

pub use recorder::Metrics;
pub use summary::{nearest_rank, LatencySummary, MetricsSummary, QueueDepthSample};
pub use timer::LatencyTimer;
