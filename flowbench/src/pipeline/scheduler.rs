//! The run scheduler.
//!
//! A run is three cooperative futures on one task: the source filling the
//! first queue, a round-robin driver over the middle stages, and the sink
//! draining the last queue. Nothing is spawned, so the interleaving depends
//! only on queue capacities and seeds.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use futures::future::{select_all, BoxFuture, FutureExt};
use tracing::{debug, error, info};

use super::stage::{Stage, StageState};
use crate::core::{Message, RunArtifact, Sentinel};
use crate::errors::{AbortedRun, ConfigurationError, FlowbenchError, Result};
use crate::metrics::Metrics;
use crate::queue::BoundedQueue;
use crate::stages::{Sink, Source};
use crate::utils::generate_run_id;

/// Counter incremented once when a run aborts.
pub const HARD_FAIL_COUNTER: &str = "pipeline.hard_fail";

/// Default number of stage steps between queue-depth snapshots.
pub const DEFAULT_SAMPLE_EVERY: u64 = 50;

/// A wired pipeline: source, middle stages and sink joined by queues.
pub struct Pipeline {
    name: String,
    source: Box<dyn Source>,
    stages: Vec<Stage>,
    sink: Box<dyn Sink>,
    queues: Vec<Arc<BoundedQueue>>,
    sample_every: u64,
}

impl Pipeline {
    /// Assembles a pipeline.
    ///
    /// `queues[0]` feeds the first middle stage (or the sink if there are
    /// none), stage `i` reads `queues[i]` and writes `queues[i + 1]`, and the
    /// sink drains the last queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue count is not `stages.len() + 1` or a
    /// stage is not wired to its consecutive pair of queues.
    pub fn new(
        name: impl Into<String>,
        source: Box<dyn Source>,
        stages: Vec<Stage>,
        sink: Box<dyn Sink>,
        queues: Vec<Arc<BoundedQueue>>,
    ) -> Result<Self, ConfigurationError> {
        if queues.len() != stages.len() + 1 {
            return Err(ConfigurationError::new(format!(
                "Expected {} queues for {} middle stage(s), got {}",
                stages.len() + 1,
                stages.len(),
                queues.len()
            )));
        }

        for (i, stage) in stages.iter().enumerate() {
            let input_ok = Arc::ptr_eq(stage.input(), &queues[i]);
            let output_ok = stage
                .output()
                .is_some_and(|output| Arc::ptr_eq(output, &queues[i + 1]));
            if !input_ok || !output_ok {
                return Err(ConfigurationError::new(format!(
                    "Stage '{}' must read {} and write {}",
                    stage.name(),
                    queues[i].name(),
                    queues[i + 1].name()
                ))
                .with_stage(stage.name()));
            }
        }

        Ok(Self {
            name: name.into(),
            source,
            stages,
            sink,
            queues,
            sample_every: DEFAULT_SAMPLE_EVERY,
        })
    }

    /// Sets how many stage steps pass between queue-depth snapshots.
    /// Zero disables sampling.
    #[must_use]
    pub fn with_sample_every(mut self, steps: u64) -> Self {
        self.sample_every = steps;
        self
    }

    /// The pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The middle stages, in order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The queues, in order.
    #[must_use]
    pub fn queues(&self) -> &[Arc<BoundedQueue>] {
        &self.queues
    }

    /// Runs the pipeline for `max_events` source events.
    ///
    /// # Errors
    ///
    /// Any failure of the source, a middle stage or the sink aborts the run
    /// and is returned as [`FlowbenchError::Aborted`], carrying the metrics
    /// so far with [`HARD_FAIL_COUNTER`] set.
    pub async fn run(&mut self, max_events: usize) -> Result<RunArtifact> {
        let metrics = Metrics::new();
        let run_id = generate_run_id();
        let sentinel = Sentinel::for_run(&run_id);

        for stage in &mut self.stages {
            stage.reset();
        }

        info!(
            pipeline = %self.name,
            run_id = %run_id,
            max_events,
            stages = self.stages.len(),
            "Starting run"
        );

        // `new` guarantees at least one queue.
        let first = Arc::clone(&self.queues[0]);
        let last = Arc::clone(&self.queues[self.queues.len() - 1]);

        let outcome = tokio::try_join!(
            produce(self.source.as_mut(), &first, max_events, &metrics, &sentinel),
            drive(&mut self.stages, &self.queues, self.sample_every, &metrics, &sentinel),
            self.sink.consume(&last, &sentinel, &metrics),
        );

        if let Err(cause) = outcome {
            metrics.inc(HARD_FAIL_COUNTER, 1);
            metrics.finalize();
            error!(pipeline = %self.name, run_id = %run_id, error = %cause, "Run aborted");
            return Err(FlowbenchError::Aborted(Box::new(AbortedRun {
                run_id,
                pipeline_name: self.name.clone(),
                metrics: metrics.summary(),
                cause,
            })));
        }

        metrics.finalize();
        let summary = metrics.summary();
        info!(
            pipeline = %self.name,
            run_id = %run_id,
            duration_s = summary.duration_s,
            "Run finished"
        );

        Ok(RunArtifact::new(run_id, self.name.clone(), summary))
    }
}

impl Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("stages", &self.stages)
            .field("sink", &self.sink)
            .field("sample_every", &self.sample_every)
            .finish_non_exhaustive()
    }
}

async fn produce(
    source: &mut dyn Source,
    queue: &BoundedQueue,
    count: usize,
    metrics: &Metrics,
    sentinel: &Sentinel,
) -> Result<()> {
    source.emit(count, queue, metrics).await?;
    queue.put(Message::Stop(sentinel.clone()), None).await?;
    debug!(source = %source.name(), "Stop sentinel enqueued");
    Ok(())
}

async fn drive(
    stages: &mut [Stage],
    queues: &[Arc<BoundedQueue>],
    sample_every: u64,
    metrics: &Metrics,
    sentinel: &Sentinel,
) -> Result<()> {
    let mut states = vec![StageState::Running; stages.len()];
    let mut steps: u64 = 0;

    while states.iter().any(|state| state.is_running()) {
        let mut progressed = false;

        for (stage, state) in stages.iter_mut().zip(states.iter_mut()) {
            if !state.is_running() || !stage.is_ready() {
                continue;
            }
            *state = stage.run_one(metrics, sentinel).await?;
            progressed = true;

            steps += 1;
            if sample_every > 0 && steps % sample_every == 0 {
                sample_depths(queues, metrics);
            }
        }

        if !progressed {
            wait_for_ready(stages, &states).await;
        }
    }

    Ok(())
}

/// Parks until some running stage may be able to step.
async fn wait_for_ready(stages: &[Stage], states: &[StageState]) {
    let waits: Vec<BoxFuture<'_, ()>> = stages
        .iter()
        .zip(states)
        .filter(|(_, state)| state.is_running())
        .map(|(stage, _)| match stage.output() {
            Some(output) if stage.input().size() > 0 => output.writable().boxed(),
            _ => stage.input().readable().boxed(),
        })
        .collect();

    if !waits.is_empty() {
        select_all(waits).await;
    }
}

fn sample_depths(queues: &[Arc<BoundedQueue>], metrics: &Metrics) {
    let depths: BTreeMap<String, usize> = queues
        .iter()
        .map(|queue| (queue.name().to_string(), queue.size()))
        .collect();
    metrics.sample_queue_depth(depths);
}
