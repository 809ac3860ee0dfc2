//! Pipeline builder with validation.

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use super::retry::RetryPolicy;
use super::scheduler::{Pipeline, DEFAULT_SAMPLE_EVERY};
use super::stage::Stage;
use crate::config::{validate_pipeline, PipelineConfig, StageConfig};
use crate::errors::ConfigurationError;
use crate::queue::BoundedQueue;
use crate::stages::{build_sink, build_source, build_transform, Sink, Source, Transform};

/// A middle stage waiting to be wired.
pub struct TransformSpec {
    name: String,
    transform: Box<dyn Transform>,
    retry: RetryPolicy,
    fail_prob: f64,
    seed: Option<u64>,
    idempotency: bool,
}

impl TransformSpec {
    /// Creates a transform stage with the default retry policy, no fault injection and
    /// idempotency enabled.
    pub fn new(name: impl Into<String>, transform: Box<dyn Transform>) -> Self {
        Self {
            name: name.into(),
            transform,
            retry: RetryPolicy::default(),
            fail_prob: 0.0,
            seed: None,
            idempotency: true,
        }
    }

    /// Builds the transform settings for a configured stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage type is not a transform.
    pub fn from_config(config: &StageConfig) -> Result<Self, ConfigurationError> {
        Ok(Self::new(config.display_name(), build_transform(config)?)
            .with_retry(config.retry_policy())
            .with_fault_injection(config.fail_prob, config.rng_seed)
            .with_idempotency(config.idempotency))
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the fault-injection probability and seed.
    #[must_use]
    pub fn with_fault_injection(mut self, probability: f64, seed: Option<u64>) -> Self {
        self.fail_prob = probability;
        self.seed = seed;
        self
    }

    /// Enables or disables deduplication.
    #[must_use]
    pub fn with_idempotency(mut self, enabled: bool) -> Self {
        self.idempotency = enabled;
        self
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if !(0.0..=1.0).contains(&self.fail_prob) {
            return Err(ConfigurationError::new(format!(
                "fail_prob {} is outside [0, 1]",
                self.fail_prob
            ))
            .with_stage(&self.name));
        }
        self.retry
            .validate()
            .map_err(|e| ConfigurationError::new(e.message).with_stage(&self.name))
    }

    fn into_stage(self, input: Arc<BoundedQueue>, output: Arc<BoundedQueue>) -> Stage {
        Stage::new(self.name, input, Some(output), self.transform)
            .with_retry(self.retry)
            .with_fault_injection(self.fail_prob, self.seed)
            .with_idempotency(self.idempotency)
    }
}

impl Debug for TransformSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformSpec")
            .field("name", &self.name)
            .field("retry", &self.retry)
            .field("fail_prob", &self.fail_prob)
            .field("seed", &self.seed)
            .field("idempotency", &self.idempotency)
            .finish_non_exhaustive()
    }
}

/// Builder for creating validated pipelines.
#[derive(Debug)]
pub struct PipelineBuilder {
    name: String,
    capacity: usize,
    sample_every: u64,
    source: Option<Box<dyn Source>>,
    transforms: Vec<TransformSpec>,
    sink: Option<Box<dyn Sink>>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder with unbounded queues.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: 0,
            sample_every: DEFAULT_SAMPLE_EVERY,
            source: None,
            transforms: Vec::new(),
            sink: None,
        }
    }

    /// Creates a builder from a pipeline definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition fails validation.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigurationError> {
        validate_pipeline(config)?;

        let (first, rest) = config
            .stages
            .split_first()
            .ok_or_else(|| ConfigurationError::new("Pipeline has no stages"))?;
        let (last, middle) = rest
            .split_last()
            .ok_or_else(|| ConfigurationError::new("Pipeline has no sink"))?;

        let mut builder = Self::new(&config.name)
            .capacity(config.queues.maxsize)
            .sample_every(config.sample_every)
            .source(build_source(first)?)
            .sink(build_sink(last)?);
        for stage in middle {
            builder = builder.transform(TransformSpec::from_config(stage)?);
        }
        Ok(builder)
    }

    /// Sets the capacity of every queue. Zero means unbounded.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the queue-depth sampling interval.
    #[must_use]
    pub fn sample_every(mut self, steps: u64) -> Self {
        self.sample_every = steps;
        self
    }

    /// Sets the source.
    #[must_use]
    pub fn source(mut self, source: Box<dyn Source>) -> Self {
        self.source = Some(source);
        self
    }

    /// Appends a middle stage.
    #[must_use]
    pub fn transform(mut self, spec: TransformSpec) -> Self {
        self.transforms.push(spec);
        self
    }

    /// Sets the sink.
    #[must_use]
    pub fn sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Creates the queues `q0..qN` and wires every stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the source or sink is missing, two stages share a
    /// name, or a middle stage has an invalid retry policy or fault
    /// probability.
    pub fn build(self) -> Result<Pipeline, ConfigurationError> {
        let source = self
            .source
            .ok_or_else(|| ConfigurationError::new("Pipeline has no source"))?;
        let sink = self
            .sink
            .ok_or_else(|| ConfigurationError::new("Pipeline has no sink"))?;

        let mut names = HashSet::new();
        names.insert(source.name());
        for spec in &self.transforms {
            spec.validate()?;
            check_unique(&mut names, &spec.name)?;
        }
        check_unique(&mut names, sink.name())?;

        let capacity = self.capacity;
        let queues: Vec<Arc<BoundedQueue>> = (0..=self.transforms.len())
            .map(|i| Arc::new(BoundedQueue::new(format!("q{i}"), capacity)))
            .collect();

        let stages = self
            .transforms
            .into_iter()
            .zip(queues.windows(2))
            .map(|(spec, pair)| spec.into_stage(Arc::clone(&pair[0]), Arc::clone(&pair[1])))
            .collect();

        Ok(Pipeline::new(self.name, source, stages, sink, queues)?.with_sample_every(self.sample_every))
    }
}

fn check_unique<'a>(names: &mut HashSet<&'a str>, name: &'a str) -> Result<(), ConfigurationError> {
    if names.insert(name) {
        Ok(())
    } else {
        Err(ConfigurationError::new(format!("Duplicate stage name '{name}'")).with_stage(name))
    }
}
