//! Configuration types.

use serde::{Deserialize, Serialize};

use crate::pipeline::RetryPolicy;

/// A ready-to-run example pipeline definition.
pub const SAMPLE_CONFIG: &str = "\
name: orders_basic
queues:
  maxsize: 200
stages:
  - type: orders_ingest
    name: ingest_orders
    rng_seed: 123
  - type: add_total
    name: add_total
    fail_prob: 0.01
    retry:
      max_attempts: 3
      base_delay_s: 0.01
      backoff: 2
  - type: validate_order
    name: validate
    fail_prob: 0.005
    retry:
      max_attempts: 2
      base_delay_s: 0.01
      backoff: 2
  - type: stdout_sink
    name: sink
    limit: 5
";

fn default_pipeline_name() -> String {
    "pipeline".to_string()
}

const fn default_sample_every() -> u64 {
    50
}

const fn default_true() -> bool {
    true
}

/// Top-level pipeline definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name, recorded in run artifacts.
    #[serde(default = "default_pipeline_name")]
    pub name: String,
    /// Settings shared by every queue.
    #[serde(default)]
    pub queues: QueueConfig,
    /// Take a queue-depth snapshot every this many stage steps.
    #[serde(default = "default_sample_every")]
    pub sample_every: u64,
    /// Stages in pipeline order: a source, transforms, then a sink.
    pub stages: Vec<StageConfig>,
}

/// Queue settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Capacity of each queue; zero means unbounded.
    #[serde(default)]
    pub maxsize: usize,
}

/// Built-in stage types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    /// Random order generator.
    OrdersIngest,
    /// Computes order totals.
    AddTotal,
    /// Validates order fields.
    ValidateOrder,
    /// Prints payloads to standard output.
    StdoutSink,
}

/// Position a stage type may take in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageRole {
    /// First stage.
    Source,
    /// Any middle stage.
    Transform,
    /// Last stage.
    Sink,
}

impl StageType {
    /// The configuration name of the type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrdersIngest => "orders_ingest",
            Self::AddTotal => "add_total",
            Self::ValidateOrder => "validate_order",
            Self::StdoutSink => "stdout_sink",
        }
    }

    /// The pipeline position this type can fill.
    #[must_use]
    pub fn role(self) -> StageRole {
        match self {
            Self::OrdersIngest => StageRole::Source,
            Self::AddTotal | Self::ValidateOrder => StageRole::Transform,
            Self::StdoutSink => StageRole::Sink,
        }
    }
}

/// One stage entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// The stage type.
    #[serde(rename = "type")]
    pub kind: StageType,
    /// Stage name; defaults to the type name.
    #[serde(default)]
    pub name: Option<String>,
    /// Probability of an injected failure per attempt.
    #[serde(default)]
    pub fail_prob: f64,
    /// Retry policy for transform stages.
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
    /// Seed for the stage's random source.
    #[serde(default)]
    pub rng_seed: Option<u64>,
    /// Skip events already processed by this stage in the run.
    #[serde(default = "default_true")]
    pub idempotency: bool,
    /// Print limit for sinks.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Required fields for validators.
    #[serde(default)]
    pub required: Option<Vec<String>>,
}

impl StageConfig {
    /// Creates an entry with default settings.
    #[must_use]
    pub fn new(kind: StageType) -> Self {
        Self {
            kind,
            name: None,
            fail_prob: 0.0,
            retry: None,
            rng_seed: None,
            idempotency: true,
            limit: None,
            required: None,
        }
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the fault-injection probability.
    #[must_use]
    pub fn with_fail_prob(mut self, fail_prob: f64) -> Self {
        self.fail_prob = fail_prob;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Sets the sink print limit.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The effective stage name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.kind.as_str())
    }

    /// The effective retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.unwrap_or_default()
    }
}
