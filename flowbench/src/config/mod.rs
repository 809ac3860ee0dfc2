//! Declarative pipeline configuration.
//!
//! Pipelines are described in YAML:
//!
//! ```yaml
//! name: orders_basic
//! queues:
//!   maxsize: 200
//! stages:
//!   - type: orders_ingest
//!     rng_seed: 123
//!   - type: add_total
//!     fail_prob: 0.01
//!     retry: { max_attempts: 3, base_delay_s: 0.01, backoff: 2 }
//!   - type: stdout_sink
//!     limit: 5
//! ```

mod parser;
mod types;
mod validator;

pub use parser::{parse_pipeline, parse_pipeline_str, substitute_env_vars, LoadedConfig};
pub use types::{PipelineConfig, QueueConfig, StageConfig, StageRole, StageType, SAMPLE_CONFIG};
pub use validator::validate_pipeline;
