//! YAML loading with `${VAR}` environment substitution.

use std::path::Path;

use regex::Regex;
use tracing::debug;

use super::types::PipelineConfig;
use super::validator::validate_pipeline;
use crate::errors::{ConfigurationError, Result};

/// A parsed pipeline together with the raw document it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The typed configuration.
    pub config: PipelineConfig,
    /// The document as written, after substitution. Recorded in run artifacts.
    pub snapshot: serde_json::Value,
}

const ENV_VAR_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Replaces every `${VAR}` with the value of the environment variable.
///
/// # Errors
///
/// Returns an error naming the first variable that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String, ConfigurationError> {
    let pattern = Regex::new(ENV_VAR_PATTERN)
        .map_err(|e| ConfigurationError::new(format!("Invalid substitution pattern: {e}")))?;
    let mut output = String::with_capacity(input.len());
    let mut last = 0;

    for captures in pattern.captures_iter(input) {
        let (Some(whole), Some(var)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let value = std::env::var(var.as_str()).map_err(|_| {
            ConfigurationError::new(format!(
                "Environment variable '{}' is not set",
                var.as_str()
            ))
        })?;
        output.push_str(&input[last..whole.start()]);
        output.push_str(&value);
        last = whole.end();
    }
    output.push_str(&input[last..]);
    Ok(output)
}

/// Parses and validates a pipeline document.
pub fn parse_pipeline_str(yaml: &str) -> Result<LoadedConfig> {
    let resolved = substitute_env_vars(yaml)?;

    let snapshot: serde_json::Value = serde_yaml::from_str(&resolved)
        .map_err(|e| ConfigurationError::new(format!("Invalid YAML: {e}")))?;
    let config: PipelineConfig = serde_json::from_value(snapshot.clone())
        .map_err(|e| ConfigurationError::new(format!("Invalid pipeline definition: {e}")))?;

    validate_pipeline(&config)?;
    debug!(pipeline = %config.name, stages = config.stages.len(), "Parsed pipeline");

    Ok(LoadedConfig { config, snapshot })
}

/// Reads, parses and validates a pipeline file.
pub fn parse_pipeline(path: impl AsRef<Path>) -> Result<LoadedConfig> {
    let yaml = std::fs::read_to_string(path.as_ref())?;
    parse_pipeline_str(&yaml)
}
