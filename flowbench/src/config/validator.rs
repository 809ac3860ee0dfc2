//! Structural checks on a pipeline definition.

use std::collections::HashSet;

use super::types::{PipelineConfig, StageRole};
use crate::errors::ConfigurationError;

/// Checks that `config` describes a runnable pipeline.
///
/// # Errors
///
/// Returns the first problem found: fewer than two stages, a misplaced
/// source, sink or transform, a duplicate stage name, a fault probability
/// outside `[0, 1]`, or an invalid retry policy.
pub fn validate_pipeline(config: &PipelineConfig) -> Result<(), ConfigurationError> {
    let stages = &config.stages;
    if stages.len() < 2 {
        return Err(ConfigurationError::new(
            "A pipeline needs at least a source and a sink",
        ));
    }

    let last = stages.len() - 1;
    let mut names = HashSet::new();

    for (index, stage) in stages.iter().enumerate() {
        let name = stage.display_name();
        let expected = match index {
            0 => StageRole::Source,
            i if i == last => StageRole::Sink,
            _ => StageRole::Transform,
        };

        if stage.kind.role() != expected {
            return Err(ConfigurationError::new(format!(
                "Stage '{name}' of type {} cannot be used as a {expected:?} (position {index})",
                stage.kind.as_str()
            ))
            .with_stage(name));
        }

        if !names.insert(name) {
            return Err(
                ConfigurationError::new(format!("Duplicate stage name '{name}'")).with_stage(name),
            );
        }

        if !(0.0..=1.0).contains(&stage.fail_prob) {
            return Err(ConfigurationError::new(format!(
                "fail_prob {} is outside [0, 1]",
                stage.fail_prob
            ))
            .with_stage(name));
        }

        if let Some(retry) = &stage.retry {
            retry
                .validate()
                .map_err(|e| ConfigurationError::new(e.message).with_stage(name))?;
        }
    }

    Ok(())
}
