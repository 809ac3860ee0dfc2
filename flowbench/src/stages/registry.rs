//! Maps configured stage types to plugin instances.

use super::ingest::DEFAULT_INGEST_SEED;
use super::sink::DEFAULT_SINK_LIMIT;
use super::{AddTotal, ConsoleSink, OrdersIngest, Sink, Source, Transform, ValidateOrder};
use crate::config::{StageConfig, StageType};
use crate::errors::ConfigurationError;

fn wrong_role(config: &StageConfig, role: &str) -> ConfigurationError {
    ConfigurationError::new(format!(
        "Stage type {} is not a {role}",
        config.kind.as_str()
    ))
    .with_stage(config.display_name())
}

/// Builds the source plugin for `config`.
///
/// # Errors
///
/// Returns an error if the type is not a source.
pub fn build_source(config: &StageConfig) -> Result<Box<dyn Source>, ConfigurationError> {
    match config.kind {
        StageType::OrdersIngest => Ok(Box::new(OrdersIngest::new(
            config.display_name(),
            config.rng_seed.unwrap_or(DEFAULT_INGEST_SEED),
        ))),
        _ => Err(wrong_role(config, "source")),
    }
}

/// Builds the transformation for `config`.
///
/// Retry, fault injection and deduplication are applied by the stage runner,
/// not here.
///
/// # Errors
///
/// Returns an error if the type is not a transform.
pub fn build_transform(config: &StageConfig) -> Result<Box<dyn Transform>, ConfigurationError> {
    match config.kind {
        StageType::AddTotal => Ok(Box::new(AddTotal::new())),
        StageType::ValidateOrder => Ok(Box::new(
            config
                .required
                .clone()
                .map(ValidateOrder::new)
                .unwrap_or_default(),
        )),
        _ => Err(wrong_role(config, "transform")),
    }
}

/// Builds the sink plugin for `config`.
///
/// # Errors
///
/// Returns an error if the type is not a sink.
pub fn build_sink(config: &StageConfig) -> Result<Box<dyn Sink>, ConfigurationError> {
    match config.kind {
        StageType::StdoutSink => Ok(Box::new(ConsoleSink::stdout(
            config.display_name(),
            config.limit.unwrap_or(DEFAULT_SINK_LIMIT),
        ))),
        _ => Err(wrong_role(config, "sink")),
    }
}
