use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use flowbench::config::parse_pipeline;
use flowbench::pipeline::{PipelineBuilder, HARD_FAIL_COUNTER};

/// Execute the `run` command: build, run and persist a pipeline run.
///
/// Returns the path of the saved artifact. A failed run writes nothing.
pub async fn execute(pipeline_path: &Path, max_events: usize, runs_dir: &Path) -> Result<PathBuf> {
    // 1. Parse and validate
    let loaded = parse_pipeline(pipeline_path)
        .with_context(|| format!("Failed to parse pipeline: {}", pipeline_path.display()))?;

    // 2. Build
    let mut pipeline = PipelineBuilder::from_config(&loaded.config)?.build()?;

    tracing::info!(
        pipeline = %loaded.config.name,
        stages = loaded.config.stages.len(),
        max_events,
        "Pipeline validated"
    );

    // 3. Run
    let artifact = match pipeline.run(max_events).await {
        Ok(artifact) => artifact.with_config_snapshot(loaded.snapshot),
        Err(err) => {
            if let Some(aborted) = err.aborted_run() {
                eprintln!("Run {} failed: {}", aborted.run_id, aborted.cause);
                for (name, value) in &aborted.metrics.counters {
                    if name == HARD_FAIL_COUNTER || name.ends_with(".failed") {
                        eprintln!("  {name}: {value}");
                    }
                }
            }
            return Err(anyhow::Error::new(err).context("Pipeline run failed"));
        }
    };

    // 4. Persist
    let out = runs_dir.join(format!("{}.json", artifact.run_id));
    artifact
        .save(&out)
        .with_context(|| format!("Failed to save run artifact: {}", out.display()))?;

    println!("Run saved: {}", out.display());
    println!("Summary: {}", serde_json::to_string(&artifact.metrics)?);
    Ok(out)
}
