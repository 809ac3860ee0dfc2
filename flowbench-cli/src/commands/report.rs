use std::path::Path;

use anyhow::{Context, Result};

use flowbench::core::RunArtifact;

/// Execute the `report` command: print a saved run artifact.
pub fn execute(run_path: &Path) -> Result<()> {
    let artifact = RunArtifact::load(run_path)
        .with_context(|| format!("Failed to read run artifact: {}", run_path.display()))?;
    print!("{}", artifact.render_report());
    Ok(())
}
