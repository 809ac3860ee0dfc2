use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use flowbench::config::SAMPLE_CONFIG;

/// File name of the sample pipeline.
const SAMPLE_FILE: &str = "orders_basic.yaml";

/// Execute the `init` command: write the sample pipeline unless it exists.
///
/// Returns the path of the sample file.
pub fn execute(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let out = dir.join(SAMPLE_FILE);
    if out.exists() {
        tracing::info!(path = %out.display(), "Sample already present, leaving it unchanged");
    } else {
        std::fs::write(&out, SAMPLE_CONFIG)
            .with_context(|| format!("Failed to write {}", out.display()))?;
    }

    println!("Wrote {}", out.display());
    Ok(out)
}
