//! The persisted record of a completed run.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::metrics::{LatencySummary, MetricsSummary};
use crate::utils::{now_utc, unix_seconds};

/// Immutable summary of one successful run.
///
/// Serializes to
/// `{run_id, pipeline_name, created_ts, metrics, config_snapshot}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunArtifact {
    /// The run identifier.
    pub run_id: String,
    /// The pipeline name.
    pub pipeline_name: String,
    /// Creation time, seconds since the Unix epoch.
    pub created_ts: f64,
    /// The final metrics.
    pub metrics: MetricsSummary,
    /// The pipeline definition the run was built from. Empty until attached.
    #[serde(default = "empty_snapshot")]
    pub config_snapshot: serde_json::Value,
}

fn empty_snapshot() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl RunArtifact {
    /// Creates an artifact with an empty config snapshot.
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        pipeline_name: impl Into<String>,
        metrics: MetricsSummary,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            pipeline_name: pipeline_name.into(),
            created_ts: unix_seconds(now_utc()),
            metrics,
            config_snapshot: empty_snapshot(),
        }
    }

    /// Attaches the pipeline definition.
    #[must_use]
    pub fn with_config_snapshot(mut self, snapshot: serde_json::Value) -> Self {
        self.config_snapshot = snapshot;
        self
    }

    /// Writes the artifact as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reads an artifact written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Formats a human-readable report.
    #[must_use]
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Pipeline: {}", self.pipeline_name);
        let _ = writeln!(out, "Run ID:   {}", self.run_id);
        let _ = writeln!(out, "Duration: {:.3}s", self.metrics.duration_s);
        let _ = writeln!(out, "Counters:");
        for (name, value) in &self.metrics.counters {
            let _ = writeln!(out, "  {name}: {value}");
        }
        let _ = writeln!(out, "Latency(ms): {}", format_latency(&self.metrics.latency_ms));
        out
    }
}

fn format_latency(latency: &LatencySummary) -> String {
    let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
    format!(
        "count={} p50={} p95={} mean={}",
        latency.count,
        fmt(latency.p50),
        fmt(latency.p95),
        fmt(latency.mean)
    )
}
