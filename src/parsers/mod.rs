// Artifact Parsers
// One parser per raw artifact a run leaves behind. Every parser returns
// Result<T, ArtifactError> so "could not parse" stays a value the caller can
// inspect; the `load_*` helpers turn that into all-missing metrics.

pub mod ping;
pub mod resource_usage;
pub mod throughput;

pub use ping::{load_ping_log, parse_ping_text, PingStats};
pub use resource_usage::{load_resource_log, parse_resource_csv, ResourceColumns, ResourceUsage};
pub use throughput::{load_throughput_result, parse_throughput_json, ThroughputResult};

use std::path::{Path, PathBuf};

/// Reasons an artifact yields no metrics
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("artifact is empty")]
    Empty,

    #[error("artifact content not recognized")]
    Unrecognized,

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("invalid number {value:?} in column {column}")]
    InvalidNumber { column: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Read an artifact as text, mapping absence and emptiness to their own errors
pub(crate) fn read_artifact(path: &Path) -> Result<String, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    if text.trim().is_empty() {
        return Err(ArtifactError::Empty);
    }
    Ok(text)
}

/// Drop NaN and infinities so they surface as missing
pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
