//! Throughput benchmark result parser
//!
//! Result files are iperf3-style JSON. Interrupted or repeated runs can leave
//! several top-level objects concatenated in one file; only the last one is
//! read.

use super::{finite, read_artifact, ArtifactError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

static OBJECT_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\}\s*\{").expect("Failed to compile object boundary regex"));

const BITS_PER_MEGABIT: f64 = 1e6;

/// Aggregate figures from the `end` summary of a result document
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThroughputResult {
    pub throughput_mbps: Option<f64>,
    pub retransmits: Option<f64>,
}

/// Keep only the last complete top-level object of a concatenated document
fn last_object(text: &str) -> String {
    let trimmed = text.trim();
    match OBJECT_BOUNDARY.split(trimmed).last() {
        Some(fragment) if fragment.len() != trimmed.len() => format!("{{{fragment}"),
        _ => trimmed.to_string(),
    }
}

fn non_empty_object<'a>(value: Option<&'a Value>) -> Option<&'a Value> {
    value.filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
}

/// Parse result JSON text into throughput and retransmit figures
///
/// `end.sum_sent` is preferred; `end.sum` is the fallback for UDP and
/// receiver-side documents.
pub fn parse_throughput_json(text: &str) -> Result<ThroughputResult, ArtifactError> {
    if text.trim().is_empty() {
        return Err(ArtifactError::Empty);
    }

    let document: Value = serde_json::from_str(&last_object(text))?;
    let end = document.get("end");
    let summary = non_empty_object(end.and_then(|e| e.get("sum_sent")))
        .or_else(|| non_empty_object(end.and_then(|e| e.get("sum"))));

    let Some(summary) = summary else {
        return Ok(ThroughputResult::default());
    };

    Ok(ThroughputResult {
        throughput_mbps: summary
            .get("bits_per_second")
            .and_then(Value::as_f64)
            .map(|bps| bps / BITS_PER_MEGABIT)
            .and_then(finite),
        retransmits: summary
            .get("retransmits")
            .and_then(Value::as_f64)
            .and_then(finite),
    })
}

/// Load a result document, degrading every failure to an empty result
pub fn load_throughput_result(path: &Path) -> ThroughputResult {
    match read_artifact(path).and_then(|text| parse_throughput_json(&text)) {
        Ok(result) => result,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Throughput result yielded no metrics");
            ThroughputResult::default()
        }
    }
}
