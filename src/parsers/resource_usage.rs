//! Periodic CPU / memory sample log parser
//!
//! The sampler writes one CSV row per tick:
//! `timestamp,cpu_percent,mem_used_mb`. Only the column means are kept.

use super::{finite, read_artifact, ArtifactError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Column names holding the sampled values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceColumns {
    pub cpu: String,
    pub memory: String,
}

impl Default for ResourceColumns {
    fn default() -> Self {
        Self {
            cpu: "cpu_percent".to_string(),
            memory: "mem_used_mb".to_string(),
        }
    }
}

/// Mean utilisation over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub cpu_mean: Option<f64>,
    pub ram_mean: Option<f64>,
}

#[derive(Default)]
struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            finite(self.sum / self.count as f64)
        }
    }
}

fn cell_value(column: &str, cell: Option<&str>) -> Result<Option<f64>, ArtifactError> {
    let cell = cell.unwrap_or("").trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(Some)
        .map_err(|_| ArtifactError::InvalidNumber {
            column: column.to_string(),
            value: cell.to_string(),
        })
}

/// Parse sampler CSV text and average the CPU and memory columns
///
/// Empty cells are skipped. A non-numeric cell or an absent column fails the
/// whole log, matching how a dataframe mean would refuse the column.
pub fn parse_resource_csv(
    text: &str,
    columns: &ResourceColumns,
) -> Result<ResourceUsage, ArtifactError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ArtifactError::MissingColumn(name.to_string()))
    };
    let cpu_idx = position(&columns.cpu)?;
    let mem_idx = position(&columns.memory)?;

    let mut cpu = RunningMean::default();
    let mut mem = RunningMean::default();
    let mut rows = 0usize;

    for record in reader.records() {
        let record = record?;
        rows += 1;
        if let Some(v) = cell_value(&columns.cpu, record.get(cpu_idx))? {
            cpu.push(v);
        }
        if let Some(v) = cell_value(&columns.memory, record.get(mem_idx))? {
            mem.push(v);
        }
    }

    if rows == 0 {
        return Err(ArtifactError::Empty);
    }

    Ok(ResourceUsage {
        cpu_mean: cpu.mean(),
        ram_mean: mem.mean(),
    })
}

/// Load a sampler log, degrading every failure to all-missing values
pub fn load_resource_log(path: &Path, columns: &ResourceColumns) -> ResourceUsage {
    match read_artifact(path).and_then(|text| parse_resource_csv(&text, columns)) {
        Ok(usage) => usage,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Resource log yielded no metrics");
            ResourceUsage::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_means_of_both_columns() {
        let text = "timestamp,cpu_percent,mem_used_mb\n\
                    1700000000.1,10.0,2048.0\n\
                    1700000001.1,20.0,2050.0\n\
                    1700000002.1,30.0,2052.0\n";
        let usage = parse_resource_csv(text, &ResourceColumns::default()).unwrap();
        assert_eq!(usage.cpu_mean, Some(20.0));
        assert_eq!(usage.ram_mean, Some(2050.0));
    }

    #[test]
    fn test_empty_cells_are_skipped() {
        let text = "timestamp,cpu_percent,mem_used_mb\n1,10,\n2,,100\n3,30,300\n";
        let usage = parse_resource_csv(text, &ResourceColumns::default()).unwrap();
        assert_eq!(usage.cpu_mean, Some(20.0));
        assert_eq!(usage.ram_mean, Some(200.0));
    }

    #[test]
    fn test_header_only_is_empty() {
        let text = "timestamp,cpu_percent,mem_used_mb\n";
        assert!(matches!(
            parse_resource_csv(text, &ResourceColumns::default()),
            Err(ArtifactError::Empty)
        ));
    }

    #[test]
    fn test_missing_column_fails() {
        let text = "timestamp,cpu\n1,10\n";
        assert!(matches!(
            parse_resource_csv(text, &ResourceColumns::default()),
            Err(ArtifactError::MissingColumn(col)) if col == "cpu_percent"
        ));
    }

    #[test]
    fn test_garbage_cell_fails_whole_log() {
        let text = "timestamp,cpu_percent,mem_used_mb\n1,10,100\n2,oops,100\n";
        assert!(matches!(
            parse_resource_csv(text, &ResourceColumns::default()),
            Err(ArtifactError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_custom_column_names() {
        let columns = ResourceColumns {
            cpu: "cpu".to_string(),
            memory: "rss".to_string(),
        };
        let usage = parse_resource_csv("cpu,rss\n50,10\n", &columns).unwrap();
        assert_eq!(usage.cpu_mean, Some(50.0));
        assert_eq!(usage.ram_mean, Some(10.0));
    }
}
