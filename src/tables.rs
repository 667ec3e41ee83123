//! CSV output tables
//!
//! Every table is written whole: the file is truncated, the header row is
//! always present, missing values are empty cells and floats use Rust's
//! shortest round-trip formatting, so re-running over the same input
//! rewrites byte-identical files.

use crate::aggregate::AggregateGroup;
use crate::comparison::ComparisonRow;
use crate::record::{Metric, RunRecord};
use crate::validation::InvalidRecord;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

/// A type that renders as one CSV row under a fixed header
pub trait TableRow {
    fn header() -> Vec<String>;
    fn cells(&self) -> Vec<String>;
}

/// Cell text for an optional float; NaN and infinities are written empty
pub fn float_cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v}"),
        _ => String::new(),
    }
}

fn text_cell(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

const RECORD_COLUMNS: [&str; 14] = [
    "role",
    "env",
    "nic_mode",
    "qos",
    "direction",
    "pod_config",
    "throughput_mbps",
    "retransmits",
    "latency_ms",
    "packet_loss_pct",
    "jitter_ms",
    "cpu_mean",
    "ram_mean",
    "path",
];

impl TableRow for RunRecord {
    fn header() -> Vec<String> {
        RECORD_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.role.to_string(),
            self.env.to_string(),
            self.nic_mode.clone(),
            self.qos.to_string(),
            self.direction.to_string(),
            self.pod_config.clone(),
        ];
        cells.extend(Metric::ALL.iter().map(|&m| float_cell(self.metric(m))));
        cells.push(self.path.clone());
        cells
    }
}

impl TableRow for InvalidRecord {
    fn header() -> Vec<String> {
        let mut header = RunRecord::header();
        header.push("invalid_reason".to_string());
        header
    }

    fn cells(&self) -> Vec<String> {
        let mut cells = self.record.cells();
        cells.push(self.reason.to_string());
        cells
    }
}

const STAT_SUFFIXES: [&str; 4] = ["mean", "std", "count", "sem"];

impl TableRow for AggregateGroup {
    fn header() -> Vec<String> {
        let mut header: Vec<String> = [
            "env",
            "nic_mode",
            "qos",
            "direction",
            "pod_config",
            "is_fair",
            "network_type",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();

        for metric in Metric::ALL {
            for suffix in STAT_SUFFIXES {
                header.push(format!("{}_{suffix}", metric.column()));
            }
        }
        for metric in Metric::WITH_CV {
            header.push(format!("{}_cv", metric.column()));
        }
        header.extend(
            ["cpu_per_mbps", "throughput_norm", "qos_effect_pct"]
                .iter()
                .map(|c| c.to_string()),
        );
        header
    }

    fn cells(&self) -> Vec<String> {
        let key = &self.key;
        let mut cells = vec![
            key.env.to_string(),
            key.nic_mode.clone(),
            key.qos.to_string(),
            key.direction.to_string(),
            key.pod_config.clone(),
            key.is_fair.to_string(),
            key.network_type.to_string(),
        ];

        for metric in Metric::ALL {
            let stats = self.stat(metric);
            cells.push(float_cell(stats.mean));
            cells.push(float_cell(stats.std));
            cells.push(stats.count.to_string());
            cells.push(float_cell(stats.sem));
        }
        for metric in Metric::WITH_CV {
            cells.push(float_cell(self.cv(metric)));
        }
        cells.push(float_cell(self.cpu_per_mbps));
        cells.push(float_cell(self.throughput_norm));
        cells.push(float_cell(self.qos_effect_pct));
        cells
    }
}

impl TableRow for ComparisonRow {
    fn header() -> Vec<String> {
        [
            "category",
            "env",
            "nic_mode",
            "qos",
            "pod_config",
            "sample_count",
            "throughput_mbps_mean",
            "latency_ms_mean",
            "jitter_ms_mean",
            "cpu_mean_mean",
            "cpu_per_mbps",
            "qos_effect_pct",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.category.to_string(),
            self.env.to_string(),
            text_cell(self.nic_mode.as_deref()),
            self.qos.as_ref().map(|q| q.to_string()).unwrap_or_default(),
            text_cell(self.pod_config.as_deref()),
            self.sample_count.to_string(),
            float_cell(self.throughput_mbps_mean),
            float_cell(self.latency_ms_mean),
            float_cell(self.jitter_ms_mean),
            float_cell(self.cpu_mean_mean),
            float_cell(self.cpu_per_mbps),
            float_cell(self.qos_effect_pct),
        ]
    }
}

/// Write `rows` to `path`, replacing any previous file
pub fn write_table<R: TableRow>(path: &Path, rows: &[R]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;
    writer
        .write_record(R::header())
        .with_context(|| format!("Failed to write header to {}", path.display()))?;
    for row in rows {
        writer
            .write_record(row.cells())
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    debug!(path = %path.display(), rows = rows.len(), "Table written");
    Ok(())
}

/// Read every row of a headered table, matching columns by name
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open table {}", path.display()))?;
    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("Bad row {} in {}", i + 1, path.display())))
        .collect()
}

/// Read a record table written by [`write_table`]
pub fn read_records(path: &Path) -> Result<Vec<RunRecord>> {
    read_rows(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::RunRecordBuilder;
    use crate::parsers::{PingStats, ThroughputResult};
    use crate::types::{InvalidReason, Role};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_record() -> RunRecord {
        RunRecordBuilder::new(Role::Client)
            .throughput(ThroughputResult {
                throughput_mbps: Some(94.2),
                retransmits: Some(3.0),
            })
            .ping(PingStats {
                latency_ms: Some(0.25),
                packet_loss_pct: None,
                jitter_ms: Some(f64::NAN),
            })
            .path("runs/1. NATIVE/CLIENT/run_1")
            .build()
            .unwrap()
    }

    #[test]
    fn test_float_cells() {
        assert_eq!(float_cell(Some(94.2)), "94.2");
        assert_eq!(float_cell(Some(100.0)), "100");
        assert_eq!(float_cell(None), "");
        assert_eq!(float_cell(Some(f64::INFINITY)), "");
    }

    #[test]
    fn test_record_row_matches_header() {
        let record = sample_record();
        let cells = record.cells();
        assert_eq!(cells.len(), RunRecord::header().len());
        assert_eq!(cells[0], "client");
        assert_eq!(cells[6], "94.2");
        assert_eq!(cells[9], "");
        assert_eq!(cells[10], "");
    }

    #[test]
    fn test_invalid_header_extends_record_header() {
        let header = InvalidRecord::header();
        assert_eq!(header.last().map(String::as_str), Some("invalid_reason"));
        assert_eq!(header.len(), RECORD_COLUMNS.len() + 1);

        let invalid = InvalidRecord {
            record: sample_record(),
            reason: InvalidReason::CpuNan,
        };
        assert_eq!(invalid.cells().last().map(String::as_str), Some("cpu_nan"));
    }

    #[test]
    fn test_grouped_header_layout() {
        let header = AggregateGroup::header();
        assert_eq!(header.len(), 7 + 7 * 4 + 4 + 3);
        assert_eq!(header[7], "throughput_mbps_mean");
        assert_eq!(header[10], "throughput_mbps_sem");
        assert!(header.contains(&"cpu_mean_cv".to_string()));
        assert_eq!(header.last().map(String::as_str), Some("qos_effect_pct"));
    }

    #[test]
    fn test_empty_table_still_has_header() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join("invalid_records.csv");
        write_table::<InvalidRecord>(&path, &[]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("role,env,nic_mode"));
    }

    #[test]
    fn test_records_read_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("records.csv");
        let record = sample_record();
        write_table(&path, std::slice::from_ref(&record)).unwrap();
        // Overwrite rather than append
        write_table(&path, std::slice::from_ref(&record)).unwrap();

        let back = read_records(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].throughput_mbps, Some(94.2));
        assert_eq!(back[0].jitter_ms, None);
        assert_eq!(back[0].env, record.env);
        assert_eq!(back[0].path, record.path);
    }
}
