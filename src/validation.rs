// Validity Filter
// Separates records usable for aggregation from records that are not, keeping
// the rejected ones with an auditable reason instead of dropping them.

use crate::record::RunRecord;
use crate::types::InvalidReason;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A record excluded from aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidRecord {
    pub record: RunRecord,
    pub reason: InvalidReason,
}

/// Result of filtering a record table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidityPartition {
    pub valid: Vec<RunRecord>,
    pub invalid: Vec<InvalidRecord>,
}

impl ValidityPartition {
    pub fn total(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }

    /// Invalid record count per reason, in priority order
    pub fn reason_counts(&self) -> Vec<(InvalidReason, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for invalid in &self.invalid {
            *counts.entry(invalid.reason).or_insert(0usize) += 1;
        }
        counts.into_iter().collect()
    }
}

/// NaN and infinities count as missing, the same as an empty cell
fn is_missing(value: Option<f64>) -> bool {
    value.map_or(true, |v| !v.is_finite())
}

/// Why a record is invalid, or `None` when it may be aggregated
///
/// Conditions are checked in priority order and the first that holds wins:
/// missing throughput, non-positive throughput, missing CPU, non-positive CPU.
pub fn invalid_reason(record: &RunRecord) -> Option<InvalidReason> {
    if is_missing(record.throughput_mbps) {
        Some(InvalidReason::ThroughputNan)
    } else if record.throughput_mbps.is_some_and(|t| t <= 0.0) {
        Some(InvalidReason::ThroughputZeroOrNeg)
    } else if is_missing(record.cpu_mean) {
        Some(InvalidReason::CpuNan)
    } else if record.cpu_mean.is_some_and(|c| c <= 0.0) {
        Some(InvalidReason::CpuZeroOrNeg)
    } else {
        None
    }
}

/// Split records into valid and invalid sets; every record lands in exactly one
pub fn partition_by_validity(records: Vec<RunRecord>) -> ValidityPartition {
    let mut partition = ValidityPartition::default();

    for record in records {
        match invalid_reason(&record) {
            None => partition.valid.push(record),
            Some(reason) => {
                debug!(path = %record.path, %reason, "Record rejected");
                partition.invalid.push(InvalidRecord { record, reason });
            }
        }
    }

    info!(
        valid = partition.valid.len(),
        invalid = partition.invalid.len(),
        "Validity filter applied"
    );
    partition
}
