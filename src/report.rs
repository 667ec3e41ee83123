//! Validation report over the produced tables
//!
//! Read-only diagnostics: counts, distributions, normalization sanity checks
//! and a short list of data-quality recommendations. Building the report never
//! fails on empty tables; only unreadable files are errors.

use crate::comparison::{ComparisonCategory, ComparisonRow};
use crate::config::PipelineConfig;
use crate::pure::statistics::{mean_of, median, sample_stats, SampleStats};
use crate::record::RunRecord;
use crate::tables::{read_records, read_rows};
use crate::types::{Environment, InvalidReason, NetworkType, QosLevel};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const QOS_SAMPLE_ROWS: usize = 10;
const LATENCY_CEILING_MS: f64 = 10_000.0;
const CPU_CEILING_PCT: f64 = 100.0;
const HIGH_CV_PCT: f64 = 50.0;
const UNSTABLE_CV_PCT: f64 = 30.0;
const INVALID_RATE_LIMIT_PCT: f64 = 10.0;

/// Columns of the grouped table the report looks at
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroupedRow {
    pub env: Environment,
    pub qos: QosLevel,
    pub network_type: NetworkType,
    pub throughput_mbps_mean: Option<f64>,
    pub throughput_mbps_cv: Option<f64>,
    pub throughput_norm: Option<f64>,
}

/// Columns of the invalid table the report looks at
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InvalidRow {
    pub env: Environment,
    pub invalid_reason: InvalidReason,
}

/// Location summary of one metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distribution {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl Distribution {
    pub fn of(values: &[f64]) -> Option<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        Some(Self {
            mean: mean_of(finite.iter().copied())?,
            median: median(&finite)?,
            min: finite.iter().copied().fold(f64::INFINITY, f64::min),
            max: finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Normalized throughput of one group
#[derive(Debug, Clone, PartialEq)]
pub struct NormEntry {
    pub env: Environment,
    pub qos: QosLevel,
    pub throughput_norm: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QualityChecks {
    pub checked_records: usize,
    pub positive_throughput: usize,
    pub reasonable_latency: usize,
    pub plausible_cpu: usize,
    pub groups: usize,
    pub high_cv_groups: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub client_records: usize,
    pub groups: usize,
    pub comparison_rows: usize,
    pub invalid_records: usize,
    pub runs_per_env: BTreeMap<Environment, usize>,
    pub runs_per_env_qos: BTreeMap<(Environment, QosLevel), usize>,
    pub throughput: Option<Distribution>,
    pub noqos_throughput_by_env: BTreeMap<Environment, SampleStats>,
    pub latency: Option<Distribution>,
    pub network_types: BTreeMap<NetworkType, usize>,
    pub network_types_by_env: BTreeMap<Environment, BTreeSet<NetworkType>>,
    pub normalized_groups: usize,
    pub noqos_norms: Vec<NormEntry>,
    pub qos_norm_sample: Vec<NormEntry>,
    pub invalid_reasons: BTreeMap<InvalidReason, usize>,
    pub invalid_by_env: BTreeMap<Environment, usize>,
    pub comparison_by_category: BTreeMap<ComparisonCategory, usize>,
    pub quality: QualityChecks,
    pub recommendations: Vec<String>,
}

fn tally<K: Ord, I: IntoIterator<Item = K>>(keys: I) -> BTreeMap<K, usize> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

impl ValidationReport {
    /// Build the report from tables already in memory
    pub fn from_tables(
        client: &[RunRecord],
        grouped: &[GroupedRow],
        comparison: &[ComparisonRow],
        invalid: &[InvalidRow],
    ) -> Self {
        let throughputs: Vec<f64> = client.iter().filter_map(|r| r.throughput_mbps).collect();
        let latencies: Vec<f64> = client.iter().filter_map(|r| r.latency_ms).collect();

        let mut noqos_by_env: BTreeMap<Environment, Vec<Option<f64>>> = BTreeMap::new();
        for record in client.iter().filter(|r| r.qos.is_noqos()) {
            noqos_by_env.entry(record.env).or_default().push(record.throughput_mbps);
        }

        let mut network_types_by_env: BTreeMap<Environment, BTreeSet<NetworkType>> = BTreeMap::new();
        for row in grouped {
            network_types_by_env.entry(row.env).or_default().insert(row.network_type);
        }

        let normalized: Vec<NormEntry> = grouped
            .iter()
            .filter_map(|row| {
                row.throughput_norm.map(|throughput_norm| NormEntry {
                    env: row.env,
                    qos: row.qos.clone(),
                    throughput_norm,
                })
            })
            .collect();

        let quality = QualityChecks {
            checked_records: client.len(),
            positive_throughput: client
                .iter()
                .filter(|r| r.throughput_mbps.is_some_and(|t| t > 0.0))
                .count(),
            reasonable_latency: client
                .iter()
                .filter(|r| r.latency_ms.is_some_and(|l| (0.0..LATENCY_CEILING_MS).contains(&l)))
                .count(),
            plausible_cpu: client
                .iter()
                .filter(|r| r.cpu_mean.is_some_and(|c| c <= CPU_CEILING_PCT))
                .count(),
            groups: grouped.len(),
            high_cv_groups: grouped
                .iter()
                .filter(|g| g.throughput_mbps_cv.is_some_and(|cv| cv > HIGH_CV_PCT))
                .count(),
        };

        let mut report = Self {
            client_records: client.len(),
            groups: grouped.len(),
            comparison_rows: comparison.len(),
            invalid_records: invalid.len(),
            runs_per_env: tally(client.iter().map(|r| r.env)),
            runs_per_env_qos: tally(client.iter().map(|r| (r.env, r.qos.clone()))),
            throughput: Distribution::of(&throughputs),
            noqos_throughput_by_env: noqos_by_env
                .into_iter()
                .map(|(env, values)| (env, sample_stats(values)))
                .collect(),
            latency: Distribution::of(&latencies),
            network_types: tally(grouped.iter().map(|g| g.network_type)),
            network_types_by_env,
            normalized_groups: normalized.len(),
            noqos_norms: normalized.iter().cloned().filter(|n| n.qos.is_noqos()).collect(),
            qos_norm_sample: normalized
                .iter()
                .cloned()
                .filter(|n| !n.qos.is_noqos())
                .take(QOS_SAMPLE_ROWS)
                .collect(),
            invalid_reasons: tally(invalid.iter().map(|i| i.invalid_reason)),
            invalid_by_env: tally(invalid.iter().map(|i| i.env)),
            comparison_by_category: tally(comparison.iter().map(|c| c.category)),
            quality,
            recommendations: Vec::new(),
        };
        report.recommendations = report.recommend(grouped, client);
        report
    }

    fn recommend(&self, grouped: &[GroupedRow], client: &[RunRecord]) -> Vec<String> {
        let mut issues = Vec::new();

        let invalid_rate = percent(self.invalid_records, self.client_records + self.invalid_records);
        if invalid_rate > INVALID_RATE_LIMIT_PCT {
            issues.push(format!(
                "High invalid rate ({invalid_rate:.1}%), review the measurement procedure"
            ));
        }

        let unstable = grouped
            .iter()
            .filter(|g| g.throughput_mbps_cv.is_some_and(|cv| cv > UNSTABLE_CV_PCT))
            .count();
        if unstable > 0 {
            issues.push(format!(
                "{unstable} groups have throughput CV above {UNSTABLE_CV_PCT}%, runs are unstable"
            ));
        }

        let missing_latency = client.iter().filter(|r| r.latency_ms.is_none()).count();
        if missing_latency > 0 {
            issues.push(format!("{missing_latency} records have no latency data"));
        }

        issues
    }

    /// Read the client, grouped, comparison and invalid tables from the
    /// output directory; a missing invalid table counts as empty
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let outputs = &config.outputs;
        let client = read_records(&config.output_path(&outputs.client_records))
            .context("Failed to read client record table")?;
        let grouped: Vec<GroupedRow> = read_rows(&config.output_path(&outputs.grouped))
            .context("Failed to read grouped table")?;
        let comparison: Vec<ComparisonRow> = read_rows(&config.output_path(&outputs.comparison))
            .context("Failed to read comparison table")?;

        let invalid_path = config.output_path(&outputs.invalid_records);
        let invalid: Vec<InvalidRow> = if invalid_path.exists() {
            read_rows(&invalid_path).context("Failed to read invalid record table")?
        } else {
            Vec::new()
        };

        Ok(Self::from_tables(&client, &grouped, &comparison, &invalid))
    }
}

fn write_distribution(f: &mut fmt::Formatter<'_>, dist: Option<&Distribution>) -> fmt::Result {
    match dist {
        Some(d) => {
            writeln!(f, "   - Mean: {:.2}", d.mean)?;
            writeln!(f, "   - Median: {:.2}", d.median)?;
            writeln!(f, "   - Min: {:.2}", d.min)?;
            writeln!(f, "   - Max: {:.2}", d.max)
        }
        None => writeln!(f, "   - no data"),
    }
}

fn opt2(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(80);
        writeln!(f, "{rule}")?;
        writeln!(f, "VALIDATION REPORT")?;
        writeln!(f, "{rule}")?;

        writeln!(f, "\n1. RECORD COUNTS")?;
        writeln!(f, "   - Client records: {}", self.client_records)?;
        writeln!(f, "   - Groups: {}", self.groups)?;
        writeln!(f, "   - Comparison rows: {}", self.comparison_rows)?;
        writeln!(f, "   - Invalid records: {}", self.invalid_records)?;

        writeln!(f, "\n2. RUNS PER ENVIRONMENT")?;
        for (env, count) in &self.runs_per_env {
            writeln!(f, "   - {env}: {count} runs")?;
        }

        writeln!(f, "\n3. RUNS PER QOS LEVEL")?;
        for ((env, qos), count) in &self.runs_per_env_qos {
            writeln!(f, "   - {:12} / {:10}: {:3} runs", env.as_str(), qos.to_string(), count)?;
        }

        writeln!(f, "\n4. THROUGHPUT (Mbps)")?;
        write_distribution(f, self.throughput.as_ref())?;
        writeln!(f, "\n   By environment (NOQOS only):")?;
        for (env, stats) in &self.noqos_throughput_by_env {
            writeln!(
                f,
                "   - {:12}: mean={:>8}, std={:>8}, count={:3}",
                env.as_str(),
                opt2(stats.mean),
                opt2(stats.std),
                stats.count
            )?;
        }

        writeln!(f, "\n5. LATENCY (ms)")?;
        write_distribution(f, self.latency.as_ref())?;

        writeln!(f, "\n6. NETWORK TYPE")?;
        for (network_type, count) in &self.network_types {
            writeln!(f, "   - {network_type}: {count} groups")?;
        }
        for (env, types) in &self.network_types_by_env {
            let names: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
            writeln!(f, "   - {:12}: {}", env.as_str(), names.join(", "))?;
        }

        writeln!(f, "\n7. THROUGHPUT NORMALIZATION")?;
        writeln!(
            f,
            "   Groups with throughput_norm: {}/{}",
            self.normalized_groups, self.groups
        )?;
        writeln!(f, "   NOQOS baseline (internal groups are 100%):")?;
        for entry in &self.noqos_norms {
            writeln!(
                f,
                "   - {:12} / {:10}: {:6.1}%",
                entry.env.as_str(),
                entry.qos.to_string(),
                entry.throughput_norm
            )?;
        }
        writeln!(f, "   QoS effect sample:")?;
        for entry in &self.qos_norm_sample {
            writeln!(
                f,
                "   - {:12} / {:10}: {:6.1}%",
                entry.env.as_str(),
                entry.qos.to_string(),
                entry.throughput_norm
            )?;
        }

        if self.invalid_records > 0 {
            writeln!(f, "\n8. INVALID RECORDS")?;
            for (reason, count) in &self.invalid_reasons {
                writeln!(f, "   - {reason}: {count} records")?;
            }
            for (env, count) in &self.invalid_by_env {
                writeln!(f, "   - {env}: {count} records")?;
            }
        }

        writeln!(f, "\n9. COMPARISON")?;
        for (category, count) in &self.comparison_by_category {
            writeln!(f, "   - {category}: {count} rows")?;
        }

        let q = &self.quality;
        writeln!(f, "\n10. DATA QUALITY")?;
        writeln!(
            f,
            "   ✓ Throughput > 0: {}/{} ({:.1}%)",
            q.positive_throughput,
            q.checked_records,
            percent(q.positive_throughput, q.checked_records)
        )?;
        writeln!(
            f,
            "   ✓ Latency in [0, {LATENCY_CEILING_MS}) ms: {}/{} ({:.1}%)",
            q.reasonable_latency,
            q.checked_records,
            percent(q.reasonable_latency, q.checked_records)
        )?;
        writeln!(
            f,
            "   ✓ CPU <= {CPU_CEILING_PCT}%: {}/{} ({:.1}%)",
            q.plausible_cpu,
            q.checked_records,
            percent(q.plausible_cpu, q.checked_records)
        )?;
        writeln!(
            f,
            "   ⚠ Throughput CV > {HIGH_CV_PCT}%: {}/{} groups",
            q.high_cv_groups, q.groups
        )?;

        writeln!(f, "\n11. RECOMMENDATIONS")?;
        if self.recommendations.is_empty() {
            writeln!(f, "   ✓ No significant issues found")?;
        } else {
            for issue in &self.recommendations {
                writeln!(f, "   ⚠ {issue}")?;
            }
        }

        writeln!(f, "\n{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::RunRecordBuilder;
    use crate::classifier::RunTags;
    use crate::parsers::{PingStats, ResourceUsage, ThroughputResult};
    use crate::types::Role;

    fn client(env: Environment, qos: QosLevel, throughput: f64, latency: Option<f64>) -> RunRecord {
        RunRecordBuilder::new(Role::Client)
            .tags(RunTags {
                env,
                qos,
                ..RunTags::default()
            })
            .throughput(ThroughputResult {
                throughput_mbps: Some(throughput),
                retransmits: None,
            })
            .ping(PingStats {
                latency_ms: latency,
                ..PingStats::default()
            })
            .resources(ResourceUsage {
                cpu_mean: Some(12.0),
                ram_mean: None,
            })
            .path("runs/x/CLIENT/run_1")
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_tables_do_not_fail() {
        let report = ValidationReport::from_tables(&[], &[], &[], &[]);
        assert_eq!(report.client_records, 0);
        assert_eq!(report.throughput, None);
        assert!(report.recommendations.is_empty());
        let text = report.to_string();
        assert!(text.contains("VALIDATION REPORT"));
        assert!(text.contains("No significant issues"));
    }

    #[test]
    fn test_counts_and_distributions() {
        let records = vec![
            client(Environment::Docker, QosLevel::NoQos, 80.0, Some(1.0)),
            client(Environment::Docker, QosLevel::NoQos, 90.0, Some(3.0)),
            client(Environment::Docker, QosLevel::level(1), 40.0, None),
        ];
        let grouped = vec![
            GroupedRow {
                env: Environment::Docker,
                qos: QosLevel::NoQos,
                network_type: NetworkType::Internal,
                throughput_mbps_mean: Some(85.0),
                throughput_mbps_cv: Some(8.3),
                throughput_norm: Some(100.0),
            },
            GroupedRow {
                env: Environment::Docker,
                qos: QosLevel::level(1),
                network_type: NetworkType::Internal,
                throughput_mbps_mean: Some(40.0),
                throughput_mbps_cv: Some(35.0),
                throughput_norm: Some(47.0),
            },
        ];
        let invalid = vec![InvalidRow {
            env: Environment::Vm,
            invalid_reason: InvalidReason::CpuNan,
        }];

        let report = ValidationReport::from_tables(&records, &grouped, &[], &invalid);
        assert_eq!(report.runs_per_env.get(&Environment::Docker), Some(&3));
        assert_eq!(report.runs_per_env_qos.len(), 2);
        assert_eq!(report.throughput.map(|d| d.median), Some(80.0));
        assert_eq!(report.latency.map(|d| d.mean), Some(2.0));
        assert_eq!(report.noqos_throughput_by_env[&Environment::Docker].count, 2);
        assert_eq!(report.normalized_groups, 2);
        assert_eq!(report.noqos_norms.len(), 1);
        assert_eq!(report.qos_norm_sample.len(), 1);
        assert_eq!(report.invalid_reasons.get(&InvalidReason::CpuNan), Some(&1));
        assert_eq!(report.quality.high_cv_groups, 0);

        // 1 of 4 invalid, one unstable group, one record without latency
        assert_eq!(report.recommendations.len(), 3);
        assert!(report.to_string().contains("8. INVALID RECORDS"));
    }
}
