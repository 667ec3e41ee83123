// Comparison Table
// Condenses the normalized groups into three row families: a fair
// environment-to-environment comparison, the per-NIC QoS effect, and
// Kubernetes pod scaling.

use crate::aggregate::AggregateGroup;
use crate::pure::ratios::safe_ratio;
use crate::pure::statistics::weighted_mean;
use crate::record::Metric;
use crate::types::{Environment, NetworkType, QosLevel, TagParseError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Row family of the comparison table, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComparisonCategory {
    EnvFair,
    QosEffect,
    K8sPodScaling,
}

impl ComparisonCategory {
    pub const ALL: [ComparisonCategory; 3] = [
        ComparisonCategory::EnvFair,
        ComparisonCategory::QosEffect,
        ComparisonCategory::K8sPodScaling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonCategory::EnvFair => "ENV_FAIR",
            ComparisonCategory::QosEffect => "QOS_EFFECT",
            ComparisonCategory::K8sPodScaling => "K8S_POD_SCALING",
        }
    }
}

impl fmt::Display for ComparisonCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonCategory {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| TagParseError::Category(s.to_string()))
    }
}

impl TryFrom<String> for ComparisonCategory {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComparisonCategory> for String {
    fn from(value: ComparisonCategory) -> Self {
        value.as_str().to_string()
    }
}

/// One row of the comparison table
///
/// Columns a category does not distinguish on are left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub category: ComparisonCategory,
    pub env: Environment,
    pub nic_mode: Option<String>,
    pub qos: Option<QosLevel>,
    pub pod_config: Option<String>,
    pub sample_count: usize,
    pub throughput_mbps_mean: Option<f64>,
    pub latency_ms_mean: Option<f64>,
    pub jitter_ms_mean: Option<f64>,
    pub cpu_mean_mean: Option<f64>,
    pub cpu_per_mbps: Option<f64>,
    pub qos_effect_pct: Option<f64>,
}

/// Count-weighted means of several groups, each metric weighted by its own
/// observation count
struct Pooled {
    sample_count: usize,
    throughput: Option<f64>,
    latency: Option<f64>,
    jitter: Option<f64>,
    cpu: Option<f64>,
}

impl Pooled {
    fn of(groups: &[&AggregateGroup]) -> Self {
        let pool = |metric: Metric| {
            weighted_mean(groups.iter().map(|g| (g.mean(metric), g.count(metric))))
        };
        Self {
            sample_count: groups.iter().map(|g| g.sample_count()).sum(),
            throughput: pool(Metric::Throughput),
            latency: pool(Metric::Latency),
            jitter: pool(Metric::Jitter),
            cpu: pool(Metric::Cpu),
        }
    }

    fn into_row(
        self,
        category: ComparisonCategory,
        env: Environment,
        qos: Option<QosLevel>,
        pod_config: Option<String>,
    ) -> ComparisonRow {
        ComparisonRow {
            category,
            env,
            nic_mode: None,
            qos,
            pod_config,
            sample_count: self.sample_count,
            throughput_mbps_mean: self.throughput,
            latency_ms_mean: self.latency,
            jitter_ms_mean: self.jitter,
            cpu_mean_mean: self.cpu,
            cpu_per_mbps: safe_ratio(self.cpu, self.throughput),
            qos_effect_pct: None,
        }
    }
}

/// Unshaped, external groups pooled per environment
pub fn env_fair_rows(groups: &[AggregateGroup]) -> Vec<ComparisonRow> {
    let mut by_env: BTreeMap<Environment, Vec<&AggregateGroup>> = BTreeMap::new();
    for group in groups
        .iter()
        .filter(|g| g.key.qos.is_noqos() && g.key.network_type == NetworkType::External)
    {
        by_env.entry(group.key.env).or_default().push(group);
    }

    by_env
        .into_iter()
        .map(|(env, members)| {
            Pooled::of(&members).into_row(ComparisonCategory::EnvFair, env, Some(QosLevel::NoQos), None)
        })
        .collect()
}

/// Every group as is; percentages with different baselines are never averaged
pub fn qos_effect_rows(groups: &[AggregateGroup]) -> Vec<ComparisonRow> {
    groups
        .iter()
        .map(|group| ComparisonRow {
            category: ComparisonCategory::QosEffect,
            env: group.key.env,
            nic_mode: Some(group.key.nic_mode.clone()),
            qos: Some(group.key.qos.clone()),
            pod_config: Some(group.key.pod_config.clone()),
            sample_count: group.sample_count(),
            throughput_mbps_mean: group.mean(Metric::Throughput),
            latency_ms_mean: group.mean(Metric::Latency),
            jitter_ms_mean: group.mean(Metric::Jitter),
            cpu_mean_mean: group.mean(Metric::Cpu),
            cpu_per_mbps: group.cpu_per_mbps,
            qos_effect_pct: group.qos_effect_pct,
        })
        .collect()
}

/// Kubernetes groups pooled per pod configuration, across QoS levels
pub fn pod_scaling_rows(groups: &[AggregateGroup]) -> Vec<ComparisonRow> {
    let mut by_pod: BTreeMap<&str, Vec<&AggregateGroup>> = BTreeMap::new();
    for group in groups.iter().filter(|g| g.key.env.is_orchestrated()) {
        by_pod.entry(group.key.pod_config.as_str()).or_default().push(group);
    }

    by_pod
        .into_iter()
        .map(|(pod, members)| {
            Pooled::of(&members).into_row(
                ComparisonCategory::K8sPodScaling,
                Environment::Kubernetes,
                None,
                Some(pod.to_string()),
            )
        })
        .collect()
}

/// All comparison rows, category by category
#[instrument(skip_all, fields(groups = groups.len()))]
pub fn build_comparison(groups: &[AggregateGroup]) -> Vec<ComparisonRow> {
    let mut rows = env_fair_rows(groups);
    rows.extend(qos_effect_rows(groups));
    rows.extend(pod_scaling_rows(groups));
    debug!(rows = rows.len(), "Comparison table built");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::builders::RunRecordBuilder;
    use crate::classifier::RunTags;
    use crate::normalize::normalize;
    use crate::parsers::{PingStats, ResourceUsage, ThroughputResult};
    use crate::record::RunRecord;
    use crate::topology::classify_records;
    use crate::types::Role;

    fn run(env: Environment, nic: &str, qos: QosLevel, pod: &str, throughput: f64, cpu: f64) -> RunRecord {
        RunRecordBuilder::new(Role::Client)
            .tags(RunTags {
                env,
                nic_mode: nic.to_string(),
                qos,
                pod_config: pod.to_string(),
                ..RunTags::default()
            })
            .throughput(ThroughputResult {
                throughput_mbps: Some(throughput),
                retransmits: None,
            })
            .ping(PingStats {
                latency_ms: Some(1.0),
                packet_loss_pct: Some(0.0),
                jitter_ms: Some(0.5),
            })
            .resources(ResourceUsage {
                cpu_mean: Some(cpu),
                ram_mean: None,
            })
            .path("runs/test/CLIENT/run_1")
            .build()
            .unwrap()
    }

    fn groups(records: &[RunRecord]) -> Vec<AggregateGroup> {
        normalize(aggregate(&classify_records(records)))
    }

    #[test]
    fn test_env_fair_is_count_weighted() {
        let groups = groups(&[
            run(Environment::Vm, "CROSS-HOSTS", QosLevel::NoQos, "NONE", 10.0, 1.0),
            run(Environment::Vm, "CROSS-HOSTS", QosLevel::NoQos, "NONE", 10.0, 1.0),
            run(Environment::Vm, "CROSS-HOSTS", QosLevel::NoQos, "NONE", 10.0, 1.0),
            run(Environment::Vm, "CROSS-NAT", QosLevel::NoQos, "NONE", 50.0, 1.0),
            // Internal and shaped groups stay out of the fair comparison
            run(Environment::Vm, "BRIDGED", QosLevel::NoQos, "NONE", 1000.0, 1.0),
            run(Environment::Vm, "CROSS-HOSTS", QosLevel::level(1), "NONE", 1.0, 1.0),
        ]);
        let rows = env_fair_rows(&groups);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].env, Environment::Vm);
        assert_eq!(rows[0].sample_count, 4);
        assert_eq!(rows[0].throughput_mbps_mean, Some(20.0));
        assert_eq!(rows[0].qos, Some(QosLevel::NoQos));
        assert_eq!(rows[0].nic_mode, None);
        assert_eq!(rows[0].cpu_per_mbps, Some(1.0 / 20.0));
    }

    #[test]
    fn test_qos_effect_passes_groups_through() {
        let groups = groups(&[
            run(Environment::Docker, "BRIDGED", QosLevel::NoQos, "NONE", 80.0, 5.0),
            run(Environment::Docker, "BRIDGED", QosLevel::level(1), "NONE", 20.0, 5.0),
            run(Environment::Docker, "HOST", QosLevel::NoQos, "NONE", 90.0, 5.0),
        ]);
        let rows = qos_effect_rows(&groups);
        assert_eq!(rows.len(), groups.len());
        let shaped = rows
            .iter()
            .find(|r| r.qos == Some(QosLevel::level(1)))
            .unwrap();
        assert_eq!(shaped.nic_mode.as_deref(), Some("BRIDGED"));
        assert_eq!(shaped.qos_effect_pct, Some(25.0));
    }

    #[test]
    fn test_pod_scaling_rows() {
        let groups = groups(&[
            run(Environment::Kubernetes, "HOST", QosLevel::NoQos, "1 POD", 90.0, 10.0),
            run(Environment::Kubernetes, "HOST", QosLevel::level(2), "1 POD", 30.0, 10.0),
            run(Environment::Kubernetes, "HOST", QosLevel::NoQos, "3 POD", 60.0, 20.0),
            run(Environment::Docker, "HOST", QosLevel::NoQos, "NONE", 60.0, 20.0),
        ]);
        let rows = pod_scaling_rows(&groups);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].pod_config.as_deref(), Some("1 POD"));
        assert_eq!(rows[0].sample_count, 2);
        assert_eq!(rows[0].throughput_mbps_mean, Some(60.0));
        assert_eq!(rows[0].qos, None);
        assert_eq!(rows[1].pod_config.as_deref(), Some("3 POD"));
    }

    #[test]
    fn test_categories_in_order() {
        let groups = groups(&[
            run(Environment::Native, "unknown", QosLevel::NoQos, "NONE", 94.2, 3.0),
            run(Environment::Kubernetes, "HOST", QosLevel::NoQos, "2 POD", 70.0, 8.0),
        ]);
        let rows = build_comparison(&groups);
        let categories: Vec<ComparisonCategory> = rows.iter().map(|r| r.category).collect();
        let mut sorted = categories.clone();
        sorted.sort();
        assert_eq!(categories, sorted);
        assert_eq!(categories.first(), Some(&ComparisonCategory::EnvFair));
        assert_eq!(categories.last(), Some(&ComparisonCategory::K8sPodScaling));
    }

    #[test]
    fn test_category_strings() {
        assert_eq!(ComparisonCategory::K8sPodScaling.to_string(), "K8S_POD_SCALING");
        assert_eq!(
            "qos_effect".parse::<ComparisonCategory>().unwrap(),
            ComparisonCategory::QosEffect
        );
        assert!("OTHER".parse::<ComparisonCategory>().is_err());
    }
}
