//! Group aggregation
//!
//! Valid, classified records are grouped by their seven-part classification
//! key and summarized per metric. Groups come out in key order so repeated
//! runs over the same input produce identical tables.

use crate::observability::{record_count, Counter};
use crate::pure::ratios::{coefficient_of_variation, safe_ratio};
use crate::pure::statistics::{sample_stats, SampleStats};
use crate::record::Metric;
use crate::topology::ClassifiedRecord;
use crate::types::{Direction, Environment, NetworkType, QosLevel};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Grouping key, in grouped-table column order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub env: Environment,
    pub nic_mode: String,
    pub qos: QosLevel,
    pub direction: Direction,
    pub pod_config: String,
    pub is_fair: bool,
    pub network_type: NetworkType,
}

impl GroupKey {
    pub fn of(classified: &ClassifiedRecord) -> Self {
        let record = &classified.record;
        Self {
            env: record.env,
            nic_mode: record.nic_mode.clone(),
            qos: record.qos.clone(),
            direction: record.direction,
            pod_config: record.pod_config.clone(),
            is_fair: classified.is_fair(),
            network_type: classified.network_type,
        }
    }
}

/// Summary of one group of runs
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateGroup {
    pub key: GroupKey,
    pub stats: BTreeMap<Metric, SampleStats>,
    /// Coefficient of variation in percent, for [`Metric::WITH_CV`]
    pub cv: BTreeMap<Metric, Option<f64>>,
    /// Mean CPU divided by mean throughput
    pub cpu_per_mbps: Option<f64>,
    /// Filled in by the normalizer
    pub throughput_norm: Option<f64>,
    /// Filled in by the normalizer
    pub qos_effect_pct: Option<f64>,
}

impl AggregateGroup {
    pub fn stat(&self, metric: Metric) -> SampleStats {
        self.stats.get(&metric).copied().unwrap_or_default()
    }

    pub fn mean(&self, metric: Metric) -> Option<f64> {
        self.stat(metric).mean
    }

    pub fn count(&self, metric: Metric) -> usize {
        self.stat(metric).count
    }

    pub fn cv(&self, metric: Metric) -> Option<f64> {
        self.cv.get(&metric).copied().flatten()
    }

    /// Number of runs with a throughput value, used as the group's weight
    pub fn sample_count(&self) -> usize {
        self.count(Metric::Throughput)
    }

    fn summarize(key: GroupKey, members: &[&ClassifiedRecord]) -> Self {
        let stats: BTreeMap<Metric, SampleStats> = Metric::ALL
            .iter()
            .map(|&metric| {
                let values = members.iter().map(|c| c.record.metric(metric));
                (metric, sample_stats(values))
            })
            .collect();

        let cv = Metric::WITH_CV
            .iter()
            .map(|&metric| {
                let s = stats.get(&metric).copied().unwrap_or_default();
                (metric, coefficient_of_variation(s.std, s.mean))
            })
            .collect();

        let mean_of = |metric: Metric| stats.get(&metric).and_then(|s| s.mean);
        let cpu_per_mbps = safe_ratio(mean_of(Metric::Cpu), mean_of(Metric::Throughput));

        Self {
            key,
            stats,
            cv,
            cpu_per_mbps,
            throughput_norm: None,
            qos_effect_pct: None,
        }
    }
}

/// Group records by classification key and compute per-metric statistics
#[instrument(skip(records), fields(records = records.len()))]
pub fn aggregate(records: &[ClassifiedRecord]) -> Vec<AggregateGroup> {
    let mut buckets: BTreeMap<GroupKey, Vec<&ClassifiedRecord>> = BTreeMap::new();
    for record in records {
        buckets.entry(GroupKey::of(record)).or_default().push(record);
    }

    let groups: Vec<AggregateGroup> = buckets
        .into_iter()
        .map(|(key, members)| AggregateGroup::summarize(key, &members))
        .collect();

    record_count(Counter::GroupsBuilt, groups.len() as u64);
    debug!(groups = groups.len(), "Aggregation complete");
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::RunRecordBuilder;
    use crate::classifier::RunTags;
    use crate::parsers::{ResourceUsage, ThroughputResult};
    use crate::topology::classify_records;
    use crate::types::Role;

    fn run(env: Environment, qos: QosLevel, throughput: f64, cpu: f64) -> crate::record::RunRecord {
        RunRecordBuilder::new(Role::Client)
            .tags(RunTags {
                env,
                qos,
                ..RunTags::default()
            })
            .throughput(ThroughputResult {
                throughput_mbps: Some(throughput),
                retransmits: Some(0.0),
            })
            .resources(ResourceUsage {
                cpu_mean: Some(cpu),
                ram_mean: Some(512.0),
            })
            .path("runs/test/CLIENT/run_1")
            .build()
            .unwrap()
    }

    #[test]
    fn test_groups_by_key() {
        let records = classify_records(&[
            run(Environment::Docker, QosLevel::NoQos, 80.0, 10.0),
            run(Environment::Docker, QosLevel::NoQos, 90.0, 20.0),
            run(Environment::Docker, QosLevel::level(1), 40.0, 10.0),
        ]);
        let groups = aggregate(&records);
        assert_eq!(groups.len(), 2);

        let noqos = &groups[0];
        assert_eq!(noqos.key.qos, QosLevel::NoQos);
        assert_eq!(noqos.sample_count(), 2);
        assert_eq!(noqos.mean(Metric::Throughput), Some(85.0));
        assert_eq!(noqos.mean(Metric::Cpu), Some(15.0));
        assert_eq!(noqos.cpu_per_mbps, Some(15.0 / 85.0));
        assert!(noqos.cv(Metric::Throughput).is_some());
        assert!(!noqos.key.is_fair);
        assert_eq!(noqos.key.network_type, NetworkType::Internal);

        let qos1 = &groups[1];
        assert_eq!(qos1.sample_count(), 1);
        assert_eq!(qos1.stat(Metric::Throughput).std, None);
        assert_eq!(qos1.cv(Metric::Throughput), None);
    }

    #[test]
    fn test_zero_mean_cv_is_missing() {
        let records = classify_records(&[
            run(Environment::Native, QosLevel::NoQos, 90.0, 10.0),
            run(Environment::Native, QosLevel::NoQos, 92.0, 10.0),
        ]);
        let groups = aggregate(&records);
        // Retransmits are all zero, so their mean is zero but no CV column exists
        assert_eq!(groups[0].mean(Metric::Retransmits), Some(0.0));
        assert_eq!(groups[0].cv(Metric::Retransmits), None);
        assert!(groups[0].key.is_fair);
    }

    #[test]
    fn test_group_order_is_stable() {
        let forward = vec![
            run(Environment::Vm, QosLevel::level(2), 10.0, 1.0),
            run(Environment::Native, QosLevel::NoQos, 90.0, 10.0),
            run(Environment::Docker, QosLevel::NoQos, 70.0, 5.0),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let a = aggregate(&classify_records(&forward));
        let b = aggregate(&classify_records(&backward));
        assert_eq!(a, b);
        assert_eq!(a[0].key.env, Environment::Native);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[]).is_empty());
    }
}
