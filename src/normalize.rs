//! Throughput normalization
//!
//! Runs in two passes. [`Baselines::from_groups`] reads the aggregate table
//! once and builds every baseline lookup; [`apply`] then fills
//! `throughput_norm` and `qos_effect_pct` on each group without looking at
//! any other group.

use crate::aggregate::AggregateGroup;
use crate::pure::ratios::percent_of;
use crate::pure::statistics::mean_of;
use crate::record::Metric;
use crate::types::{Environment, NetworkType};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Baseline throughputs (Mbps), each the mean of the matching group means
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baselines {
    /// Native, unshaped groups; reference for every external group
    pub native_noqos: Option<f64>,
    /// Internal unshaped groups per environment
    pub internal_noqos_by_env: BTreeMap<Environment, f64>,
    /// Unshaped groups per (environment, NIC mode)
    pub noqos_by_env_nic: BTreeMap<(Environment, String), f64>,
}

impl Baselines {
    pub fn from_groups(groups: &[AggregateGroup]) -> Self {
        let noqos: Vec<&AggregateGroup> = groups.iter().filter(|g| g.key.qos.is_noqos()).collect();
        let native_noqos = mean_of(
            noqos
                .iter()
                .filter(|g| g.key.env == Environment::Native)
                .filter_map(|g| g.mean(Metric::Throughput)),
        );

        let mut by_env: BTreeMap<Environment, Vec<f64>> = BTreeMap::new();
        let mut by_env_nic: BTreeMap<(Environment, String), Vec<f64>> = BTreeMap::new();
        for group in &noqos {
            let Some(mbps) = group.mean(Metric::Throughput) else {
                continue;
            };
            if group.key.network_type == NetworkType::Internal {
                by_env.entry(group.key.env).or_default().push(mbps);
            }
            by_env_nic
                .entry((group.key.env, group.key.nic_mode.clone()))
                .or_default()
                .push(mbps);
        }

        Self {
            native_noqos,
            internal_noqos_by_env: by_env
                .into_iter()
                .filter_map(|(env, values)| mean_of(values).map(|m| (env, m)))
                .collect(),
            noqos_by_env_nic: by_env_nic
                .into_iter()
                .filter_map(|(key, values)| mean_of(values).map(|m| (key, m)))
                .collect(),
        }
    }

    /// Baseline used for a group's `throughput_norm`
    ///
    /// Internal unshaped groups are their own baseline and are handled by the
    /// caller.
    fn throughput_baseline(&self, group: &AggregateGroup) -> Option<f64> {
        match group.key.network_type {
            NetworkType::External => self.native_noqos,
            NetworkType::Internal => self.internal_noqos_by_env.get(&group.key.env).copied(),
        }
    }

    fn qos_baseline(&self, group: &AggregateGroup) -> Option<f64> {
        self.noqos_by_env_nic
            .get(&(group.key.env, group.key.nic_mode.clone()))
            .copied()
    }
}

/// Throughput of a group as a percentage of its topology baseline
pub fn throughput_norm(group: &AggregateGroup, baselines: &Baselines) -> Option<f64> {
    let mbps = group.mean(Metric::Throughput).filter(|t| *t > 0.0)?;
    if group.key.network_type == NetworkType::Internal && group.key.qos.is_noqos() {
        return Some(100.0);
    }
    percent_of(Some(mbps), baselines.throughput_baseline(group))
}

/// Throughput of a group as a percentage of the unshaped run on the same NIC
pub fn qos_effect_pct(group: &AggregateGroup, baselines: &Baselines) -> Option<f64> {
    percent_of(group.mean(Metric::Throughput), baselines.qos_baseline(group))
}

/// Fill the normalized columns of every group
#[instrument(skip_all, fields(groups = groups.len()))]
pub fn apply(mut groups: Vec<AggregateGroup>, baselines: &Baselines) -> Vec<AggregateGroup> {
    for group in &mut groups {
        group.throughput_norm = throughput_norm(group, baselines);
        group.qos_effect_pct = qos_effect_pct(group, baselines);
    }
    debug!(native_baseline = ?baselines.native_noqos, "Normalization applied");
    groups
}

/// Build baselines from the groups, then normalize them
pub fn normalize(groups: Vec<AggregateGroup>) -> Vec<AggregateGroup> {
    let baselines = Baselines::from_groups(&groups);
    apply(groups, &baselines)
}
