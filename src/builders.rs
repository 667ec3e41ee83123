// Builder Patterns
// Fluent construction of run records from parser outputs and classifier tags.

use crate::classifier::{effective_direction, RunTags};
use crate::parsers::{PingStats, ResourceUsage, ThroughputResult};
use crate::path_utils::display_path;
use crate::record::RunRecord;
use crate::types::Role;
use anyhow::Result;
use std::path::Path;

/// Fluent builder for creating RunRecords
pub struct RunRecordBuilder {
    role: Role,
    tags: RunTags,
    throughput: ThroughputResult,
    ping: PingStats,
    resources: ResourceUsage,
    path: Option<String>,
}

impl RunRecordBuilder {
    /// Start a record for the given role with default tags and no metrics
    pub fn new(role: Role) -> Self {
        Self {
            role,
            tags: RunTags::default(),
            throughput: ThroughputResult::default(),
            ping: PingStats::default(),
            resources: ResourceUsage::default(),
            path: None,
        }
    }

    pub fn tags(mut self, tags: RunTags) -> Self {
        self.tags = tags;
        self
    }

    pub fn throughput(mut self, throughput: ThroughputResult) -> Self {
        self.throughput = throughput;
        self
    }

    /// Server sessions never carry probe results; leave unset for them
    pub fn ping(mut self, ping: PingStats) -> Self {
        self.ping = ping;
        self
    }

    pub fn resources(mut self, resources: ResourceUsage) -> Self {
        self.resources = resources;
        self
    }

    /// Set the origin path
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(display_path(path.as_ref()));
        self
    }

    /// Build the record
    pub fn build(self) -> Result<RunRecord> {
        let path = self
            .path
            .ok_or_else(|| anyhow::anyhow!("Run record path is required"))?;
        let tags = self.tags;

        Ok(RunRecord {
            role: self.role,
            env: tags.env,
            nic_mode: tags.nic_mode,
            direction: effective_direction(tags.env, &tags.qos, tags.direction),
            qos: tags.qos,
            pod_config: tags.pod_config,
            throughput_mbps: self.throughput.throughput_mbps,
            retransmits: self.throughput.retransmits,
            latency_ms: self.ping.latency_ms,
            packet_loss_pct: self.ping.packet_loss_pct,
            jitter_ms: self.ping.jitter_ms,
            cpu_mean: self.resources.cpu_mean,
            ram_mean: self.resources.ram_mean,
            path,
        })
    }
}
