// Run Record
// The flat per-run row every later stage consumes. One record exists per
// client run and per server session.

use crate::classifier::RunTags;
use crate::types::{Direction, Environment, QosLevel, Role};
use serde::{Deserialize, Serialize};

/// One benchmark run, flattened
///
/// Field order is the column order of the record tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub role: Role,
    pub env: Environment,
    pub nic_mode: String,
    pub qos: QosLevel,
    pub direction: Direction,
    pub pod_config: String,
    pub throughput_mbps: Option<f64>,
    pub retransmits: Option<f64>,
    pub latency_ms: Option<f64>,
    pub packet_loss_pct: Option<f64>,
    pub jitter_ms: Option<f64>,
    pub cpu_mean: Option<f64>,
    pub ram_mean: Option<f64>,
    /// Origin on disk, diagnostic only
    pub path: String,
}

impl RunRecord {
    pub fn tags(&self) -> RunTags {
        RunTags {
            env: self.env,
            nic_mode: self.nic_mode.clone(),
            qos: self.qos.clone(),
            direction: self.direction,
            pod_config: self.pod_config.clone(),
        }
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Throughput => self.throughput_mbps,
            Metric::Retransmits => self.retransmits,
            Metric::Latency => self.latency_ms,
            Metric::PacketLoss => self.packet_loss_pct,
            Metric::Jitter => self.jitter_ms,
            Metric::Cpu => self.cpu_mean,
            Metric::Ram => self.ram_mean,
        }
    }
}

/// Numeric metrics carried by a record, in table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Throughput,
    Retransmits,
    Latency,
    PacketLoss,
    Jitter,
    Cpu,
    Ram,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Throughput,
        Metric::Retransmits,
        Metric::Latency,
        Metric::PacketLoss,
        Metric::Jitter,
        Metric::Cpu,
        Metric::Ram,
    ];

    /// Metrics that also get a coefficient of variation column
    pub const WITH_CV: [Metric; 4] = [Metric::Throughput, Metric::Latency, Metric::Jitter, Metric::Cpu];

    pub fn column(&self) -> &'static str {
        match self {
            Metric::Throughput => "throughput_mbps",
            Metric::Retransmits => "retransmits",
            Metric::Latency => "latency_ms",
            Metric::PacketLoss => "packet_loss_pct",
            Metric::Jitter => "jitter_ms",
            Metric::Cpu => "cpu_mean",
            Metric::Ram => "ram_mean",
        }
    }
}
