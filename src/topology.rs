//! Network topology classification and analysis preparation
//!
//! Each valid record is tagged internal (client and server share a host) or
//! external (distinct hosts). The tag selects the throughput normalization
//! baseline.
//!
//! Orchestrated runs are always treated as external. Pods of a single-node
//! cluster share a host, so such deployments are misclassified; this is a
//! known approximation and is left as is.

use crate::classifier::effective_direction;
use crate::record::RunRecord;
use crate::types::{Environment, NetworkType, POD_CONFIG_NONE};
use serde::{Deserialize, Serialize};

/// Classify the network topology of a run, first matching rule wins:
///
/// 1. native → external
/// 2. VM with a cross-host NIC mode → external
/// 3. Kubernetes → external
/// 4. anything else → internal
pub fn classify_network(env: Environment, nic_mode: &str) -> NetworkType {
    match env {
        Environment::Native => NetworkType::External,
        Environment::Vm if nic_mode.to_uppercase().contains("CROSS") => NetworkType::External,
        Environment::Kubernetes => NetworkType::External,
        _ => NetworkType::Internal,
    }
}

/// NIC label for orchestrated runs, which encodes the pod-scaling setup
pub fn orchestrated_nic_mode(pod_config: &str) -> String {
    let pod = pod_config.trim();
    if pod.is_empty() || pod.eq_ignore_ascii_case(POD_CONFIG_NONE) {
        "K8S_UNKNOWN".to_string()
    } else {
        format!("K8S_{}", pod.to_uppercase())
    }
}

/// A valid record ready for grouping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub record: RunRecord,
    pub network_type: NetworkType,
}

impl ClassifiedRecord {
    pub fn is_fair(&self) -> bool {
        self.network_type.is_fair()
    }
}

/// Prepare valid records for aggregation
///
/// Forces direction to `none` where it carries no meaning, rewrites the NIC
/// mode of orchestrated runs to `K8S_<POD-CONFIG>`, then assigns the topology.
pub fn classify_records(valid: &[RunRecord]) -> Vec<ClassifiedRecord> {
    valid
        .iter()
        .map(|record| {
            let mut record = record.clone();
            record.direction = effective_direction(record.env, &record.qos, record.direction);
            if record.env.is_orchestrated() {
                record.nic_mode = orchestrated_nic_mode(&record.pod_config);
            }
            let network_type = classify_network(record.env, &record.nic_mode);
            ClassifiedRecord {
                record,
                network_type,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::RunRecordBuilder;
    use crate::classifier::RunTags;
    use crate::types::{Direction, QosLevel, Role};

    #[test]
    fn test_topology_rules() {
        assert_eq!(classify_network(Environment::Native, "anything"), NetworkType::External);
        assert_eq!(classify_network(Environment::Vm, "CROSS-HOSTS"), NetworkType::External);
        assert_eq!(classify_network(Environment::Vm, "BRIDGED"), NetworkType::Internal);
        assert_eq!(classify_network(Environment::Kubernetes, "HOST"), NetworkType::External);
        assert_eq!(classify_network(Environment::Docker, "CROSS"), NetworkType::Internal);
        assert_eq!(classify_network(Environment::Unknown, "CROSS"), NetworkType::Internal);
    }

    #[test]
    fn test_orchestrated_nic_mode() {
        assert_eq!(orchestrated_nic_mode("1 POD"), "K8S_1 POD");
        assert_eq!(orchestrated_nic_mode("NONE"), "K8S_UNKNOWN");
        assert_eq!(orchestrated_nic_mode("none"), "K8S_UNKNOWN");
        assert_eq!(orchestrated_nic_mode(""), "K8S_UNKNOWN");
    }

    #[test]
    fn test_classify_records_rewrites_kubernetes() {
        let record = RunRecordBuilder::new(Role::Client)
            .tags(RunTags {
                env: Environment::Kubernetes,
                nic_mode: "CROSS".to_string(),
                qos: QosLevel::level(2),
                direction: Direction::ClientToServer,
                pod_config: "2 POD".to_string(),
            })
            .path("runs/K8S/2 POD/QOS2_c-s/CLIENT/run_1")
            .build()
            .unwrap();

        let classified = classify_records(&[record]);
        assert_eq!(classified[0].record.nic_mode, "K8S_2 POD");
        assert_eq!(classified[0].record.direction, Direction::ClientToServer);
        assert_eq!(classified[0].network_type, NetworkType::External);
        assert!(classified[0].is_fair());
    }

    #[test]
    fn test_classify_records_forces_direction() {
        let mut record = RunRecordBuilder::new(Role::Client)
            .path("runs/DOCKER/CLIENT/run_1")
            .build()
            .unwrap();
        // Tables read back from disk may carry a stale direction
        record.direction = Direction::ServerToClient;

        let classified = classify_records(&[record]);
        assert_eq!(classified[0].record.direction, Direction::None);
    }
}
