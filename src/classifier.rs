// Run Classifier
// Derives categorical tags from the cleaned segments of a run's path.
//
// Each tag is described by an ordered rule table. Rules are tried in table
// order; for each rule the segments are scanned in path order and the first
// segment the rule accepts decides the tag. Segments are never combined.

use crate::path_utils::path_segments;
use crate::types::{
    normalize_label, Direction, Environment, QosLevel, NIC_MODE_UNKNOWN, POD_CONFIG_NONE,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// One entry of a classification rule table
pub struct SegmentRule<T> {
    /// Human-readable rule name, used in logs and tests
    pub name: &'static str,
    /// Returns the tag value when the segment satisfies the rule
    pub extract: fn(&str) -> Option<T>,
}

/// Apply a rule table to a segment list; first match wins
pub fn first_match<T>(rules: &[SegmentRule<T>], segments: &[String]) -> Option<(T, &'static str)> {
    rules.iter().find_map(|rule| {
        segments
            .iter()
            .find_map(|segment| (rule.extract)(segment))
            .map(|value| (value, rule.name))
    })
}

static QOS_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)NOQOS|QOS[0-9]+").expect("Failed to compile QoS regex"));
static POD_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\d+\s*POD").expect("Failed to compile pod regex"));
static SERVER_TO_CLIENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^a-z0-9])s[-_]c(?:[^a-z0-9]|$)").expect("Failed to compile s-c regex")
});
static CLIENT_TO_SERVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^a-z0-9])c[-_]s(?:[^a-z0-9]|$)").expect("Failed to compile c-s regex")
});

const NIC_KEYWORDS: &[&str] = &["CROSS", "BRIDGED", "NAT", "HOST", "MACVLAN"];

fn environment_keyword(segment: &str) -> Option<Environment> {
    Environment::detect(segment)
}

fn nic_keyword(segment: &str) -> Option<String> {
    let upper = segment.to_uppercase();
    NIC_KEYWORDS
        .iter()
        .any(|kw| upper.contains(kw))
        .then(|| normalize_label(segment))
}

fn qos_token(segment: &str) -> Option<QosLevel> {
    QOS_TOKEN
        .find(segment)
        .and_then(|m| m.as_str().parse::<QosLevel>().ok())
}

fn pod_token(segment: &str) -> Option<String> {
    POD_TOKEN
        .is_match(segment)
        .then(|| normalize_label(segment))
}

fn server_to_client(segment: &str) -> Option<Direction> {
    SERVER_TO_CLIENT
        .is_match(&segment.to_lowercase())
        .then_some(Direction::ServerToClient)
}

fn client_to_server(segment: &str) -> Option<Direction> {
    CLIENT_TO_SERVER
        .is_match(&segment.to_lowercase())
        .then_some(Direction::ClientToServer)
}

pub const ENVIRONMENT_RULES: &[SegmentRule<Environment>] = &[SegmentRule {
    name: "environment-keyword",
    extract: environment_keyword,
}];

pub const NIC_MODE_RULES: &[SegmentRule<String>] = &[SegmentRule {
    name: "nic-keyword",
    extract: nic_keyword,
}];

pub const QOS_RULES: &[SegmentRule<QosLevel>] = &[SegmentRule {
    name: "qos-token",
    extract: qos_token,
}];

/// `s-c` is searched across the whole path before `c-s` is considered
pub const DIRECTION_RULES: &[SegmentRule<Direction>] = &[
    SegmentRule {
        name: "server-to-client",
        extract: server_to_client,
    },
    SegmentRule {
        name: "client-to-server",
        extract: client_to_server,
    },
];

pub const POD_CONFIG_RULES: &[SegmentRule<String>] = &[SegmentRule {
    name: "pod-count",
    extract: pod_token,
}];

/// Classification tags of one run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunTags {
    pub env: Environment,
    pub nic_mode: String,
    pub qos: QosLevel,
    pub direction: Direction,
    pub pod_config: String,
}

impl Default for RunTags {
    fn default() -> Self {
        Self {
            env: Environment::Unknown,
            nic_mode: NIC_MODE_UNKNOWN.to_string(),
            qos: QosLevel::NoQos,
            direction: Direction::None,
            pod_config: POD_CONFIG_NONE.to_string(),
        }
    }
}

/// Direction only carries meaning for shaped, non-native runs
pub fn effective_direction(env: Environment, qos: &QosLevel, direction: Direction) -> Direction {
    if qos.is_noqos() || env == Environment::Native {
        Direction::None
    } else {
        direction
    }
}

/// Classify a run from its cleaned path segments
pub fn classify_segments(segments: &[String]) -> RunTags {
    let defaults = RunTags::default();

    let env = first_match(ENVIRONMENT_RULES, segments)
        .map(|(env, _)| env)
        .unwrap_or(defaults.env);
    let nic_mode = first_match(NIC_MODE_RULES, segments)
        .map(|(nic, _)| nic)
        .unwrap_or(defaults.nic_mode);
    let qos = first_match(QOS_RULES, segments)
        .map(|(qos, _)| qos)
        .unwrap_or(defaults.qos);

    let direction = if qos.is_noqos() {
        Direction::None
    } else {
        first_match(DIRECTION_RULES, segments)
            .map(|(direction, rule)| {
                debug!(rule, %direction, "Direction inferred from path");
                direction
            })
            .unwrap_or(Direction::None)
    };

    let pod_config = first_match(POD_CONFIG_RULES, segments)
        .map(|(pod, _)| pod)
        .unwrap_or(defaults.pod_config);

    let tags = RunTags {
        env,
        nic_mode,
        direction: effective_direction(env, &qos, direction),
        qos,
        pod_config,
    };

    if tags.env == Environment::Unknown {
        debug!(segments = ?segments, "No environment segment found");
    }
    tags
}

/// Classify a run directory located under `root`
pub fn classify_path(path: &Path, root: &Path) -> RunTags {
    classify_segments(&path_segments(path, root))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_full_docker_path() {
        let tags = classify_segments(&segs(&["DOCKER", "BRIDGED", "QOS1_s-c", "CLIENT", "run_1"]));
        assert_eq!(tags.env, Environment::Docker);
        assert_eq!(tags.nic_mode, "BRIDGED");
        assert_eq!(tags.qos, QosLevel::level(1));
        assert_eq!(tags.direction, Direction::ServerToClient);
        assert_eq!(tags.pod_config, "NONE");
    }

    #[test]
    fn test_defaults_when_nothing_matches() {
        let tags = classify_segments(&segs(&["batch", "CLIENT", "run_1"]));
        assert_eq!(tags, RunTags::default());
    }

    #[test]
    fn test_k8s_normalized_to_kubernetes() {
        let tags = classify_segments(&segs(&["k8s", "2 PODS", "NOQOS", "CLIENT"]));
        assert_eq!(tags.env, Environment::Kubernetes);
        assert_eq!(tags.pod_config, "2 PODS");
        assert_eq!(tags.qos, QosLevel::NoQos);
    }

    #[test]
    fn test_first_segment_wins_for_nic() {
        let tags = classify_segments(&segs(&["VM", "CROSS-HOSTS", "BRIDGED"]));
        assert_eq!(tags.nic_mode, "CROSS-HOSTS");
    }

    #[test]
    fn test_native_segment_also_names_nic() {
        // NATIVE contains NAT; first-match-wins keeps that behaviour
        let tags = classify_segments(&segs(&["NATIVE", "QOS2", "c-s"]));
        assert_eq!(tags.env, Environment::Native);
        assert_eq!(tags.nic_mode, "NATIVE");
    }

    #[test]
    fn test_direction_forced_none_for_noqos() {
        let tags = classify_segments(&segs(&["DOCKER", "HOST", "NOQOS", "s-c"]));
        assert_eq!(tags.direction, Direction::None);
    }

    #[test]
    fn test_direction_forced_none_for_native() {
        let tags = classify_segments(&segs(&["NATIVE", "QOS2", "c-s"]));
        assert_eq!(tags.direction, Direction::None);
    }

    #[test]
    fn test_sc_searched_before_cs() {
        let tags = classify_segments(&segs(&["VM", "NAT", "QOS3", "c_s", "s_c"]));
        assert_eq!(tags.direction, Direction::ServerToClient);

        let tags = classify_segments(&segs(&["VM", "NAT", "QOS3", "c_s"]));
        assert_eq!(tags.direction, Direction::ClientToServer);
    }

    #[test]
    fn test_direction_needs_separator_boundaries() {
        // "hosts_client" must not read as s_c
        let tags = classify_segments(&segs(&["VM", "CROSS-HOSTS_CLIENT", "QOS1"]));
        assert_eq!(tags.direction, Direction::None);
    }

    #[test]
    fn test_qos_token_is_extracted_from_segment() {
        let tags = classify_segments(&segs(&["DOCKER", "macvlan", "qos3-s-c"]));
        assert_eq!(tags.qos, QosLevel::level(3));
        assert_eq!(tags.nic_mode, "MACVLAN");
        assert_eq!(tags.direction, Direction::ServerToClient);
    }

    #[test]
    fn test_large_qos_level_is_not_read_as_unshaped() {
        let tags = classify_segments(&segs(&["DOCKER", "QOS300", "run_1"]));
        assert_eq!(tags.qos, QosLevel::level(300));
        assert!(!tags.qos.is_noqos());
        assert_eq!(tags.qos.to_string(), "QOS300");
    }

    #[test]
    fn test_zero_padded_qos_level_keeps_its_label() {
        let padded = classify_segments(&segs(&["DOCKER", "QOS01", "run_1"]));
        let plain = classify_segments(&segs(&["DOCKER", "QOS1", "run_1"]));
        assert_eq!(padded.qos.to_string(), "QOS01");
        assert_ne!(padded.qos, plain.qos);
    }

    #[test]
    fn test_first_match_reports_rule_name() {
        let segments = segs(&["x", "c-s"]);
        let hit = first_match(DIRECTION_RULES, &segments);
        assert_eq!(hit, Some((Direction::ClientToServer, "client-to-server")));
    }

    #[test]
    fn test_classify_path_ignores_root_ancestors() {
        let root = Path::new("/home/vm/docker-data/runs");
        let tags = classify_path(&root.join("1. KUBERNETES").join("NOQOS").join("CLIENT"), root);
        assert_eq!(tags.env, Environment::Kubernetes);
        assert_eq!(tags.nic_mode, "unknown");
    }
}
