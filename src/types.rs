// Classification Types
// Strongly-typed tags attached to every run record. Each tag has exactly one
// textual form used in the output tables and accepted back when reading them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Errors raised when a table cell cannot be turned back into a tag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagParseError {
    #[error("unknown role: {0}")]
    Role(String),

    #[error("unknown QoS level: {0}")]
    Qos(String),

    #[error("unknown direction: {0}")]
    Direction(String),

    #[error("unknown network type: {0}")]
    NetworkType(String),

    #[error("unknown invalid reason: {0}")]
    InvalidReason(String),

    #[error("unknown comparison category: {0}")]
    Category(String),
}

/// Which side of the benchmark produced the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Server => "server",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "server" => Ok(Role::Server),
            _ => Err(TagParseError::Role(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Deployment environment a run was executed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Environment {
    Native,
    Vm,
    Docker,
    Kubernetes,
    Unknown,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Native => "NATIVE",
            Environment::Vm => "VM",
            Environment::Docker => "DOCKER",
            Environment::Kubernetes => "KUBERNETES",
            Environment::Unknown => "unknown",
        }
    }

    /// Detect the environment keyword inside one path segment.
    ///
    /// Keyword priority is KUBERNETES, K8S, NATIVE, VM, DOCKER; both
    /// orchestration spellings collapse to `Kubernetes`.
    pub fn detect(segment: &str) -> Option<Self> {
        let upper = segment.to_uppercase();
        if upper.contains("KUBERNETES") || upper.contains("K8S") {
            Some(Environment::Kubernetes)
        } else if upper.contains("NATIVE") {
            Some(Environment::Native)
        } else if upper.contains("VM") {
            Some(Environment::Vm)
        } else if upper.contains("DOCKER") {
            Some(Environment::Docker)
        } else {
            None
        }
    }

    pub fn is_orchestrated(&self) -> bool {
        matches!(self, Environment::Kubernetes)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Reading tables back never fails on environment; anything unrecognised is
// the same "unknown" the classifier would have produced.
impl From<String> for Environment {
    fn from(value: String) -> Self {
        Environment::from(value.as_str())
    }
}

impl From<&str> for Environment {
    fn from(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "NATIVE" => Environment::Native,
            "VM" => Environment::Vm,
            "DOCKER" => Environment::Docker,
            "KUBERNETES" | "K8S" => Environment::Kubernetes,
            _ => Environment::Unknown,
        }
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.as_str().to_string()
    }
}

/// Traffic shaping level applied during a run.
///
/// A shaped level keeps the digits exactly as the directory name wrote them,
/// so `QOS01` and `QOS1` stay distinct and no level is too large to hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum QosLevel {
    #[default]
    NoQos,
    Level(String),
}

impl QosLevel {
    pub fn level(n: u32) -> Self {
        QosLevel::Level(n.to_string())
    }

    pub fn is_noqos(&self) -> bool {
        matches!(self, QosLevel::NoQos)
    }
}

// Significant digits first, so QOS2 sorts before QOS10; the written form
// breaks ties between zero-padded spellings.
fn level_order(digits: &str) -> (usize, &str) {
    let significant = digits.trim_start_matches('0');
    (significant.len(), significant)
}

impl Ord for QosLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (QosLevel::NoQos, QosLevel::NoQos) => Ordering::Equal,
            (QosLevel::NoQos, QosLevel::Level(_)) => Ordering::Less,
            (QosLevel::Level(_), QosLevel::NoQos) => Ordering::Greater,
            (QosLevel::Level(a), QosLevel::Level(b)) => level_order(a)
                .cmp(&level_order(b))
                .then_with(|| a.cmp(b)),
        }
    }
}

impl PartialOrd for QosLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for QosLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QosLevel::NoQos => f.write_str("NOQOS"),
            QosLevel::Level(digits) => write!(f, "QOS{digits}"),
        }
    }
}

impl FromStr for QosLevel {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        if upper == "NOQOS" {
            return Ok(QosLevel::NoQos);
        }
        upper
            .strip_prefix("QOS")
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .map(|digits| QosLevel::Level(digits.to_string()))
            .ok_or_else(|| TagParseError::Qos(s.to_string()))
    }
}

impl TryFrom<String> for QosLevel {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QosLevel> for String {
    fn from(qos: QosLevel) -> Self {
        qos.to_string()
    }
}

/// Direction in which shaped traffic flowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Direction {
    /// client → server
    ClientToServer,
    /// server → client
    ServerToClient,
    #[default]
    None,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToServer => "cs",
            Direction::ServerToClient => "sc",
            Direction::None => "none",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cs" => Ok(Direction::ClientToServer),
            "sc" => Ok(Direction::ServerToClient),
            "none" | "" => Ok(Direction::None),
            _ => Err(TagParseError::Direction(s.to_string())),
        }
    }
}

impl TryFrom<String> for Direction {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Direction> for String {
    fn from(direction: Direction) -> Self {
        direction.as_str().to_string()
    }
}

/// Whether client and server sat on distinct hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NetworkType {
    Internal,
    External,
}

impl NetworkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Internal => "internal",
            NetworkType::External => "external",
        }
    }

    /// Legacy boolean view kept in the grouped table as `is_fair`
    pub fn is_fair(&self) -> bool {
        matches!(self, NetworkType::External)
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkType {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "internal" => Ok(NetworkType::Internal),
            "external" => Ok(NetworkType::External),
            _ => Err(TagParseError::NetworkType(s.to_string())),
        }
    }
}

impl TryFrom<String> for NetworkType {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NetworkType> for String {
    fn from(network: NetworkType) -> Self {
        network.as_str().to_string()
    }
}

/// Why a record was excluded from aggregation.
///
/// Variant order is the evaluation priority: the first condition that holds
/// is the one reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InvalidReason {
    ThroughputNan,
    ThroughputZeroOrNeg,
    CpuNan,
    CpuZeroOrNeg,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::ThroughputNan => "throughput_nan",
            InvalidReason::ThroughputZeroOrNeg => "throughput_zero_or_neg",
            InvalidReason::CpuNan => "cpu_nan",
            InvalidReason::CpuZeroOrNeg => "cpu_zero_or_neg",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvalidReason {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "throughput_nan" => Ok(InvalidReason::ThroughputNan),
            "throughput_zero_or_neg" => Ok(InvalidReason::ThroughputZeroOrNeg),
            "cpu_nan" => Ok(InvalidReason::CpuNan),
            "cpu_zero_or_neg" => Ok(InvalidReason::CpuZeroOrNeg),
            _ => Err(TagParseError::InvalidReason(s.to_string())),
        }
    }
}

impl TryFrom<String> for InvalidReason {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InvalidReason> for String {
    fn from(reason: InvalidReason) -> Self {
        reason.as_str().to_string()
    }
}

/// Placeholder written when a path carries no pod-scaling segment
pub const POD_CONFIG_NONE: &str = "NONE";

/// Placeholder written when a path carries no NIC segment
pub const NIC_MODE_UNKNOWN: &str = "unknown";

/// Normalize a free-form tag cell (NIC mode, pod config) the way every
/// table stores it: trimmed and upper-cased, with `unknown` kept lowercase.
pub fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case(NIC_MODE_UNKNOWN) {
        NIC_MODE_UNKNOWN.to_string()
    } else {
        trimmed.to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detect_priority() {
        assert_eq!(Environment::detect("k8s-cluster"), Some(Environment::Kubernetes));
        assert_eq!(Environment::detect("KUBERNETES"), Some(Environment::Kubernetes));
        assert_eq!(Environment::detect("Native"), Some(Environment::Native));
        assert_eq!(Environment::detect("vm-bridged"), Some(Environment::Vm));
        assert_eq!(Environment::detect("DOCKER"), Some(Environment::Docker));
        assert_eq!(Environment::detect("CLIENT"), None);
    }

    #[test]
    fn test_environment_reads_back_leniently() {
        assert_eq!(Environment::from("native"), Environment::Native);
        assert_eq!(Environment::from(" K8S "), Environment::Kubernetes);
        assert_eq!(Environment::from("bare-metal"), Environment::Unknown);
        assert_eq!(Environment::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_qos_text_forms() {
        assert_eq!("noqos".parse::<QosLevel>().unwrap(), QosLevel::NoQos);
        assert_eq!("QOS3".parse::<QosLevel>().unwrap(), QosLevel::level(3));
        assert_eq!(QosLevel::level(2).to_string(), "QOS2");
        assert!("QOS".parse::<QosLevel>().is_err());
        assert!("QOS1a".parse::<QosLevel>().is_err());
        assert!("fast".parse::<QosLevel>().is_err());
    }

    #[test]
    fn test_qos_levels_keep_written_digits() {
        let wide = "qos300".parse::<QosLevel>().unwrap();
        assert_eq!(wide, QosLevel::level(300));
        assert_eq!(wide.to_string(), "QOS300");

        let huge = "QOS99999999999999999999".parse::<QosLevel>().unwrap();
        assert_eq!(huge.to_string(), "QOS99999999999999999999");

        let padded = "QOS01".parse::<QosLevel>().unwrap();
        assert_eq!(padded.to_string(), "QOS01");
        assert_ne!(padded, QosLevel::level(1));
    }

    #[test]
    fn test_qos_ordering_is_numeric() {
        let mut levels = vec![
            QosLevel::level(10),
            QosLevel::Level("01".to_string()),
            QosLevel::level(2),
            QosLevel::NoQos,
            QosLevel::level(1),
        ];
        levels.sort();
        let written: Vec<String> = levels.iter().map(|q| q.to_string()).collect();
        assert_eq!(written, ["NOQOS", "QOS01", "QOS1", "QOS2", "QOS10"]);
    }

    #[test]
    fn test_direction_text_forms() {
        assert_eq!("cs".parse::<Direction>().unwrap(), Direction::ClientToServer);
        assert_eq!("SC".parse::<Direction>().unwrap(), Direction::ServerToClient);
        assert_eq!("".parse::<Direction>().unwrap(), Direction::None);
        assert!("bidir".parse::<Direction>().is_err());
    }

    #[test]
    fn test_invalid_reason_priority_order() {
        assert!(InvalidReason::ThroughputNan < InvalidReason::ThroughputZeroOrNeg);
        assert!(InvalidReason::ThroughputZeroOrNeg < InvalidReason::CpuNan);
        assert!(InvalidReason::CpuNan < InvalidReason::CpuZeroOrNeg);
        assert_eq!(
            "cpu_zero_or_neg".parse::<InvalidReason>().unwrap(),
            InvalidReason::CpuZeroOrNeg
        );
    }

    #[test]
    fn test_network_type_is_fair() {
        assert!(NetworkType::External.is_fair());
        assert!(!NetworkType::Internal.is_fair());
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label(" cross-hosts "), "CROSS-HOSTS");
        assert_eq!(normalize_label("Unknown"), "unknown");
        assert_eq!(normalize_label("1 pod"), "1 POD");
    }
}
