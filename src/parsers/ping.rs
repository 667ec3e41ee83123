//! Round-trip probe log parser
//!
//! Two layouts are understood:
//!
//! - the Windows summary block (`Minimum = 10ms, Maximum = 15ms, Average = 12ms`
//!   and `Lost = 0 (0% loss)`), where jitter is approximated as
//!   `Maximum - Minimum`;
//! - the Unix statistics line (`rtt min/avg/max/mdev = a/b/c/d ms`) plus
//!   `P% packet loss`, where jitter is the reported `mdev`.
//!
//! The two jitter figures are not the same statistic. The max-min spread is
//! kept as the Windows value because it is all the summary block offers.

use super::{finite, read_artifact, ArtifactError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

static WIN_AVERAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Average = (\d+)ms").expect("Failed to compile average regex"));
static WIN_MINIMUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Minimum = (\d+)ms").expect("Failed to compile minimum regex"));
static WIN_MAXIMUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Maximum = (\d+)ms").expect("Failed to compile maximum regex"));
static WIN_LOSS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Lost = \d+ \((\d+)% loss").expect("Failed to compile Windows loss regex")
});
static UNIX_RTT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:rtt|round-trip) .* = [\d.]+/([\d.]+)/([\d.]+)/([\d.]+)")
        .expect("Failed to compile rtt regex")
});
static UNIX_LOSS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([\d.]+)% packet loss").expect("Failed to compile packet loss regex")
});

/// Latency figures extracted from one probe log
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PingStats {
    pub latency_ms: Option<f64>,
    pub packet_loss_pct: Option<f64>,
    pub jitter_ms: Option<f64>,
}

impl PingStats {
    fn is_empty(&self) -> bool {
        self.latency_ms.is_none() && self.packet_loss_pct.is_none() && self.jitter_ms.is_none()
    }
}

fn capture_f64(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .and_then(finite)
}

/// Parse probe log text in either supported layout
pub fn parse_ping_text(text: &str) -> Result<PingStats, ArtifactError> {
    if text.trim().is_empty() {
        return Err(ArtifactError::Empty);
    }

    let stats = if text.contains("Average") {
        let minimum = capture_f64(&WIN_MINIMUM, text);
        let maximum = capture_f64(&WIN_MAXIMUM, text);
        PingStats {
            latency_ms: capture_f64(&WIN_AVERAGE, text),
            packet_loss_pct: capture_f64(&WIN_LOSS, text),
            jitter_ms: minimum.zip(maximum).map(|(min, max)| (max - min).abs()),
        }
    } else if text.contains("rtt") || text.contains("round-trip") {
        let rtt = UNIX_RTT.captures(text);
        let field = |idx: usize| {
            rtt.as_ref()
                .and_then(|caps| caps.get(idx))
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .and_then(finite)
        };
        PingStats {
            latency_ms: field(1),
            packet_loss_pct: capture_f64(&UNIX_LOSS, text),
            jitter_ms: field(3),
        }
    } else {
        return Err(ArtifactError::Unrecognized);
    };

    if stats.is_empty() {
        return Err(ArtifactError::Unrecognized);
    }
    Ok(stats)
}

/// Load a probe log, degrading every failure to all-missing values
pub fn load_ping_log(path: &Path) -> PingStats {
    match read_artifact(path).and_then(|text| parse_ping_text(&text)) {
        Ok(stats) => stats,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Ping log yielded no metrics");
            PingStats::default()
        }
    }
}
