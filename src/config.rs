use crate::parsers::ResourceColumns;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub artifacts: ArtifactsConfig,
    pub resource_columns: ResourceColumns,
    pub analysis: AnalysisConfig,
    pub outputs: OutputsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub runs_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Naming convention the measurement driver uses for run directories
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub client_dir_suffix: String,
    pub server_dir_suffix: String,
    pub client_run_prefix: String,
    pub client_result_file: String,
    pub ping_log_file: String,
    pub resource_log_file: String,
    pub server_json_dir: String,
    pub server_session_prefix: String,
}

/// Which records feed the aggregation stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisRole {
    #[default]
    Client,
    Server,
    All,
}

impl std::str::FromStr for AnalysisRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(AnalysisRole::Client),
            "server" => Ok(AnalysisRole::Server),
            "all" => Ok(AnalysisRole::All),
            other => anyhow::bail!("Unknown analysis role: {other} (expected client, server or all)"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub role: AnalysisRole,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputsConfig {
    pub all_records: String,
    pub client_records: String,
    pub server_records: String,
    pub invalid_records: String,
    pub grouped: String,
    pub comparison: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            runs_dir: PathBuf::from("runs"),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            client_dir_suffix: "CLIENT".to_string(),
            server_dir_suffix: "SERVER".to_string(),
            client_run_prefix: "run_".to_string(),
            client_result_file: "iperf_client.json".to_string(),
            ping_log_file: "ping.log".to_string(),
            resource_log_file: "sys_usage.log".to_string(),
            server_json_dir: "server_json".to_string(),
            server_session_prefix: "session_".to_string(),
        }
    }
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            all_records: "summary_all_full.csv".to_string(),
            client_records: "summary_client_only.csv".to_string(),
            server_records: "summary_server_only.csv".to_string(),
            invalid_records: "invalid_records.csv".to_string(),
            grouped: "summary_full_grouped.csv".to_string(),
            comparison: "summary_comparison.csv".to_string(),
        }
    }
}

impl OutputsConfig {
    /// Every output file, in the order the stages produce them
    pub fn all_files(&self) -> [&str; 6] {
        [
            self.all_records.as_str(),
            self.client_records.as_str(),
            self.server_records.as_str(),
            self.invalid_records.as_str(),
            self.grouped.as_str(),
            self.comparison.as_str(),
        ]
    }
}

impl PipelineConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from an optional file, then environment variables
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        // Override with environment variables
        if let Ok(runs_dir) = std::env::var("NETBENCH_RUNS_DIR") {
            config.paths.runs_dir = PathBuf::from(runs_dir);
        }
        if let Ok(output_dir) = std::env::var("NETBENCH_OUTPUT_DIR") {
            config.paths.output_dir = PathBuf::from(output_dir);
        }
        if let Ok(role) = std::env::var("NETBENCH_ANALYSIS_ROLE") {
            config.analysis.role = role.parse()?;
        }

        Ok(config)
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.paths.output_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_driver_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.artifacts.client_result_file, "iperf_client.json");
        assert_eq!(config.resource_columns.cpu, "cpu_percent");
        assert_eq!(config.analysis.role, AnalysisRole::Client);
        assert_eq!(config.outputs.grouped, "summary_full_grouped.csv");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
[paths]
runs_dir = "/srv/bench/runs"

[analysis]
role = "all"

[resource_columns]
cpu = "cpu"
"#,
        )
        .unwrap();
        assert_eq!(config.paths.runs_dir, PathBuf::from("/srv/bench/runs"));
        assert_eq!(config.paths.output_dir, PathBuf::from("."));
        assert_eq!(config.analysis.role, AnalysisRole::All);
        assert_eq!(config.resource_columns.cpu, "cpu");
        assert_eq!(config.resource_columns.memory, "mem_used_mb");
        assert_eq!(config.artifacts.ping_log_file, "ping.log");
    }

    #[test]
    fn test_from_file_reports_missing_file() {
        let err = PipelineConfig::from_file("/no/such/netbench.toml").unwrap_err();
        assert!(err.to_string().contains("netbench.toml"));
    }

    #[test]
    fn test_analysis_role_parse() {
        assert_eq!("SERVER".parse::<AnalysisRole>().unwrap(), AnalysisRole::Server);
        assert!("both".parse::<AnalysisRole>().is_err());
    }
}
