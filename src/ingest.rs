//! Run discovery and record ingestion
//!
//! Walks the runs tree written by the measurement driver and turns every
//! server session and client run into a [`RunRecord`]. Broken artifacts never
//! stop the walk; they only leave metrics missing.

use crate::builders::RunRecordBuilder;
use crate::classifier::classify_path;
use crate::config::PipelineConfig;
use crate::observability::{record_count, Counter};
use crate::parsers::{load_ping_log, load_resource_log, load_throughput_result};
use crate::record::RunRecord;
use crate::types::Role;
use anyhow::{ensure, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Records produced by one ingestion pass
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub server_records: Vec<RunRecord>,
    pub client_records: Vec<RunRecord>,
}

impl IngestOutcome {
    /// Server sessions first, then client runs
    pub fn all_records(&self) -> Vec<RunRecord> {
        self.server_records
            .iter()
            .chain(self.client_records.iter())
            .cloned()
            .collect()
    }

    pub fn total(&self) -> usize {
        self.server_records.len() + self.client_records.len()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sorted child entries of a directory; unreadable directories yield nothing
fn sorted_children(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => {
            let mut children: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .collect();
            children.sort();
            children
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
            Vec::new()
        }
    }
}

/// Every directory below `root` (excluding root itself), depth-first, sorted
fn collect_directories(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut subdirs: Vec<PathBuf> = sorted_children(&dir)
            .into_iter()
            .filter(|p| p.is_dir())
            .collect();
        found.extend(subdirs.iter().cloned());
        // Reverse so the stack pops in sorted order
        subdirs.reverse();
        stack.extend(subdirs);
    }

    found.sort();
    found
}

fn is_server_dir(dir: &Path, config: &PipelineConfig) -> bool {
    file_name(dir).ends_with(&config.artifacts.server_dir_suffix)
}

fn is_client_run_dir(dir: &Path, config: &PipelineConfig) -> bool {
    let parent_is_client = dir
        .parent()
        .map(|parent| file_name(parent).ends_with(&config.artifacts.client_dir_suffix))
        .unwrap_or(false);
    parent_is_client && file_name(dir).starts_with(&config.artifacts.client_run_prefix)
}

/// One record per `session_*.json` of a server directory
fn server_records(server_dir: &Path, root: &Path, config: &PipelineConfig) -> Result<Vec<RunRecord>> {
    let artifacts = &config.artifacts;
    let tags = classify_path(server_dir, root);
    let resources = load_resource_log(
        &server_dir.join(&artifacts.resource_log_file),
        &config.resource_columns,
    );

    let json_dir = server_dir.join(&artifacts.server_json_dir);
    if !json_dir.is_dir() {
        return Ok(Vec::new());
    }

    sorted_children(&json_dir)
        .into_iter()
        .filter(|p| p.is_file())
        .filter(|p| {
            let name = file_name(p);
            name.starts_with(&artifacts.server_session_prefix) && name.ends_with(".json")
        })
        .map(|session| {
            RunRecordBuilder::new(Role::Server)
                .tags(tags.clone())
                .throughput(load_throughput_result(&session))
                .resources(resources)
                .path(&session)
                .build()
        })
        .collect()
}

fn client_record(run_dir: &Path, root: &Path, config: &PipelineConfig) -> Result<RunRecord> {
    let artifacts = &config.artifacts;
    RunRecordBuilder::new(Role::Client)
        .tags(classify_path(run_dir, root))
        .throughput(load_throughput_result(&run_dir.join(&artifacts.client_result_file)))
        .ping(load_ping_log(&run_dir.join(&artifacts.ping_log_file)))
        .resources(load_resource_log(
            &run_dir.join(&artifacts.resource_log_file),
            &config.resource_columns,
        ))
        .path(run_dir)
        .build()
}

/// Ingest every server session and client run under `root`
#[instrument(skip(config))]
pub fn ingest_runs(root: &Path, config: &PipelineConfig) -> Result<IngestOutcome> {
    ensure!(
        root.is_dir(),
        "Runs directory {} does not exist or is not a directory",
        root.display()
    );

    let directories = collect_directories(root);
    let mut outcome = IngestOutcome::default();

    for dir in directories.iter().filter(|d| is_server_dir(d, config)) {
        let records = server_records(dir, root, config)
            .with_context(|| format!("Failed to build server records for {}", dir.display()))?;
        outcome.server_records.extend(records);
    }

    for dir in directories.iter().filter(|d| is_client_run_dir(d, config)) {
        let record = client_record(dir, root, config)
            .with_context(|| format!("Failed to build client record for {}", dir.display()))?;
        outcome.client_records.push(record);
    }

    record_count(Counter::RecordsIngested, outcome.total() as u64);
    info!(
        server = outcome.server_records.len(),
        client = outcome.client_records.len(),
        "Ingested run records"
    );
    Ok(outcome)
}
