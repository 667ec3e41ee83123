//! Pipeline stages and orchestration
//!
//! `ingest` turns the runs tree into record tables, `analyze` turns a record
//! table into the invalid, grouped and comparison tables, and `validate`
//! reads everything back into a [`ValidationReport`]. [`run_full`] chains the
//! three and stops at the first failure.

use crate::aggregate::{aggregate, AggregateGroup};
use crate::comparison::{build_comparison, ComparisonRow};
use crate::config::{AnalysisRole, PipelineConfig};
use crate::ingest::ingest_runs;
use crate::normalize::normalize;
use crate::observability::{log_stage, record_count, Counter, PerfTimer, StageContext};
use crate::record::RunRecord;
use crate::report::ValidationReport;
use crate::tables::{read_records, write_table};
use crate::topology::classify_records;
use crate::types::Role;
use crate::validation::{partition_by_validity, ValidityPartition};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Tables written by the ingest stage
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    pub all_records: usize,
    pub client_records: usize,
    pub server_records: usize,
    pub files: Vec<PathBuf>,
}

/// Ingest the configured runs tree and write the record tables
#[instrument(skip(config))]
pub fn run_ingest(config: &PipelineConfig) -> Result<IngestSummary> {
    let _timer = PerfTimer::new("ingest");
    let outcome = ingest_runs(&config.paths.runs_dir, config)?;
    let outputs = &config.outputs;

    let all = outcome.all_records();
    let tables: [(&str, &[RunRecord]); 3] = [
        (outputs.all_records.as_str(), &all),
        (outputs.client_records.as_str(), &outcome.client_records),
        (outputs.server_records.as_str(), &outcome.server_records),
    ];

    let mut files = Vec::new();
    for (name, rows) in tables {
        let path = config.output_path(name);
        write_table(&path, rows)?;
        files.push(path);
    }

    Ok(IngestSummary {
        all_records: all.len(),
        client_records: outcome.client_records.len(),
        server_records: outcome.server_records.len(),
        files,
    })
}

/// Keep the records the configured role analyzes
pub fn select_role(records: Vec<RunRecord>, role: AnalysisRole) -> Vec<RunRecord> {
    match role {
        AnalysisRole::All => records,
        AnalysisRole::Client => records.into_iter().filter(|r| r.role == Role::Client).collect(),
        AnalysisRole::Server => records.into_iter().filter(|r| r.role == Role::Server).collect(),
    }
}

/// In-memory result of the analysis stage
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub partition: ValidityPartition,
    pub groups: Vec<AggregateGroup>,
    pub comparison: Vec<ComparisonRow>,
}

/// Filter, classify, aggregate, normalize and compare a set of records
pub fn analyze_records(records: Vec<RunRecord>) -> Analysis {
    let partition = partition_by_validity(records);
    record_count(Counter::RecordsInvalid, partition.invalid.len() as u64);

    let classified = classify_records(&partition.valid);
    let groups = normalize(aggregate(&classified));
    let comparison = build_comparison(&groups);

    Analysis {
        partition,
        groups,
        comparison,
    }
}

/// Tables written by the analyze stage
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSummary {
    pub input_records: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub groups: usize,
    pub comparison_rows: usize,
    pub files: Vec<PathBuf>,
}

/// Table the analysis reads by default for the configured role
pub fn default_records_path(config: &PipelineConfig) -> PathBuf {
    let outputs = &config.outputs;
    let name = match config.analysis.role {
        AnalysisRole::Client => &outputs.client_records,
        AnalysisRole::Server => &outputs.server_records,
        AnalysisRole::All => &outputs.all_records,
    };
    config.output_path(name)
}

/// Analyze a record table and write the invalid, grouped and comparison tables
#[instrument(skip(config))]
pub fn run_analyze(config: &PipelineConfig, records_path: Option<&Path>) -> Result<AnalysisSummary> {
    let _timer = PerfTimer::new("analyze");
    let input = records_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_records_path(config));

    let records = read_records(&input)
        .with_context(|| format!("Failed to load records from {}", input.display()))?;
    let records = select_role(records, config.analysis.role);
    let input_records = records.len();

    let analysis = analyze_records(records);
    let outputs = &config.outputs;

    let invalid_path = config.output_path(&outputs.invalid_records);
    write_table(&invalid_path, &analysis.partition.invalid)?;
    let grouped_path = config.output_path(&outputs.grouped);
    write_table(&grouped_path, &analysis.groups)?;
    let comparison_path = config.output_path(&outputs.comparison);
    write_table(&comparison_path, &analysis.comparison)?;

    info!(
        input = input_records,
        groups = analysis.groups.len(),
        "Analysis tables written"
    );

    Ok(AnalysisSummary {
        input_records,
        valid_records: analysis.partition.valid.len(),
        invalid_records: analysis.partition.invalid.len(),
        groups: analysis.groups.len(),
        comparison_rows: analysis.comparison.len(),
        files: vec![invalid_path, grouped_path, comparison_path],
    })
}

/// Read the produced tables back and build the validation report
pub fn run_validate(config: &PipelineConfig) -> Result<ValidationReport> {
    ValidationReport::load(config)
}

/// Outcome of one stage of a full run
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub name: &'static str,
    pub description: &'static str,
    /// Error chain when the stage failed
    pub error: Option<String>,
}

impl StageOutcome {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of [`run_full`]
#[derive(Debug, Clone, Default)]
pub struct PipelineRun {
    /// Attempted stages in order; the last one may have failed
    pub stages: Vec<StageOutcome>,
    pub report: Option<ValidationReport>,
    pub files: Vec<PathBuf>,
}

impl PipelineRun {
    pub fn passed(&self) -> usize {
        self.stages.iter().filter(|s| s.passed()).count()
    }

    pub fn total(&self) -> usize {
        self.stages.len()
    }

    pub fn succeeded(&self) -> bool {
        self.passed() == self.total()
    }
}

fn run_stage<T>(
    run: &mut PipelineRun,
    parent: &StageContext,
    name: &'static str,
    description: &'static str,
    stage: impl FnOnce() -> Result<T>,
) -> Option<T> {
    let ctx = parent.child(name);
    let result = stage();
    log_stage(&ctx, &result);

    let (value, error) = match result {
        Ok(value) => (Some(value), None),
        Err(e) => (None, Some(format!("{e:#}"))),
    };
    run.stages.push(StageOutcome {
        name,
        description,
        error,
    });
    value
}

/// Run ingest, analyze and validate in order, stopping at the first failure
pub fn run_full(config: &PipelineConfig) -> PipelineRun {
    let mut ctx = StageContext::new("pipeline");
    ctx.add_attribute("runs_dir", config.paths.runs_dir.display());
    ctx.add_attribute("output_dir", config.paths.output_dir.display());

    let mut run = PipelineRun::default();

    let Some(ingest) = run_stage(&mut run, &ctx, "ingest", "Aggregate raw runs into record tables", || {
        run_ingest(config)
    }) else {
        return run;
    };
    run.files.extend(ingest.files);

    let Some(analysis) = run_stage(
        &mut run,
        &ctx,
        "analyze",
        "Filter, group, normalize and compare records",
        || run_analyze(config, None),
    ) else {
        return run;
    };
    run.files.extend(analysis.files);

    let report = run_stage(&mut run, &ctx, "validate", "Check the produced tables", || {
        run_validate(config)
    });
    run.report = report;

    let overall: Result<()> = if run.succeeded() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("{} of {} stages failed", run.total() - run.passed(), run.total()))
    };
    log_stage(&ctx, &overall);
    run
}
