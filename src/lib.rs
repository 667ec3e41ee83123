// Netbench - Aggregation pipeline for network benchmark runs
// Root library module

pub mod observability;
pub mod config;
pub mod types;
pub mod path_utils;
pub mod parsers;
pub mod classifier;
pub mod record;
pub mod builders;
pub mod ingest;
pub mod validation;
pub mod topology;
pub mod pure;
pub mod aggregate;
pub mod normalize;
pub mod comparison;
pub mod tables;
pub mod pipeline;
pub mod report;

// Re-export key types
pub use observability::{
    get_metrics,
    init_logging_with_level,
    log_stage,
    record_count,
    Counter,
    PerfTimer,
    StageContext,
};

pub use config::{AnalysisRole, PipelineConfig};

// Re-export classification tags
pub use types::{
    Direction,
    Environment,
    InvalidReason,
    NetworkType,
    QosLevel,
    Role,
    TagParseError,
};

pub use parsers::{
    ArtifactError,
    PingStats,
    ResourceColumns,
    ResourceUsage,
    ThroughputResult,
};

pub use classifier::{classify_path, classify_segments, RunTags};
pub use record::{Metric, RunRecord};
pub use builders::RunRecordBuilder;
pub use ingest::{ingest_runs, IngestOutcome};
pub use validation::{partition_by_validity, InvalidRecord, ValidityPartition};
pub use topology::{classify_network, classify_records, ClassifiedRecord};
pub use aggregate::{aggregate, AggregateGroup, GroupKey};
pub use normalize::{normalize, Baselines};
pub use comparison::{build_comparison, ComparisonCategory, ComparisonRow};
pub use tables::{read_records, write_table, TableRow};

// Re-export pipeline entry points
pub use pipeline::{
    analyze_records,
    run_analyze,
    run_full,
    run_ingest,
    run_validate,
    Analysis,
    PipelineRun,
};

pub use report::ValidationReport;
