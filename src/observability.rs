// Centralized Observability Infrastructure for netbench
// Structured logging, pipeline stage tracing, and run counters

use anyhow::Result;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

// Global atomic counters for metrics
static RECORDS_INGESTED: AtomicU64 = AtomicU64::new(0);
static RECORDS_INVALID: AtomicU64 = AtomicU64::new(0);
static GROUPS_BUILT: AtomicU64 = AtomicU64::new(0);
static STAGES_FAILED: AtomicU64 = AtomicU64::new(0);

const DEFAULT_FILTER: &str = "netbench=warn,error";
const VERBOSE_FILTER: &str = "netbench=debug,info";
const QUIET_FILTER: &str = "error";

/// Install the stderr subscriber. `--quiet` beats `RUST_LOG`, which beats
/// `--verbose` and the default filter. A second call is a no-op.
pub fn init_logging_with_level(verbose: bool, quiet: bool) -> Result<()> {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let env_filter = if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(!quiet)
        .with_line_number(!quiet)
        .with_file(!quiet)
        .with_writer(std::io::stderr);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
    {
        debug!(verbose, quiet, "netbench logging initialized");
    }
    Ok(())
}

/// Counters bumped by the pipeline stages
#[derive(Debug, Clone, Copy)]
pub enum Counter {
    RecordsIngested,
    RecordsInvalid,
    GroupsBuilt,
    StagesFailed,
}

impl Counter {
    fn cell(&self) -> &'static AtomicU64 {
        match self {
            Counter::RecordsIngested => &RECORDS_INGESTED,
            Counter::RecordsInvalid => &RECORDS_INVALID,
            Counter::GroupsBuilt => &GROUPS_BUILT,
            Counter::StagesFailed => &STAGES_FAILED,
        }
    }
}

/// Add to a global counter
pub fn record_count(counter: Counter, value: u64) {
    counter.cell().fetch_add(value, Ordering::Relaxed);
    debug!("metric.counter {:?} += {}", counter, value);
}

/// Context for one pipeline stage, shared by its log events
#[derive(Debug, Clone)]
pub struct StageContext {
    pub trace_id: Uuid,
    pub span_id: Uuid,
    pub parent_span_id: Option<Uuid>,
    pub stage: String,
    pub start_time: Instant,
    pub attributes: Vec<(String, String)>,
}

impl StageContext {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            span_id: Uuid::new_v4(),
            parent_span_id: None,
            stage: stage.into(),
            start_time: Instant::now(),
            attributes: Vec::new(),
        }
    }

    pub fn child(&self, stage: impl Into<String>) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: Uuid::new_v4(),
            parent_span_id: Some(self.span_id),
            stage: stage.into(),
            start_time: Instant::now(),
            attributes: Vec::new(),
        }
    }

    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl ToString) {
        self.attributes.push((key.into(), value.to_string()));
    }
}

/// Log the outcome of a stage with its full context
pub fn log_stage<T>(ctx: &StageContext, result: &Result<T>) {
    let elapsed = ctx.start_time.elapsed();
    let attrs = ctx
        .attributes
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ");

    match result {
        Ok(_) => {
            info!(
                trace_id = %ctx.trace_id,
                span_id = %ctx.span_id,
                parent_span_id = ?ctx.parent_span_id,
                stage = %ctx.stage,
                elapsed_ms = elapsed.as_millis(),
                attributes = %attrs,
                "Stage completed"
            );
        }
        Err(e) => {
            let error_chain = e
                .chain()
                .map(|cause| cause.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            error!(
                trace_id = %ctx.trace_id,
                span_id = %ctx.span_id,
                parent_span_id = ?ctx.parent_span_id,
                stage = %ctx.stage,
                elapsed_ms = elapsed.as_millis(),
                attributes = %attrs,
                error_chain = %error_chain,
                "Stage failed"
            );
            record_count(Counter::StagesFailed, 1);
        }
    }
}

/// Get current metrics snapshot
pub fn get_metrics() -> serde_json::Value {
    serde_json::json!({
        "records": {
            "ingested": RECORDS_INGESTED.load(Ordering::Relaxed),
            "invalid": RECORDS_INVALID.load(Ordering::Relaxed),
        },
        "groups": GROUPS_BUILT.load(Ordering::Relaxed),
        "stages_failed": STAGES_FAILED.load(Ordering::Relaxed),
        "timestamp": Utc::now().to_rfc3339(),
    })
}

/// Performance timer for measuring stage duration
pub struct PerfTimer {
    name: String,
    start: Instant,
}

impl PerfTimer {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug!("Timer started: {}", name);
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        debug!(
            elapsed_ms = self.start.elapsed().as_millis(),
            "Timer completed: {}", self.name
        );
    }
}
