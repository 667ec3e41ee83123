// Netbench CLI - Aggregate, normalize and validate network benchmark runs
use anyhow::Result;
use clap::{Parser, Subcommand};

// Macro for conditional printing based on quiet flag
macro_rules! qprintln {
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            println!($($arg)*);
        }
    };
}
use netbench::{
    get_metrics, init_logging_with_level, run_analyze, run_full, run_ingest, run_validate,
    PipelineConfig,
};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Netbench - Aggregation pipeline for network benchmark runs",
    long_about = None,
    after_help = "QUICK START:
  1. Build record tables:     netbench ingest --runs-dir ./runs
  2. Group and normalize:     netbench analyze
  3. Check the results:       netbench validate

EXAMPLES:
  # Everything in one go, tables written to ./results
  netbench run --runs-dir ./runs --output-dir ./results

  # Analyze server sessions instead of client runs
  NETBENCH_ANALYSIS_ROLE=server netbench analyze --records summary_server_only.csv"
)]
struct Cli {
    /// Enable verbose logging (DEBUG level). Default is WARN level.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress progress output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the runs tree and write the all/client/server record tables
    Ingest {
        /// Root of the runs tree
        #[arg(short, long)]
        runs_dir: Option<PathBuf>,

        /// Directory the tables are written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Filter, group, normalize and compare a record table
    Analyze {
        /// Record table to analyze (default: the table for the configured role)
        #[arg(long)]
        records: Option<PathBuf>,

        /// Directory the tables are written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Print the validation report for the produced tables
    Validate {
        /// Directory holding the produced tables
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Run ingest, analyze and validate, stopping at the first failure
    Run {
        /// Root of the runs tree
        #[arg(short, long)]
        runs_dir: Option<PathBuf>,

        /// Directory the tables are written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

fn apply_paths(config: &mut PipelineConfig, runs_dir: Option<PathBuf>, output_dir: Option<PathBuf>) {
    if let Some(runs_dir) = runs_dir {
        config.paths.runs_dir = runs_dir;
    }
    if let Some(output_dir) = output_dir {
        config.paths.output_dir = output_dir;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Ignore error if already initialized
    let _ = init_logging_with_level(cli.verbose, cli.quiet);
    let quiet = cli.quiet;

    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest {
            runs_dir,
            output_dir,
        } => {
            apply_paths(&mut config, runs_dir, output_dir);
            qprintln!(quiet, "📥 Ingesting runs from {}", config.paths.runs_dir.display());

            let summary = run_ingest(&config)?;
            qprintln!(quiet, "   All records:    {}", summary.all_records);
            qprintln!(quiet, "   Client records: {}", summary.client_records);
            qprintln!(quiet, "   Server records: {}", summary.server_records);
            for file in &summary.files {
                qprintln!(quiet, "   ✅ {}", file.display());
            }
        }
        Commands::Analyze {
            records,
            output_dir,
        } => {
            apply_paths(&mut config, None, output_dir);
            qprintln!(quiet, "📊 Analyzing {:?} records", config.analysis.role);

            let summary = run_analyze(&config, records.as_deref())?;
            qprintln!(
                quiet,
                "   Records: {} ({} valid, {} invalid)",
                summary.input_records,
                summary.valid_records,
                summary.invalid_records
            );
            qprintln!(quiet, "   Groups: {}", summary.groups);
            qprintln!(quiet, "   Comparison rows: {}", summary.comparison_rows);
            for file in &summary.files {
                qprintln!(quiet, "   ✅ {}", file.display());
            }
        }
        Commands::Validate { output_dir } => {
            apply_paths(&mut config, None, output_dir);
            let report = run_validate(&config)?;
            println!("{report}");
        }
        Commands::Run {
            runs_dir,
            output_dir,
        } => {
            apply_paths(&mut config, runs_dir, output_dir);
            let run = run_full(&config);
            let rule = "=".repeat(80);

            for stage in &run.stages {
                qprintln!(quiet, "\n{rule}");
                qprintln!(quiet, "▶ {}: {}", stage.name, stage.description);
                qprintln!(quiet, "{rule}");
                match &stage.error {
                    None => qprintln!(quiet, "✅ Completed: {}", stage.name),
                    Some(error) => {
                        println!("❌ {} failed: {}", stage.name, error);
                        println!("\n⚠️  Pipeline stopped at: {}", stage.name);
                    }
                }
            }

            if let Some(report) = &run.report {
                qprintln!(quiet, "\n{report}");
            }

            qprintln!(quiet, "\n{rule}");
            qprintln!(quiet, "PIPELINE SUMMARY");
            qprintln!(quiet, "{rule}");
            qprintln!(quiet, "✅ Passed: {}/{} stages", run.passed(), run.total());
            if !run.files.is_empty() {
                qprintln!(quiet, "\n📁 OUTPUT FILES:");
                for file in &run.files {
                    qprintln!(quiet, "   - {}", file.display());
                }
            }

            debug!(metrics = %get_metrics(), "Pipeline metrics");
            if !run.succeeded() {
                anyhow::bail!("Pipeline did not complete ({}/{} stages passed)", run.passed(), run.total());
            }
        }
    }

    Ok(())
}
