//! Loopgraph CLI
//!
//! Correlated static/dynamic profiling of loop nests.
//! Builds a loop graph from a program's source tree and merges the
//! timing and iteration data of an instrumented run onto it.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use loopgraph::commands::{
    display_schema, display_version, execute_analyze, execute_profile, validate_args,
    validate_report_file, validate_trace_file, AnalyzeArgs, ProfileArgs,
};
use loopgraph::utils::config::{DEFAULT_ENTRY_FUNCTION, DEFAULT_REPORT_PATH};

/// Loopgraph - loop-nest profiling
#[derive(Parser, Debug)]
#[command(name = "loopgraph")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze, instrument, run and merge a profile
    Profile {
        /// JSON source tree of the program
        #[arg(short, long)]
        source: PathBuf,

        /// Trace file written by the run command, or a recorded trace
        #[arg(short, long)]
        trace: Option<PathBuf>,

        /// Write the probe plan here for the build step
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Output path for JSON report
        #[arg(short, long, default_value = DEFAULT_REPORT_PATH)]
        output: PathBuf,

        /// Output path for DOT loop graph (optional)
        #[arg(short, long)]
        dot: Option<PathBuf>,

        /// Function wrapped by the program timer
        #[arg(long, env = "LOOPGRAPH_ENTRY", default_value = DEFAULT_ENTRY_FUNCTION)]
        entry: String,

        /// Keep repeated edges between the same loops
        #[arg(long)]
        keep_duplicate_edges: bool,

        /// Print per-loop summary to stdout
        #[arg(long)]
        summary: bool,

        /// Build-and-run command for the instrumented program
        #[arg(last = true)]
        command: Vec<String>,
    },

    /// Static analysis only (no execution)
    Analyze {
        /// JSON source tree of the program
        #[arg(short, long)]
        source: PathBuf,

        /// Output path for static JSON report (optional)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output path for DOT loop graph (optional)
        #[arg(short, long)]
        dot: Option<PathBuf>,

        /// Function that would receive the program timer
        #[arg(long, env = "LOOPGRAPH_ENTRY", default_value = DEFAULT_ENTRY_FUNCTION)]
        entry: String,

        /// Keep repeated edges between the same loops
        #[arg(long)]
        keep_duplicate_edges: bool,

        /// Print every collected property map
        #[arg(long)]
        dump: bool,

        /// Print the probe plan
        #[arg(long)]
        plan: bool,
    },

    /// Validate a trace file or a report JSON file
    Validate {
        /// Path to trace file
        #[arg(short, long, conflicts_with = "report")]
        trace: Option<PathBuf>,

        /// Path to report JSON file
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Profile {
            source,
            trace,
            plan,
            output,
            dot,
            entry,
            keep_duplicate_edges,
            summary,
            command,
        } => {
            let args = ProfileArgs {
                source,
                command,
                trace_file: trace,
                plan_file: plan,
                output_json: output,
                output_dot: dot,
                entry_function: entry,
                keep_duplicate_edges,
                print_summary: summary,
            };

            // Validate args first
            validate_args(&args)?;

            execute_profile(args)?;
        }

        Commands::Analyze {
            source,
            output,
            dot,
            entry,
            keep_duplicate_edges,
            dump,
            plan,
        } => {
            execute_analyze(AnalyzeArgs {
                source,
                output_json: output,
                output_dot: dot,
                entry_function: entry,
                keep_duplicate_edges,
                dump,
                show_plan: plan,
            })?;
        }

        Commands::Validate { trace, report } => match (trace, report) {
            (Some(trace), _) => validate_trace_file(&trace)?,
            (None, Some(report)) => validate_report_file(&report)?,
            (None, None) => anyhow::bail!("Pass --trace or --report"),
        },

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
