//! Profile command implementation.
//!
//! The profile command:
//! 1. Loads the program's source tree
//! 2. Collects loops and derives nested/call edges
//! 3. Instruments a snapshot and runs it
//! 4. Aggregates the trace onto the loops
//! 5. Assembles the loop graph
//! 6. Writes output files

use super::models::{analysis_config, program_name, ProfileArgs};
use crate::aggregator::ProfileSummary;
use crate::analysis::LoopNode;
use crate::ast::TreeAst;
use crate::graph::GraphStyle;
use crate::output::{render_dot, write_dot, write_report};
use crate::parser::ProfileReport;
use crate::pipeline::LoopProfiler;
use crate::runner::{CommandExecutor, Executor, RecordedTrace};
use anyhow::{Context, Result};
use log::{debug, info};
use std::time::Instant;

/// Execute the profile command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Profile command arguments
///
/// # Returns
/// Ok if profiling succeeds, Err with context if any step fails
///
/// # Errors
/// * Source tree load failures
/// * Program build/run failures or a malformed trace
/// * File write errors
pub fn execute_profile(args: ProfileArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Starting profile of: {}", args.source.display());

    // Step 1: Load source tree
    info!("Step 1/6: Loading source tree...");
    let ast = TreeAst::load(&args.source)
        .with_context(|| format!("Failed to load source tree {}", args.source.display()))?;

    // Step 2: Static analysis
    info!("Step 2/6: Collecting loops and edges...");
    let config = analysis_config(&args.entry_function, args.keep_duplicate_edges);
    let mut profiler = LoopProfiler::new(ast, config);
    let loop_count = profiler.analyze().len();
    debug!("{} loops, {} edges", loop_count, profiler.edges().len());

    // Step 3: Instrument and execute
    info!("Step 3/6: Running instrumented program...");
    let executor = build_executor(&args)?;
    profiler
        .run(executor.as_ref())
        .context("Profiling run failed")?;

    // Step 4: Aggregated statistics
    info!("Step 4/6: Aggregating trace...");
    let program_time = profiler.summary().map(ProfileSummary::program_time);
    for node in profiler.loops().iter().take(3) {
        if let Some(stats) = &node.stats {
            debug!(
                "  {}: {} invocations, avg {:.1} iterations, {:.1}% runtime",
                node.tag,
                stats.dynamic_invocations,
                stats.runtime_avg_iter,
                stats.percentage_runtime
            );
        }
    }

    // Step 5: Assemble graph
    info!("Step 5/6: Assembling loop graph...");
    let graph = profiler.assemble();

    // Step 6: Write outputs
    info!("Step 6/6: Writing output files...");
    let report = ProfileReport::from_graph(
        &graph,
        program_name(&args.source),
        &args.entry_function,
        program_time,
    );
    write_report(&report, &args.output_json).context("Failed to write report JSON")?;
    info!("✓ Report written to: {}", args.output_json.display());

    if let Some(dot_path) = &args.output_dot {
        let dot = render_dot(&graph, &GraphStyle::default());
        write_dot(&dot, dot_path).context("Failed to write DOT graph")?;
        info!("✓ Loop graph written to: {}", dot_path.display());
    }

    if args.print_summary {
        print_summary(profiler.loops(), program_time.unwrap_or(0.0));
    }

    let elapsed = start_time.elapsed();
    info!("Profile completed in {:.2}s", elapsed.as_secs_f64());

    Ok(())
}

/// **Private** - pick the executor from the arguments
fn build_executor(args: &ProfileArgs) -> Result<Box<dyn Executor<TreeAst>>> {
    if let Some(mut executor) = CommandExecutor::from_argv(&args.command) {
        if let Some(trace) = &args.trace_file {
            executor = executor.with_trace_file(trace);
        }
        if let Some(plan) = &args.plan_file {
            executor = executor.with_plan_file(plan);
        }
        return Ok(Box::new(executor));
    }

    match &args.trace_file {
        Some(trace) => Ok(Box::new(RecordedTrace::new(trace))),
        None => anyhow::bail!("Either a run command or a recorded trace file is required"),
    }
}

fn print_summary(loops: &[LoopNode], program_time: f64) {
    println!("\n{}", "=".repeat(80));
    println!("LOOP PROFILE SUMMARY");
    println!("{}", "=".repeat(80));
    println!("Program time: {:.6}s", program_time);
    println!("Loops:        {}", loops.len());
    println!();
    println!(
        "{:<16} {:<16} {:>6} {:>10} {:>10} {:>8}",
        "TAG", "TYPE", "DEPTH", "CALLS", "AVG ITER", "% TIME"
    );
    for node in loops {
        let stats = node.stats.clone().unwrap_or_default();
        println!(
            "{:<16} {:<16} {:>6} {:>10} {:>10.1} {:>8.1}",
            node.tag,
            node.loop_type,
            node.nesting_depth,
            stats.dynamic_invocations,
            stats.runtime_avg_iter,
            stats.percentage_runtime
        );
    }
    println!("{}", "=".repeat(80));
}

/// Validate profile arguments
///
/// **Public** - can be called before execute_profile for early validation
///
/// # Arguments
/// * `args` - Arguments to validate
///
/// # Returns
/// Ok if arguments are valid, Err with message if not
pub fn validate_args(args: &ProfileArgs) -> Result<()> {
    if args.source.as_os_str().is_empty() {
        anyhow::bail!("Source tree path cannot be empty");
    }

    if args.command.is_empty() && args.trace_file.is_none() {
        anyhow::bail!("Provide a run command or a recorded trace file");
    }

    if args.command.is_empty() && args.plan_file.is_some() {
        anyhow::bail!("A plan file is only used together with a run command");
    }

    if args.entry_function.trim().is_empty() {
        anyhow::bail!("Entry function name cannot be empty");
    }

    if args.output_json.as_os_str().is_empty() {
        anyhow::bail!("Output path cannot be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn recorded() -> ProfileArgs {
        ProfileArgs {
            source: PathBuf::from("nest.json"),
            trace_file: Some(PathBuf::from("trace.txt")),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_args_valid() {
        assert!(validate_args(&recorded()).is_ok());
    }

    #[test]
    fn test_validate_args_empty_source() {
        let args = ProfileArgs {
            source: PathBuf::new(),
            ..recorded()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_no_trace_source() {
        let args = ProfileArgs {
            trace_file: None,
            ..recorded()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_command_without_trace_file() {
        let args = ProfileArgs {
            trace_file: None,
            command: vec!["./nest".to_string()],
            ..recorded()
        };
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_plan_without_command() {
        let args = ProfileArgs {
            plan_file: Some(PathBuf::from("plan.json")),
            ..recorded()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_blank_entry() {
        let args = ProfileArgs {
            entry_function: "  ".to_string(),
            ..recorded()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_build_executor_requires_a_source() {
        let args = ProfileArgs {
            trace_file: None,
            ..recorded()
        };
        assert!(build_executor(&args).is_err());
    }
}
