//! Static-only analysis: loops, edges and probe plan, no execution.

use super::models::{analysis_config, program_name, AnalyzeArgs};
use crate::ast::TreeAst;
use crate::graph::GraphStyle;
use crate::output::{dump_properties, properties_to_string, render_dot, write_dot, write_report};
use crate::parser::ProfileReport;
use crate::pipeline::LoopProfiler;
use anyhow::{Context, Result};
use log::info;

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
pub fn execute_analyze(args: AnalyzeArgs) -> Result<()> {
    let ast = TreeAst::load(&args.source)
        .with_context(|| format!("Failed to load source tree {}", args.source.display()))?;

    let config = analysis_config(&args.entry_function, args.keep_duplicate_edges);
    let mut profiler = LoopProfiler::new(ast, config);
    profiler.analyze();

    if args.show_plan {
        let plan = profiler.plan();
        println!(
            "{}",
            serde_json::to_string_pretty(&plan).context("Failed to serialize probe plan")?
        );
    }

    let graph = profiler.assemble();
    info!(
        "Loop graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    if args.dump {
        let dump = dump_properties(profiler.ast());
        println!("{}", properties_to_string(&dump)?);
    }

    if let Some(json_path) = &args.output_json {
        let report = ProfileReport::from_graph(
            &graph,
            program_name(&args.source),
            &args.entry_function,
            None,
        );
        write_report(&report, json_path).context("Failed to write report JSON")?;
        info!("✓ Static report written to: {}", json_path.display());
    }

    if let Some(dot_path) = &args.output_dot {
        let dot = render_dot(&graph, &GraphStyle::default());
        write_dot(&dot, dot_path).context("Failed to write DOT graph")?;
        info!("✓ Loop graph written to: {}", dot_path.display());
    }

    if !args.dump && !args.show_plan && args.output_json.is_none() && args.output_dot.is_none() {
        print_loops(&profiler);
    }

    Ok(())
}

fn print_loops(profiler: &LoopProfiler<TreeAst>) {
    println!("{:<16} {:<16} {:<12} {:>6}  BOUND", "TAG", "TYPE", "FUNCTION", "DEPTH");
    for node in profiler.loops() {
        println!(
            "{:<16} {:<16} {:<12} {:>6}  {:?}",
            node.tag, node.loop_type, node.function, node.nesting_depth, node.bound_class
        );
    }
    for edge in profiler.edges() {
        println!("{} -> {} ({})", edge.source, edge.dest, edge.kind);
    }
}
