use crate::output::read_report;
use crate::parser::{count_kinds, parse_trace};
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::Path;

/// Validate a raw trace file without aggregating it
pub fn validate_trace_file(file_path: &Path) -> Result<()> {
    println!("Validating trace: {}", file_path.display());

    let raw = std::fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    let events = parse_trace(&raw).context("Malformed trace")?;
    let counts = count_kinds(&events);

    println!("✓ Valid trace");
    println!("  Events:         {}", counts.total());
    println!("  Loop timers:    {}", counts.loop_timers);
    println!("  Loop counters:  {}", counts.loop_counters);
    println!("  Program timers: {}", counts.program_timers);

    Ok(())
}

/// Validate a report JSON file
pub fn validate_report_file(file_path: &Path) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(file_path)?;

    println!("✓ Valid report JSON");
    println!("  Version:      {}", report.version);
    println!("  Program:      {}", report.program);
    println!("  Loops:        {}", report.loops.len());
    println!("  Edges:        {}", report.edges.len());
    println!("  Static bound: {}", report.static_bound_count());
    match report.program_time {
        Some(time) => println!("  Program time: {:.6}s", time),
        None => println!("  Program time: (static report)"),
    }

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Loopgraph Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string          - Schema version (e.g., '1.0.0')");
        println!("  program: string          - Source tree the loops came from");
        println!("  entry_function: string   - Function wrapped by the program timer");
        println!("  program_time: number?    - Whole-program seconds (dynamic reports)");
        println!("  loops: array             - Graph nodes, ordered by graph_index");
        println!("    id, tag, function, location, loop_type");
        println!("    nesting_depth, enclosing_loops, is_innermost, is_outermost");
        println!("    bound_expression, bound_static, graph_index");
        println!("    runtime_min_iter, runtime_max_iter, runtime_avg_iter");
        println!("    total_dynamic_iterations, dynamic_invocations");
        println!("    total_time, time_per_iteration, percentage_runtime");
        println!("  edges: array             - Graph edges");
        println!("    source: number         - Source graph_index");
        println!("    dest: number           - Destination graph_index");
        println!("    edge_type: string      - 'nested' or 'call'");
        println!("  generated_at: string     - ISO 8601 timestamp");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Loopgraph v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Correlated static/dynamic profiling of loop nests.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_trace_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[(1, 'a', 3),(0, 'a', 0.5),(2, 1.0)]").unwrap();
        assert!(validate_trace_file(file.path()).is_ok());
    }

    #[test]
    fn test_validate_malformed_trace_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[(1, 'a')]").unwrap();
        assert!(validate_trace_file(file.path()).is_err());
    }
}
