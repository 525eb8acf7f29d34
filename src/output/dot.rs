//! Graphviz DOT output for the loop graph.
//!
//! Labels and colors come from the [`GraphStyle`] hooks; the writer
//! only lays them out as a record-shaped digraph.

use super::json::{create_parent_dirs, validate_output_path};
use crate::graph::{GraphStyle, LoopGraph};
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Render the graph as DOT source
///
/// **Public** - main entry point for DOT output
pub fn render_dot(graph: &LoopGraph, style: &GraphStyle) -> String {
    let mut out = String::new();
    out.push_str("digraph loops {\n");
    out.push_str("    node [shape=record];\n");

    for (index, props) in graph.nodes() {
        let mut attrs = Vec::new();
        if let Some(label) = (style.node_label)(index, props) {
            attrs.push(format!("label=\"{}\"", escape_record(&label)));
        }
        if let Some(color) = (style.node_color)(index, props) {
            attrs.push(format!("color=\"{}\"", escape(&color)));
        }
        let _ = writeln!(out, "    n{}{};", index, attributes(&attrs));
    }

    for (source, dest, props) in graph.edges() {
        let mut attrs = Vec::new();
        if let Some(label) = (style.edge_label)(props) {
            attrs.push(format!("label=\"{}\"", escape(&label)));
        }
        if let Some(color) = (style.edge_color)(props) {
            attrs.push(format!("color=\"{}\"", escape(&color)));
        }
        let _ = writeln!(out, "    n{} -> n{}{};", source, dest, attributes(&attrs));
    }

    out.push_str("}\n");
    out
}

fn attributes(attrs: &[String]) -> String {
    if attrs.is_empty() {
        String::new()
    } else {
        format!(" [{}]", attrs.join(", "))
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Record labels keep `{ } |` as field structure; angle brackets are ports
fn escape_record(text: &str) -> String {
    escape(text).replace('<', "\\<").replace('>', "\\>")
}

/// Write DOT content to a file
///
/// **Public** - companion of [`render_dot`]
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::InvalidPath` - Path is invalid
pub fn write_dot(dot_content: &str, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing DOT graph to: {}", output_path.display());

    validate_output_path(output_path)?;
    if let Some(ext) = output_path.extension() {
        if ext != "dot" && ext != "gv" {
            debug!("Warning: File does not have .dot extension: {}", output_path.display());
        }
    }
    create_parent_dirs(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);

    writer
        .write_all(dot_content.as_bytes())
        .map_err(OutputError::WriteFailed)?;
    writer.flush().map_err(OutputError::WriteFailed)?;

    info!("DOT graph written successfully ({} bytes)", dot_content.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{EdgeKind, LoopEdge};
    use crate::ast::{NodeId, PropertyValue, ProgramAst, TreeAst};
    use crate::graph::GraphAssembler;

    fn two_node_graph() -> LoopGraph {
        let mut ast = TreeAst::from_json(
            r#"{ "kind": "FunctionDecl", "name": "f", "children": [
                { "kind": "ForStmt", "children": [{ "kind": "WhileStmt" }] }
            ]}"#,
        )
        .unwrap();
        ast.set_property(NodeId(1), "loop_type", "ForStmt".into());
        ast.set_property(NodeId(1), "runtime_avg_iter", PropertyValue::Float(6.0));
        ast.set_property(NodeId(2), "loop_type", "WhileStmt".into());

        let edges = [LoopEdge {
            source: NodeId(1),
            dest: NodeId(2),
            kind: EdgeKind::Nested,
        }];
        GraphAssembler::assemble(&mut ast, &edges)
    }

    #[test]
    fn test_render_dot() {
        let dot = render_dot(&two_node_graph(), &GraphStyle::default());

        assert!(dot.starts_with("digraph loops {"));
        assert!(dot.contains("n0 [label=\"id:0|{loop type:ForStmt|avg iter:6}\"];"));
        assert!(dot.contains("n0 -> n1 [label=\"nested\", color=\"blue\"];"));
    }

    #[test]
    fn test_escape_record() {
        assert_eq!(escape_record("a<b> \"c\""), "a\\<b\\> \\\"c\\\"");
    }

    #[test]
    fn test_write_dot_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/loops.dot");

        write_dot("digraph loops {}\n", &path).unwrap();

        assert!(path.exists());
    }
}
