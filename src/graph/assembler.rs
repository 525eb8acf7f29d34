//! Merge static and dynamic loop attributes into a property graph.
//!
//! Every program node with a non-empty property map becomes a graph node,
//! in discovery order, and learns its `graph_index`. Edges are added only
//! after all nodes exist; an edge whose endpoint never received an index
//! is dropped.

use crate::analysis::LoopEdge;
use crate::ast::{NodeId, PropertyMap, PropertyValue, ProgramAst};
use log::{debug, info};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Heterogeneous loop graph: every node and edge owns a property map
#[derive(Debug, Clone, Default)]
pub struct LoopGraph {
    graph: DiGraph<PropertyMap, PropertyMap>,
}

impl LoopGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_properties(&self, index: usize) -> Option<&PropertyMap> {
        self.graph.node_weight(NodeIndex::new(index))
    }

    /// Properties of the first edge between two node indices
    pub fn edge_properties(&self, source: usize, dest: usize) -> Option<&PropertyMap> {
        let edge = self
            .graph
            .find_edge(NodeIndex::new(source), NodeIndex::new(dest))?;
        self.graph.edge_weight(edge)
    }

    /// Nodes as `(index, properties)`, in index order
    pub fn nodes(&self) -> impl Iterator<Item = (usize, &PropertyMap)> + '_ {
        self.graph
            .node_indices()
            .map(move |index| (index.index(), &self.graph[index]))
    }

    /// Edges as `(source, dest, properties)`, in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, &PropertyMap)> + '_ {
        self.graph
            .edge_references()
            .map(|edge| (edge.source().index(), edge.target().index(), edge.weight()))
    }
}

/// Node index -> formatted string
pub type NodeFormatter = fn(usize, &PropertyMap) -> Option<String>;

/// Edge properties -> formatted string
pub type EdgeFormatter = fn(&PropertyMap) -> Option<String>;

/// Read-only presentation hooks for an external visualizer
#[derive(Debug, Clone, Copy)]
pub struct GraphStyle {
    pub node_label: NodeFormatter,
    pub node_color: NodeFormatter,
    pub edge_label: EdgeFormatter,
    pub edge_color: EdgeFormatter,
}

impl Default for GraphStyle {
    fn default() -> Self {
        Self {
            node_label: default_node_label,
            node_color: default_node_color,
            edge_label: default_edge_label,
            edge_color: default_edge_color,
        }
    }
}

/// Loops above this share of program time are highlighted
const HOT_LOOP_PERCENTAGE: f64 = 50.0;

/// `id:<index>|{loop type:<type>|avg iter:<avg>}`
pub fn default_node_label(index: usize, props: &PropertyMap) -> Option<String> {
    let loop_type = props
        .get("loop_type")
        .and_then(|v| v.as_text())
        .unwrap_or("?");
    let avg = props
        .get("runtime_avg_iter")
        .and_then(|v| v.as_float())
        .unwrap_or(0.0);
    Some(format!(
        "id:{}|{{loop type:{}|avg iter:{}}}",
        index, loop_type, avg as i64
    ))
}

pub fn default_node_color(_index: usize, props: &PropertyMap) -> Option<String> {
    let share = props.get("percentage_runtime")?.as_float()?;
    (share >= HOT_LOOP_PERCENTAGE).then(|| "red".to_string())
}

pub fn default_edge_label(props: &PropertyMap) -> Option<String> {
    props
        .get("edge_type")
        .and_then(|v| v.as_text())
        .map(str::to_string)
}

/// Nested edges are blue; call edges keep the default color
pub fn default_edge_color(props: &PropertyMap) -> Option<String> {
    match props.get("edge_type").and_then(|v| v.as_text()) {
        Some("nested") => Some("blue".to_string()),
        _ => None,
    }
}

/// Builds the loop graph
pub struct GraphAssembler;

impl GraphAssembler {
    /// Assemble the graph from collected attributes and accepted edges
    ///
    /// **Public** - final pipeline stage
    ///
    /// # Arguments
    /// * `ast` - Program whose property storage holds the loop attributes;
    ///   each graph node's index is written back as `graph_index`
    /// * `edges` - Accepted loop edges
    pub fn assemble<A: ProgramAst + ?Sized>(ast: &mut A, edges: &[LoopEdge]) -> LoopGraph {
        let mut graph = DiGraph::new();
        let mut assigned: HashMap<NodeId, NodeIndex> = HashMap::new();

        for vertex in ast.vertices() {
            let Some(props) = ast.properties(vertex).filter(|p| !p.is_empty()) else {
                continue;
            };
            let mut props = props.clone();

            let index = graph.add_node(PropertyMap::new());
            let graph_index = PropertyValue::from(index.index());
            props.insert("graph_index".to_string(), graph_index.clone());
            graph[index] = props;

            ast.set_property(vertex, "graph_index", graph_index);
            assigned.insert(vertex, index);
        }

        for edge in edges {
            let (Some(&source), Some(&dest)) =
                (assigned.get(&edge.source), assigned.get(&edge.dest))
            else {
                debug!(
                    "Dropping {} edge {} -> {}: endpoint has no graph index",
                    edge.kind, edge.source, edge.dest
                );
                continue;
            };

            let mut props = PropertyMap::new();
            props.insert("edge_type".to_string(), edge.kind.as_str().into());
            graph.add_edge(source, dest, props);
        }

        info!(
            "Assembled loop graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        LoopGraph { graph }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::EdgeKind;
    use crate::ast::TreeAst;

    fn program_with_props() -> TreeAst {
        let json = r#"{ "kind": "FunctionDecl", "name": "f", "children": [
            { "kind": "ForStmt" }, { "kind": "ForStmt" }, { "kind": "ForStmt" }
        ]}"#;
        let mut ast = TreeAst::from_json(json).unwrap();
        ast.set_property(NodeId(1), "loop_type", "ForStmt".into());
        ast.set_property(NodeId(3), "loop_type", "ForStmt".into());
        ast
    }

    #[test]
    fn test_dense_indices_in_discovery_order() {
        let mut ast = program_with_props();
        let graph = GraphAssembler::assemble(&mut ast, &[]);

        assert_eq!(graph.node_count(), 2);
        let stored = |id: u32| {
            ast.properties(NodeId(id))
                .and_then(|p| p.get("graph_index"))
                .and_then(|v| v.as_int())
        };
        assert_eq!(stored(1), Some(0));
        assert_eq!(stored(3), Some(1));
        assert!(ast.properties(NodeId(2)).is_none());
        assert_eq!(
            graph.node_properties(1).unwrap().get("graph_index"),
            Some(&PropertyValue::Int(1))
        );
    }

    #[test]
    fn test_edge_to_unindexed_node_is_dropped() {
        let mut ast = program_with_props();
        let edges = [
            LoopEdge { source: NodeId(1), dest: NodeId(3), kind: EdgeKind::Call },
            LoopEdge { source: NodeId(1), dest: NodeId(2), kind: EdgeKind::Nested },
        ];
        let graph = GraphAssembler::assemble(&mut ast, &edges);

        assert_eq!(graph.edge_count(), 1);
        let props = graph.edge_properties(0, 1).unwrap();
        assert_eq!(props.get("edge_type"), Some(&PropertyValue::Text("call".into())));
    }

    #[test]
    fn test_style_hooks() {
        let style = GraphStyle::default();
        let mut node = PropertyMap::new();
        node.insert("loop_type".into(), "WhileStmt".into());
        node.insert("runtime_avg_iter".into(), PropertyValue::Float(6.0));
        node.insert("percentage_runtime".into(), PropertyValue::Float(75.0));

        assert_eq!(
            (style.node_label)(3, &node).as_deref(),
            Some("id:3|{loop type:WhileStmt|avg iter:6}")
        );
        assert_eq!((style.node_color)(3, &node).as_deref(), Some("red"));

        let mut edge = PropertyMap::new();
        edge.insert("edge_type".into(), "nested".into());
        assert_eq!((style.edge_color)(&edge).as_deref(), Some("blue"));
        edge.insert("edge_type".into(), "call".into());
        assert_eq!((style.edge_color)(&edge), None);
        assert_eq!((style.edge_label)(&edge).as_deref(), Some("call"));
    }
}
