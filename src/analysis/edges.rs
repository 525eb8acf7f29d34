//! Nested and call relationships between loops.

use crate::ast::{EntityKind, Link, NodeId, Pattern, ProgramAst};
use crate::utils::config::AnalysisConfig;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Relationship carried by a loop edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Outer loop -> immediate child loop
    Nested,
    /// Caller loop -> outermost loop of a directly called function
    Call,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nested => "nested",
            Self::Call => "call",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed edge between two loop sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopEdge {
    pub source: NodeId,
    pub dest: NodeId,
    pub kind: EdgeKind,
}

/// Derives loop edges from the program structure
#[derive(Debug, Clone)]
pub struct EdgeBuilder {
    dedup: bool,
}

impl Default for EdgeBuilder {
    fn default() -> Self {
        Self { dedup: true }
    }
}

impl EdgeBuilder {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            dedup: config.dedup_edges,
        }
    }

    /// Nested edges followed by call edges
    ///
    /// **Public** - main entry point for edge construction
    pub fn build<A: ProgramAst + ?Sized>(&self, ast: &A) -> Vec<LoopEdge> {
        let mut edges = Self::nested_edges(ast);
        edges.extend(Self::call_edges(ast));

        if self.dedup {
            let mut seen = HashSet::new();
            edges.retain(|edge| seen.insert(*edge));
        }

        info!("Built {} loop edges", edges.len());
        edges
    }

    /// One edge per (outer, inner) pair exactly one nesting hop apart
    pub fn nested_edges<A: ProgramAst + ?Sized>(ast: &A) -> Vec<LoopEdge> {
        let pattern = Pattern::new(EntityKind::Loop).then(Link::Direct, EntityKind::Loop);

        ast.query(&pattern)
            .iter()
            .filter_map(|row| match row.as_slice() {
                [outer, inner] => Some(LoopEdge {
                    source: *outer,
                    dest: *inner,
                    kind: EdgeKind::Nested,
                }),
                _ => None,
            })
            .collect()
    }

    /// Edges from each loop to the outermost loops of functions it calls
    ///
    /// Only calls in the loop's own scope count: a call that is reachable
    /// through a loop nested inside it belongs to that nested loop.
    /// Calls whose target is not a known function are skipped.
    pub fn call_edges<A: ProgramAst + ?Sized>(ast: &A) -> Vec<LoopEdge> {
        let all_calls = ast.query(
            &Pattern::new(EntityKind::Loop).then(Link::Descendant, EntityKind::CallExpr),
        );
        let nested_calls: HashSet<(NodeId, NodeId)> = ast
            .query(
                &Pattern::new(EntityKind::Loop)
                    .then(Link::Descendant, EntityKind::Loop)
                    .then(Link::Descendant, EntityKind::CallExpr),
            )
            .iter()
            .filter_map(|row| match row.as_slice() {
                [outer, _, call] => Some((*outer, *call)),
                _ => None,
            })
            .collect();

        let outermost = outermost_loops_by_function(ast);
        let mut edges = Vec::new();

        for row in &all_calls {
            let [caller, call] = row.as_slice() else {
                continue;
            };
            if nested_calls.contains(&(*caller, *call)) {
                continue;
            }

            let Some(callee) = ast.callee_name(*call) else {
                debug!("Call {} in loop {} has no named callee", call, caller);
                continue;
            };
            let Some(targets) = outermost.get(&callee) else {
                debug!("Call to '{}' in loop {} is unresolved", callee, caller);
                continue;
            };

            for target in targets.iter().filter(|t| *t != caller) {
                edges.push(LoopEdge {
                    source: *caller,
                    dest: *target,
                    kind: EdgeKind::Call,
                });
            }
        }

        edges
    }
}

/// Function name -> its outermost loops, in discovery order
fn outermost_loops_by_function<A: ProgramAst + ?Sized>(ast: &A) -> HashMap<String, Vec<NodeId>> {
    let mut map: HashMap<String, Vec<NodeId>> = HashMap::new();

    for function in ast.entities(EntityKind::Function) {
        let Some(name) = ast.node(function).ok().and_then(|n| n.name.clone()) else {
            continue;
        };
        let roots = ast
            .rank(function, EntityKind::Loop)
            .into_iter()
            .filter(|(_, chain)| chain.is_empty())
            .map(|(id, _)| id);
        map.entry(name).or_default().extend(roots);
    }

    map
}
