//! Loop discovery and static attribute collection.
//!
//! For every function, the rank query yields each loop together with its
//! chain of enclosing loops. The chain length is the nesting depth; an
//! empty chain marks an outermost loop.

use super::bound::{analyze_bound, BoundClass};
use crate::aggregator::LoopStats;
use crate::ast::{EntityKind, NodeId, PropertyMap, PropertyValue, ProgramAst, SourceLocation};
use crate::utils::error::AstError;
use log::{debug, info, warn};
use serde::Serialize;

/// One discovered loop site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopNode {
    pub id: NodeId,
    pub tag: String,
    pub function: String,
    pub location: SourceLocation,
    pub loop_type: String,
    pub nesting_depth: usize,
    /// Enclosing loops, outermost first
    pub enclosing_loops: Vec<NodeId>,
    pub is_innermost: bool,
    pub is_outermost: bool,
    pub bound_expression: Option<NodeId>,
    pub bound_class: BoundClass,
    pub bound_static: bool,

    /// Dynamic attributes, present once a trace has been aggregated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<LoopStats>,
}

impl LoopNode {
    /// Static attributes as a property map
    ///
    /// **Public** - used by the collector and the graph assembler
    pub fn properties(&self) -> PropertyMap {
        let mut map = PropertyMap::new();
        map.insert("id".into(), PropertyValue::Int(i64::from(self.id.0)));
        map.insert("tag".into(), self.tag.as_str().into());
        map.insert("function".into(), self.function.as_str().into());
        map.insert("location".into(), self.location.clone().into());
        map.insert("loop_type".into(), self.loop_type.as_str().into());
        map.insert("nesting_depth".into(), self.nesting_depth.into());
        map.insert(
            "enclosing_loops".into(),
            PropertyValue::List(
                self.enclosing_loops
                    .iter()
                    .map(|id| PropertyValue::Int(i64::from(id.0)))
                    .collect(),
            ),
        );
        map.insert("is_innermost".into(), self.is_innermost.into());
        map.insert("is_outermost".into(), self.is_outermost.into());
        map.insert("bound_expression".into(), self.bound_expression.into());
        map.insert("bound_static".into(), self.bound_static.into());

        if let Some(stats) = &self.stats {
            map.extend(stats.properties());
        }

        map
    }

    /// Attach the dynamic statistics from one aggregated run
    ///
    /// Returns false (and keeps the first value) if statistics were
    /// already attached.
    pub fn apply_stats(&mut self, stats: LoopStats) -> bool {
        if self.stats.is_some() {
            warn!("Loop '{}' already carries dynamic statistics", self.tag);
            return false;
        }
        self.stats = Some(stats);
        true
    }
}

/// Discovers loops and records their static attributes on the program
pub struct LoopCollector;

impl LoopCollector {
    /// Collect every loop of every function
    ///
    /// **Public** - main entry point for static analysis
    ///
    /// Each loop's attributes are also stored in the program's property
    /// storage. A loop that cannot be described is skipped with a warning;
    /// it never stops the pass.
    pub fn collect<A: ProgramAst + ?Sized>(ast: &mut A) -> Vec<LoopNode> {
        let mut loops = Vec::new();

        for function in ast.entities(EntityKind::Function) {
            let function_name = match ast.node(function) {
                Ok(node) => node.name.clone().unwrap_or_default(),
                Err(e) => {
                    warn!("Skipping function {}: {}", function, e);
                    continue;
                }
            };

            for (loop_id, chain) in ast.rank(function, EntityKind::Loop) {
                match Self::describe(&*ast, loop_id, &function_name, chain) {
                    Ok(node) => {
                        debug!(
                            "Loop {} ({}) in {}: depth {}, bound {:?}",
                            node.id, node.tag, node.function, node.nesting_depth, node.bound_class
                        );
                        ast.set_properties(loop_id, node.properties());
                        loops.push(node);
                    }
                    Err(e) => warn!("Skipping loop {}: {}", loop_id, e),
                }
            }
        }

        info!("Collected {} loops", loops.len());
        loops
    }

    fn describe<A: ProgramAst + ?Sized>(
        ast: &A,
        loop_id: NodeId,
        function: &str,
        chain: Vec<NodeId>,
    ) -> Result<LoopNode, AstError> {
        let node = ast.node(loop_id)?;
        let bound = analyze_bound(ast, loop_id);

        Ok(LoopNode {
            id: loop_id,
            tag: node.tag.clone(),
            function: function.to_string(),
            location: node.location.clone(),
            loop_type: node.kind.entity_name().to_string(),
            nesting_depth: chain.len(),
            is_outermost: chain.is_empty(),
            enclosing_loops: chain,
            is_innermost: ast.is_innermost(loop_id),
            bound_expression: bound.expression,
            bound_class: bound.class,
            bound_static: bound.class.is_static(),
            stats: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TreeAst;
    use serde_json::json;

    fn two_functions() -> TreeAst {
        let tree = json!({
            "kind": "TranslationUnit",
            "children": [
                { "kind": "FunctionDecl", "name": "a", "children": [
                    { "kind": "ForStmt", "tag": "a0", "children": [
                        { "kind": "DoStmt", "tag": "a1" }
                    ]}
                ]},
                { "kind": "FunctionDecl", "name": "b", "children": [
                    { "kind": "CXXForRangeStmt", "tag": "b0" }
                ]}
            ]
        });
        TreeAst::from_json(&tree.to_string()).unwrap()
    }

    #[test]
    fn test_collect_depths_and_flags() {
        let mut ast = two_functions();
        let loops = LoopCollector::collect(&mut ast);

        assert_eq!(loops.len(), 3);
        let a0 = &loops[0];
        let a1 = &loops[1];
        let b0 = &loops[2];

        assert_eq!((a0.nesting_depth, a0.is_outermost, a0.is_innermost), (0, true, false));
        assert_eq!((a1.nesting_depth, a1.is_outermost, a1.is_innermost), (1, false, true));
        assert_eq!(a1.enclosing_loops, vec![a0.id]);
        assert_eq!(b0.function, "b");
        assert_eq!(b0.loop_type, "CXXForRangeStmt");
    }

    #[test]
    fn test_malformed_loop_does_not_abort() {
        let mut ast = two_functions();
        let loops = LoopCollector::collect(&mut ast);

        // None of these loops carry a condition
        assert!(loops.iter().all(|l| l.bound_expression.is_none() && !l.bound_static));
    }

    #[test]
    fn test_properties_are_stored_on_program() {
        let mut ast = two_functions();
        let loops = LoopCollector::collect(&mut ast);
        let stored = ast.properties(loops[1].id).unwrap();

        assert_eq!(stored.get("tag"), Some(&PropertyValue::Text("a1".into())));
        assert_eq!(stored.get("nesting_depth"), Some(&PropertyValue::Int(1)));
        assert_eq!(stored.get("bound_expression"), Some(&PropertyValue::Node(None)));
        assert!(stored.get("runtime_avg_iter").is_none());
    }

    #[test]
    fn test_collection_is_repeatable() {
        let mut first = two_functions();
        let mut second = two_functions();
        assert_eq!(LoopCollector::collect(&mut first), LoopCollector::collect(&mut second));
    }

    #[test]
    fn test_apply_stats_once() {
        let mut ast = two_functions();
        let mut loops = LoopCollector::collect(&mut ast);

        assert!(loops[0].apply_stats(LoopStats::default()));
        assert!(!loops[0].apply_stats(LoopStats::default()));
        assert!(loops[0].properties().contains_key("dynamic_invocations"));
    }
}
