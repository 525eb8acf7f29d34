//! In-memory program-structure backend.
//!
//! Reads a syntax tree exported as JSON (one object per node with
//! `kind`, optional `name`/`tag`/`location`, an optional `condition`
//! subtree for loops and ordered `children`) and answers the
//! [`ProgramAst`] queries over an arena of nodes.

use super::property::{PropertyMap, PropertyValue};
use super::{
    default_tag, AstNode, EntityKind, Link, NodeId, NodeKind, Pattern, ProgramAst,
    SourceLocation,
};
use crate::instrument::{Placement, ProbeSite, ProbeWriter};
use crate::utils::error::{AstError, InstrumentError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Serialized form of one syntax node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceNode {
    /// Entity name, e.g. `ForStmt`, `CallExpr`, `IntegerLiteral`
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default)]
    pub location: SourceLocation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Box<SourceNode>>,

    #[serde(default)]
    pub children: Vec<SourceNode>,
}

/// Arena-backed [`ProgramAst`] implementation
#[derive(Debug, Clone, Default)]
pub struct TreeAst {
    nodes: Vec<AstNode>,
    properties: BTreeMap<NodeId, PropertyMap>,
    placements: Vec<Placement>,
}

impl TreeAst {
    /// Build the arena from a parsed source tree
    ///
    /// **Public** - main constructor
    ///
    /// # Errors
    /// * `AstError::InvalidTree` - unnamed function, condition on a non-loop
    pub fn from_source(root: &SourceNode) -> Result<Self, AstError> {
        let mut ast = Self::default();
        ast.insert(root, None)?;
        ast.warn_duplicate_tags();
        debug!("Loaded source tree with {} nodes", ast.len());
        Ok(ast)
    }

    pub fn from_json(json: &str) -> Result<Self, AstError> {
        let root: SourceNode = serde_json::from_str(json)?;
        Self::from_source(&root)
    }

    /// Load a JSON source tree from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AstError> {
        let path = path.as_ref();
        debug!("Reading source tree from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Probes written into this tree (snapshots only)
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn insert(&mut self, source: &SourceNode, parent: Option<NodeId>) -> Result<NodeId, AstError> {
        let kind: NodeKind = source.kind.parse().unwrap_or_else(|never| match never {});

        if kind == NodeKind::Function && source.name.is_none() {
            return Err(AstError::InvalidTree(
                "function node without a name".to_string(),
            ));
        }
        if source.condition.is_some() && !kind.is_loop() {
            return Err(AstError::InvalidTree(format!(
                "condition attached to non-loop node '{}'",
                source.kind
            )));
        }

        let raw_id = u32::try_from(self.nodes.len())
            .map_err(|_| AstError::InvalidTree("too many nodes".to_string()))?;
        let id = NodeId(raw_id);

        // Nodes without a file inherit the enclosing node's file
        let mut location = source.location.clone();
        if location.file.is_empty() {
            if let Some(parent) = parent.and_then(|p| self.nodes.get(p.0 as usize)) {
                location.file = parent.location.file.clone();
            }
        }

        let tag = source
            .tag
            .clone()
            .unwrap_or_else(|| default_tag(&kind, id));

        self.nodes.push(AstNode {
            id,
            kind,
            name: source.name.clone(),
            tag,
            location,
            parent,
            condition: None,
            children: Vec::new(),
        });

        if let Some(condition) = &source.condition {
            let cond_id = self.insert(condition, Some(id))?;
            self.nodes[id.0 as usize].condition = Some(cond_id);
        }

        for child in &source.children {
            let child_id = self.insert(child, Some(id))?;
            self.nodes[id.0 as usize].children.push(child_id);
        }

        Ok(id)
    }

    fn warn_duplicate_tags(&self) {
        let mut seen = HashSet::new();
        for node in self.nodes.iter().filter(|n| n.kind.is_loop()) {
            if !seen.insert(node.tag.as_str()) {
                warn!("Loop tag '{}' is used by more than one loop", node.tag);
            }
        }
    }

    fn get(&self, id: NodeId) -> Option<&AstNode> {
        self.nodes.get(id.0 as usize)
    }

    /// Nested functions (local class methods, lambdas) own their loops
    fn is_function(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.kind == NodeKind::Function)
    }

    /// Condition subtree first, then body children
    fn links(&self, id: NodeId) -> Vec<NodeId> {
        match self.get(id) {
            Some(node) => node
                .condition
                .into_iter()
                .chain(node.children.iter().copied())
                .collect(),
            None => Vec::new(),
        }
    }

    fn rank_walk(
        &self,
        id: NodeId,
        context: EntityKind,
        chain: &mut Vec<NodeId>,
        out: &mut Vec<(NodeId, Vec<NodeId>)>,
    ) {
        for child in self.links(id) {
            if self.is_function(child) {
                continue;
            }
            let is_context = self
                .get(child)
                .map(|n| context.matches(&n.kind))
                .unwrap_or(false);

            if is_context {
                out.push((child, chain.clone()));
                chain.push(child);
            }
            self.rank_walk(child, context, chain, out);
            if is_context {
                chain.pop();
            }
        }
    }

    fn matches_below(&self, from: NodeId, link: Link, kind: EntityKind) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.links(from).into_iter().rev().collect();

        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            if node.kind == NodeKind::Function {
                continue;
            }
            if kind.matches(&node.kind) {
                out.push(id);
            }
            if link == Link::Direct && node.kind.is_loop() {
                continue;
            }
            stack.extend(self.links(id).into_iter().rev());
        }

        out
    }
}

impl ProgramAst for TreeAst {
    fn entities(&self, kind: EntityKind) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| kind.matches(&n.kind))
            .map(|n| n.id)
            .collect()
    }

    fn node(&self, id: NodeId) -> Result<&AstNode, AstError> {
        self.get(id).ok_or(AstError::UnknownNode(id))
    }

    fn vertices(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.links(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            if self.is_function(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.links(next).into_iter().rev());
        }
        out
    }

    fn properties(&self, id: NodeId) -> Option<&PropertyMap> {
        self.properties.get(&id)
    }

    fn set_property(&mut self, id: NodeId, key: &str, value: PropertyValue) {
        self.properties
            .entry(id)
            .or_default()
            .insert(key.to_string(), value);
    }

    fn rank(&self, function: NodeId, context: EntityKind) -> Vec<(NodeId, Vec<NodeId>)> {
        let mut out = Vec::new();
        let mut chain = Vec::new();
        self.rank_walk(function, context, &mut chain, &mut out);
        out
    }

    fn query(&self, pattern: &Pattern) -> Vec<Vec<NodeId>> {
        let mut rows: Vec<Vec<NodeId>> = self
            .entities(pattern.first)
            .into_iter()
            .map(|id| vec![id])
            .collect();

        for (link, kind) in &pattern.steps {
            let mut extended = Vec::new();
            for row in rows {
                let Some(&last) = row.last() else {
                    continue;
                };
                for found in self.matches_below(last, *link, *kind) {
                    let mut next = row.clone();
                    next.push(found);
                    extended.push(next);
                }
            }
            rows = extended;
        }

        rows
    }

    fn snapshot(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            properties: self.properties.clone(),
            placements: Vec::new(),
        }
    }
}

impl ProbeWriter for TreeAst {
    fn place(&mut self, placement: &Placement) -> Result<(), InstrumentError> {
        let Some(node) = self.get(placement.target) else {
            return Err(InstrumentError::UnknownTarget(placement.target));
        };
        let fits = match placement.site {
            ProbeSite::ModuleBegin => node.kind == NodeKind::Module,
            ProbeSite::LoopScope | ProbeSite::LoopBodyBegin => node.kind.is_loop(),
            ProbeSite::FunctionBody => node.kind == NodeKind::Function,
        };
        if !fits {
            return Err(InstrumentError::Rejected(format!(
                "{:?} site on {} node {}",
                placement.site,
                node.kind.entity_name(),
                placement.target
            )));
        }
        self.placements.push(placement.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested_program() -> TreeAst {
        let tree = json!({
            "kind": "TranslationUnit",
            "location": { "file": "nest.cpp" },
            "children": [{
                "kind": "FunctionDecl",
                "name": "f",
                "children": [{
                    "kind": "ForStmt",
                    "tag": "outer",
                    "children": [{
                        "kind": "CompoundStmt",
                        "children": [{
                            "kind": "WhileStmt",
                            "tag": "middle",
                            "children": [{
                                "kind": "ForStmt",
                                "tag": "inner",
                                "children": [{ "kind": "CallExpr", "children": [
                                    { "kind": "DeclRefExpr", "name": "g" }
                                ]}]
                            }]
                        }]
                    }]
                }]
            }]
        });
        TreeAst::from_json(&tree.to_string()).unwrap()
    }

    fn loop_by_tag(ast: &TreeAst, tag: &str) -> NodeId {
        ast.entities(EntityKind::Loop)
            .into_iter()
            .find(|id| ast.node(*id).unwrap().tag == tag)
            .unwrap()
    }

    #[test]
    fn test_rank_chains() {
        let ast = nested_program();
        let function = ast.entities(EntityKind::Function)[0];
        let ranks = ast.rank(function, EntityKind::Loop);

        let depths: Vec<usize> = ranks.iter().map(|(_, chain)| chain.len()).collect();
        assert_eq!(depths, vec![0, 1, 2]);

        let outer = loop_by_tag(&ast, "outer");
        let middle = loop_by_tag(&ast, "middle");
        assert_eq!(ranks[2].1, vec![outer, middle]);
    }

    #[test]
    fn test_direct_query_skips_grandchildren() {
        let ast = nested_program();
        let pattern = Pattern::new(EntityKind::Loop).then(Link::Direct, EntityKind::Loop);
        let rows = ast.query(&pattern);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.len() == pattern.arity()));
    }

    #[test]
    fn test_descendant_query_reaches_nested_calls() {
        let ast = nested_program();
        let pattern = Pattern::new(EntityKind::Loop).then(Link::Descendant, EntityKind::CallExpr);
        assert_eq!(ast.query(&pattern).len(), 3);
    }

    #[test]
    fn test_callee_name_and_innermost() {
        let ast = nested_program();
        let call = ast.entities(EntityKind::CallExpr)[0];
        assert_eq!(ast.callee_name(call).as_deref(), Some("g"));
        assert!(ast.is_innermost(loop_by_tag(&ast, "inner")));
        assert!(!ast.is_innermost(loop_by_tag(&ast, "outer")));
    }

    #[test]
    fn test_file_is_inherited() {
        let ast = nested_program();
        let inner = loop_by_tag(&ast, "inner");
        assert_eq!(ast.node(inner).unwrap().location.file, "nest.cpp");
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut ast = nested_program();
        let outer = loop_by_tag(&ast, "outer");
        let mut copy = ast.snapshot();

        copy.set_property(outer, "probe", true.into());
        assert!(ast.properties(outer).is_none());

        ast.set_property(outer, "id", 1i64.into());
        assert!(copy.properties(outer).unwrap().get("id").is_none());
    }

    fn local_method_program() -> TreeAst {
        // void f() { for (...) { struct S { void g() { for (...) h(); } }; } }
        let tree = json!({
            "kind": "FunctionDecl",
            "name": "f",
            "children": [{
                "kind": "ForStmt",
                "tag": "outer",
                "children": [{
                    "kind": "CXXRecordDecl",
                    "children": [{
                        "kind": "CXXMethodDecl",
                        "name": "g",
                        "children": [{
                            "kind": "ForStmt",
                            "tag": "inner",
                            "children": [{ "kind": "CallExpr", "children": [
                                { "kind": "DeclRefExpr", "name": "h" }
                            ]}]
                        }]
                    }]
                }]
            }]
        });
        TreeAst::from_json(&tree.to_string()).unwrap()
    }

    #[test]
    fn test_walks_stop_at_nested_function() {
        let ast = local_method_program();
        let outer = loop_by_tag(&ast, "outer");
        let inner = loop_by_tag(&ast, "inner");
        let functions = ast.entities(EntityKind::Function);
        assert_eq!(functions.len(), 2);

        assert_eq!(ast.rank(functions[0], EntityKind::Loop), vec![(outer, vec![])]);
        assert_eq!(ast.rank(functions[1], EntityKind::Loop), vec![(inner, vec![])]);

        let nested = Pattern::new(EntityKind::Loop).then(Link::Direct, EntityKind::Loop);
        assert!(ast.query(&nested).is_empty());

        let calls = Pattern::new(EntityKind::Loop).then(Link::Descendant, EntityKind::CallExpr);
        let rows = ast.query(&calls);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], inner);

        assert!(ast.is_innermost(outer));
    }

    #[test]
    fn test_len_counts_every_node() {
        assert!(TreeAst::default().is_empty());

        let ast = local_method_program();
        assert_eq!(ast.len(), 7);
        assert_eq!(ast.vertices().len(), ast.len());
        assert!(!ast.is_empty());
    }

    #[test]
    fn test_condition_on_non_loop_is_rejected() {
        let tree = json!({
            "kind": "CallExpr",
            "condition": { "kind": "IntegerLiteral" }
        });
        let result = TreeAst::from_json(&tree.to_string());
        assert!(matches!(result, Err(AstError::InvalidTree(_))));
    }

    #[test]
    fn test_unnamed_function_is_rejected() {
        let result = TreeAst::from_json(r#"{ "kind": "FunctionDecl" }"#);
        assert!(result.is_err());
    }
}
