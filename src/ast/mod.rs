//! Program-structure query capability.
//!
//! The analysis never parses source code itself. It talks to a
//! [`ProgramAst`] backend that can:
//! - enumerate entities by kind (loops, functions, call expressions)
//! - store arbitrary typed properties per entity
//! - rank loops inside a function by their enclosing-loop chain
//! - answer adjacency-pattern queries (loop-in-loop, loop-to-call)
//! - produce an independent mutable snapshot for instrumentation
//!
//! [`TreeAst`] is the in-memory backend fed from a JSON syntax tree.

pub mod property;
pub mod tree;

pub use property::{PropertyMap, PropertyValue};
pub use tree::{SourceNode, TreeAst};

use crate::utils::error::AstError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one node in the program structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Syntactic loop variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopKind {
    /// Three-clause `for (init; test; step)`
    For,
    While,
    DoWhile,
    /// `for (x : range)`, which has no test clause
    RangeFor,
}

impl LoopKind {
    /// Entity name reported as the loop's `loop_type`
    pub fn entity_name(&self) -> &'static str {
        match self {
            Self::For => "ForStmt",
            Self::While => "WhileStmt",
            Self::DoWhile => "DoStmt",
            Self::RangeFor => "CXXForRangeStmt",
        }
    }

    /// Count-style loops only have their bound operand examined
    pub fn is_count_style(&self) -> bool {
        matches!(self, Self::For)
    }

    fn short_name(&self) -> &'static str {
        match self {
            Self::For => "for",
            Self::While => "while",
            Self::DoWhile => "do",
            Self::RangeFor => "range_for",
        }
    }
}

/// Kind of a syntax node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Module,
    Function,
    Loop(LoopKind),
    CallExpr,
    DeclRef,
    IntegerLiteral,
    BoolLiteral,
    BinaryOperator,
    UnaryOperator,
    Other(String),
}

impl std::str::FromStr for NodeKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "TranslationUnit" | "TranslationUnitDecl" | "Module" => Self::Module,
            "FunctionDecl" | "CXXMethodDecl" | "Function" => Self::Function,
            "ForStmt" | "for" => Self::Loop(LoopKind::For),
            "WhileStmt" | "while" => Self::Loop(LoopKind::While),
            "DoStmt" | "do" => Self::Loop(LoopKind::DoWhile),
            "CXXForRangeStmt" | "range_for" => Self::Loop(LoopKind::RangeFor),
            "CallExpr" | "CXXMemberCallExpr" | "call" => Self::CallExpr,
            "DeclRefExpr" | "ref" => Self::DeclRef,
            "IntegerLiteral" | "int" => Self::IntegerLiteral,
            "CXXBoolLiteralExpr" | "bool" => Self::BoolLiteral,
            "BinaryOperator" | "CompoundAssignOperator" | "binop" => Self::BinaryOperator,
            "UnaryOperator" | "unop" => Self::UnaryOperator,
            other => Self::Other(other.to_string()),
        })
    }
}

impl NodeKind {
    pub fn entity_name(&self) -> &str {
        match self {
            Self::Module => "TranslationUnit",
            Self::Function => "FunctionDecl",
            Self::Loop(kind) => kind.entity_name(),
            Self::CallExpr => "CallExpr",
            Self::DeclRef => "DeclRefExpr",
            Self::IntegerLiteral => "IntegerLiteral",
            Self::BoolLiteral => "CXXBoolLiteralExpr",
            Self::BinaryOperator => "BinaryOperator",
            Self::UnaryOperator => "UnaryOperator",
            Self::Other(name) => name,
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Self::Loop(_))
    }
}

/// Typed entity predicate used for enumeration and pattern queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Module,
    Function,
    Loop,
    CallExpr,
}

impl EntityKind {
    pub fn matches(&self, kind: &NodeKind) -> bool {
        match self {
            Self::Module => matches!(kind, NodeKind::Module),
            Self::Function => matches!(kind, NodeKind::Function),
            Self::Loop => kind.is_loop(),
            Self::CallExpr => matches!(kind, NodeKind::CallExpr),
        }
    }
}

/// File/line/column range of a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub end_column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}-{}:{}",
            self.file, self.line, self.column, self.end_line, self.end_column
        )
    }
}

/// One node of the program structure
#[derive(Debug, Clone)]
pub struct AstNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: Option<String>,
    /// Stable label used to correlate loops with trace events
    pub tag: String,
    pub location: SourceLocation,
    pub parent: Option<NodeId>,
    /// Termination condition subtree (loops only)
    pub condition: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl AstNode {
    pub fn loop_kind(&self) -> Option<LoopKind> {
        match self.kind {
            NodeKind::Loop(kind) => Some(kind),
            _ => None,
        }
    }
}

pub(crate) fn default_tag(kind: &NodeKind, id: NodeId) -> String {
    match kind {
        NodeKind::Loop(loop_kind) => format!("{}_{}", loop_kind.short_name(), id),
        _ => format!("n{}", id),
    }
}

/// How two consecutive pattern steps are related
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Descendant with no loop strictly between the two nodes
    Direct,
    /// Any descendant
    Descendant,
}

/// Declarative adjacency pattern, e.g. `loop => loop => call`
#[derive(Debug, Clone)]
pub struct Pattern {
    pub(crate) first: EntityKind,
    pub(crate) steps: Vec<(Link, EntityKind)>,
}

impl Pattern {
    pub fn new(first: EntityKind) -> Self {
        Self {
            first,
            steps: Vec::new(),
        }
    }

    pub fn then(mut self, link: Link, kind: EntityKind) -> Self {
        self.steps.push((link, kind));
        self
    }

    /// Number of entities in each matched row
    pub fn arity(&self) -> usize {
        self.steps.len() + 1
    }
}

/// Abstract program-structure capability consumed by the analysis
pub trait ProgramAst {
    /// All entities of a kind, in discovery order
    fn entities(&self, kind: EntityKind) -> Vec<NodeId>;

    fn node(&self, id: NodeId) -> Result<&AstNode, AstError>;

    /// Every vertex of the structure, in discovery order
    fn vertices(&self) -> Vec<NodeId>;

    /// All nodes strictly below `id`, in discovery order
    fn descendants(&self, id: NodeId) -> Vec<NodeId>;

    fn properties(&self, id: NodeId) -> Option<&PropertyMap>;

    fn set_property(&mut self, id: NodeId, key: &str, value: PropertyValue);

    /// For every `context` entity inside `function`, the ordered chain of
    /// enclosing `context` entities (outermost first)
    fn rank(&self, function: NodeId, context: EntityKind) -> Vec<(NodeId, Vec<NodeId>)>;

    /// Rows of entity ids matching the pattern, one id per step
    fn query(&self, pattern: &Pattern) -> Vec<Vec<NodeId>>;

    /// Independent mutable copy; changes to it never reach `self`
    fn snapshot(&self) -> Self
    where
        Self: Sized;

    fn condition(&self, loop_id: NodeId) -> Result<NodeId, AstError> {
        self.node(loop_id)?
            .condition
            .ok_or(AstError::MissingCondition(loop_id))
    }

    fn is_innermost(&self, loop_id: NodeId) -> bool {
        !self.descendants(loop_id).into_iter().any(|id| {
            self.node(id)
                .map(|node| node.kind.is_loop())
                .unwrap_or(false)
        })
    }

    /// Name of the function a call expression invokes, if it names one
    fn callee_name(&self, call: NodeId) -> Option<String> {
        let node = self.node(call).ok()?;
        let callee = *node.children.first()?;
        self.node(callee).ok()?.name.clone()
    }

    fn set_properties(&mut self, id: NodeId, properties: PropertyMap) {
        for (key, value) in properties {
            self.set_property(id, &key, value);
        }
    }
}
