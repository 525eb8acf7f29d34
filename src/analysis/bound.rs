//! Constant-bound analysis over loop termination conditions.
//!
//! A loop is constant-bound when the part of its condition that decides
//! the trip count is built only from integer literals and operators.
//! Three-clause `for` loops examine only the bound operand of their test
//! (`i < 10` examines `10`); condition-style loops examine the children
//! of the condition root, so a bare `while (n)` or `while (1)` is not
//! constant.

use crate::ast::{NodeId, NodeKind, ProgramAst};
use crate::utils::error::AstError;
use log::debug;
use serde::{Deserialize, Serialize};

/// Verdict of the bound analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundClass {
    ConstantBound,
    DynamicBound,
    /// The condition could not be examined (e.g. `for (;;)`)
    Indeterminate,
}

impl BoundClass {
    pub fn is_static(&self) -> bool {
        matches!(self, Self::ConstantBound)
    }
}

/// Result of analysing one loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAnalysis {
    /// Root of the condition subtree, `None` when indeterminate
    pub expression: Option<NodeId>,
    pub class: BoundClass,
}

/// Constant predicate over a list of sibling nodes
///
/// **Public** - core recursive rule
///
/// - empty list: not constant
/// - integer literal: keep scanning
/// - call or variable reference: not constant
/// - unary/binary operator: the verdict of its children, without
///   scanning the remaining siblings
/// - anything else: skipped
pub fn is_constant<A: ProgramAst + ?Sized>(ast: &A, nodes: &[NodeId]) -> bool {
    if nodes.is_empty() {
        return false;
    }

    for &id in nodes {
        let Ok(node) = ast.node(id) else {
            continue;
        };
        match node.kind {
            NodeKind::IntegerLiteral => continue,
            NodeKind::CallExpr | NodeKind::DeclRef => return false,
            NodeKind::BinaryOperator | NodeKind::UnaryOperator => {
                return is_constant(ast, &node.children);
            }
            _ => {}
        }
    }

    true
}

/// Classify the condition of one loop
///
/// # Returns
/// The condition root and its class
///
/// # Errors
/// * `AstError::MissingCondition` - loop form without a condition clause
/// * `AstError::MissingBoundOperand` - count-style test without a bound operand
/// * `AstError::InvalidTree` - `loop_id` is not a loop
pub fn classify_condition<A: ProgramAst + ?Sized>(
    ast: &A,
    loop_id: NodeId,
) -> Result<(NodeId, BoundClass), AstError> {
    let loop_kind = ast
        .node(loop_id)?
        .loop_kind()
        .ok_or_else(|| AstError::InvalidTree(format!("node {} is not a loop", loop_id)))?;

    let condition = ast.condition(loop_id)?;
    let condition_node = ast.node(condition)?;

    if condition_node.kind == NodeKind::BoolLiteral {
        return Ok((condition, BoundClass::ConstantBound));
    }

    let examined = if loop_kind.is_count_style() {
        let bound = condition_node
            .children
            .get(1)
            .copied()
            .ok_or(AstError::MissingBoundOperand(loop_id))?;
        vec![bound]
    } else {
        condition_node.children.clone()
    };

    let class = if is_constant(ast, &examined) {
        BoundClass::ConstantBound
    } else {
        BoundClass::DynamicBound
    };

    Ok((condition, class))
}

/// Analyse a loop, folding structural errors into `Indeterminate`
pub fn analyze_bound<A: ProgramAst + ?Sized>(ast: &A, loop_id: NodeId) -> BoundAnalysis {
    match classify_condition(ast, loop_id) {
        Ok((expression, class)) => BoundAnalysis {
            expression: Some(expression),
            class,
        },
        Err(e) => {
            debug!("Bound of loop {} is indeterminate: {}", loop_id, e);
            BoundAnalysis {
                expression: None,
                class: BoundClass::Indeterminate,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{EntityKind, TreeAst};
    use serde_json::{json, Value};

    fn single_loop(kind: &str, condition: Option<Value>) -> (TreeAst, NodeId) {
        let mut node = json!({ "kind": kind, "children": [] });
        if let Some(condition) = condition {
            node["condition"] = condition;
        }
        let tree = json!({ "kind": "FunctionDecl", "name": "f", "children": [node] });
        let ast = TreeAst::from_json(&tree.to_string()).unwrap();
        let id = ast.entities(EntityKind::Loop)[0];
        (ast, id)
    }

    fn lit() -> Value {
        json!({ "kind": "IntegerLiteral" })
    }

    fn var(name: &str) -> Value {
        json!({ "kind": "DeclRefExpr", "name": name })
    }

    fn binop(lhs: Value, rhs: Value) -> Value {
        json!({ "kind": "BinaryOperator", "children": [lhs, rhs] })
    }

    #[test]
    fn test_for_examines_only_bound_operand() {
        let (ast, id) = single_loop("ForStmt", Some(binop(var("i"), lit())));
        assert_eq!(analyze_bound(&ast, id).class, BoundClass::ConstantBound);

        let (ast, id) = single_loop("ForStmt", Some(binop(var("i"), var("n"))));
        assert_eq!(analyze_bound(&ast, id).class, BoundClass::DynamicBound);
    }

    #[test]
    fn test_while_examines_whole_condition() {
        let (ast, id) = single_loop("WhileStmt", Some(binop(var("i"), lit())));
        assert_eq!(analyze_bound(&ast, id).class, BoundClass::DynamicBound);

        let arith = binop(binop(lit(), lit()), lit());
        let (ast, id) = single_loop("WhileStmt", Some(arith));
        assert!(analyze_bound(&ast, id).class.is_static());
    }

    #[test]
    fn test_wrapped_while_condition_is_dynamic() {
        // while ((i < n))
        let paren = json!({ "kind": "ParenExpr", "children": [binop(var("i"), var("n"))] });
        let (ast, id) = single_loop("WhileStmt", Some(paren));
        assert_eq!(analyze_bound(&ast, id).class, BoundClass::DynamicBound);

        let (ast, id) = single_loop("WhileStmt", Some(lit()));
        assert_eq!(analyze_bound(&ast, id).class, BoundClass::DynamicBound);
    }

    #[test]
    fn test_bool_literal_is_constant() {
        let (ast, id) = single_loop("WhileStmt", Some(json!({ "kind": "CXXBoolLiteralExpr" })));
        let analysis = analyze_bound(&ast, id);
        assert_eq!(analysis.class, BoundClass::ConstantBound);
        assert!(analysis.expression.is_some());
    }

    #[test]
    fn test_missing_condition_is_indeterminate() {
        let (ast, id) = single_loop("ForStmt", None);
        let analysis = analyze_bound(&ast, id);
        assert_eq!(analysis.class, BoundClass::Indeterminate);
        assert_eq!(analysis.expression, None);
        assert!(!analysis.class.is_static());
    }

    #[test]
    fn test_count_style_without_bound_operand() {
        let (ast, id) = single_loop("ForStmt", Some(var("running")));
        assert!(matches!(
            classify_condition(&ast, id),
            Err(AstError::MissingBoundOperand(_))
        ));
    }

    #[test]
    fn test_call_in_bound_is_dynamic() {
        let call = json!({ "kind": "CallExpr", "children": [var("size")] });
        let (ast, id) = single_loop("ForStmt", Some(binop(var("i"), binop(call, lit()))));
        assert_eq!(analyze_bound(&ast, id).class, BoundClass::DynamicBound);
    }

    #[test]
    fn test_operator_short_circuits_siblings() {
        // The first operator decides; the trailing reference is never scanned
        let tree = json!({
            "kind": "CompoundStmt",
            "children": [binop(lit(), lit()), var("n")]
        });
        let ast = TreeAst::from_json(&tree.to_string()).unwrap();
        let node = ast.node(NodeId(0)).unwrap();
        assert!(is_constant(&ast, &node.children));
    }

    #[test]
    fn test_empty_list_is_not_constant() {
        let ast = TreeAst::default();
        assert!(!is_constant(&ast, &[]));
    }
}
