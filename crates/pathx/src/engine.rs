//! Evaluates parsed expressions against any [`TreeNode`] tree.

use super::ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, Step};
use super::{axes, functions, operators};
use crate::error::PathError;
use crate::node::TreeNode;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;

/// What an expression evaluates to.
#[derive(Debug, Clone)]
pub enum PathValue<N> {
    NodeSet(Vec<N>),
    String(String),
    Number(f64),
    Boolean(bool),
    /// An unanchored regular expression, as produced by `regexp()` and `glob()`.
    Regexp(String),
}

impl<'a, N: TreeNode<'a>> PathValue<N> {
    pub fn to_bool(&self) -> bool {
        match self {
            PathValue::NodeSet(nodes) => !nodes.is_empty(),
            PathValue::String(s) => !s.is_empty(),
            PathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            PathValue::Boolean(b) => *b,
            PathValue::Regexp(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            PathValue::Number(n) => *n,
            PathValue::String(s) => s.trim().parse().unwrap_or(f64::NAN),
            PathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            PathValue::NodeSet(nodes) => nodes
                .first()
                .and_then(|n| n.value())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(f64::NAN),
            PathValue::Regexp(_) => f64::NAN,
        }
    }

    /// Unwraps a node-set, failing for every other kind of value.
    pub fn into_nodes(self) -> Result<Vec<N>, PathError> {
        match self {
            PathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(PathError::TypeError(format!(
                "expected a node-set, found {}",
                other.type_name()
            ))),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PathValue::NodeSet(_) => "node-set",
            PathValue::String(_) => "string",
            PathValue::Number(_) => "number",
            PathValue::Boolean(_) => "boolean",
            PathValue::Regexp(_) => "regexp",
        }
    }
}

impl<'a, N: TreeNode<'a>> fmt::Display for PathValue<N> {
    /// The string value; a node-set yields the value of its first node.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathValue::NodeSet(nodes) => write!(
                f,
                "{}",
                nodes.first().and_then(|n| n.value()).unwrap_or_default()
            ),
            PathValue::String(s) => write!(f, "{}", s),
            PathValue::Number(n) => write!(f, "{}", n),
            PathValue::Boolean(b) => write!(f, "{}", b),
            PathValue::Regexp(r) => write!(f, "{}", r),
        }
    }
}

/// The focus of an evaluation: context node, position and size, plus the
/// variables in scope. `'a` is the tree, `'d` the variable table.
pub struct EvaluationContext<'a, 'd, N: TreeNode<'a>> {
    pub context_node: N,
    pub root_node: N,
    /// 1-based.
    pub context_position: usize,
    pub context_size: usize,
    pub variables: &'d HashMap<String, PathValue<N>>,
    _marker: PhantomData<&'a ()>,
}

impl<'a, 'd, N: TreeNode<'a>> EvaluationContext<'a, 'd, N> {
    pub fn new(
        context_node: N,
        root_node: N,
        context_position: usize,
        context_size: usize,
        variables: &'d HashMap<String, PathValue<N>>,
    ) -> Self {
        Self {
            context_node,
            root_node,
            context_position,
            context_size,
            variables,
            _marker: PhantomData,
        }
    }

    /// A context positioned on the root of the tree `root` belongs to.
    pub fn at_root(root: N, variables: &'d HashMap<String, PathValue<N>>) -> Self {
        Self::new(root, root, 1, 1, variables)
    }

    fn focused(&self, node: N, position: usize, size: usize) -> Self {
        Self::new(node, self.root_node, position, size, self.variables)
    }
}

/// Evaluates `expr` with `ctx` as its focus.
pub fn evaluate<'a, N>(
    expr: &Expression,
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<PathValue<N>, PathError>
where
    N: TreeNode<'a> + 'a,
{
    match expr {
        Expression::Literal(s) => Ok(PathValue::String(s.clone())),
        Expression::Number(n) => Ok(PathValue::Number(*n)),
        Expression::LocationPath(path) => {
            let nodes = evaluate_location_path(path, ctx)?;
            Ok(PathValue::NodeSet(nodes))
        }
        Expression::Variable(name) => ctx
            .variables
            .get(name)
            .cloned()
            .ok_or_else(|| PathError::UnknownVariable(name.clone())),
        Expression::FunctionCall { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, ctx)?);
            }
            functions::evaluate_function(name, values, ctx)
        }
        Expression::Filter { expr, predicates } => {
            let nodes = evaluate(expr, ctx)?.into_nodes()?;
            let nodes = apply_predicates(nodes, predicates, ctx)?;
            Ok(PathValue::NodeSet(nodes))
        }
        Expression::BinaryOp { left, op, right } => {
            let lhs = evaluate(left, ctx)?;
            // `or` and `and` do not evaluate their right side when the left decides.
            match op {
                BinaryOperator::Or if lhs.to_bool() => return Ok(PathValue::Boolean(true)),
                BinaryOperator::And if !lhs.to_bool() => {
                    return Ok(PathValue::Boolean(false));
                }
                _ => {}
            }
            let rhs = evaluate(right, ctx)?;
            operators::evaluate(*op, lhs, rhs)
        }
        Expression::Negate(expr) => Ok(PathValue::Number(-evaluate(expr, ctx)?.to_number())),
    }
}

fn evaluate_location_path<'a, N>(
    path: &LocationPath,
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, PathError>
where
    N: TreeNode<'a> + 'a,
{
    let mut nodes = match &path.start_point {
        Some(start) => evaluate(start, ctx)?.into_nodes()?,
        None if path.is_absolute => vec![ctx.root_node],
        None => vec![ctx.context_node],
    };
    for step in &path.steps {
        nodes = evaluate_step(step, &nodes, ctx)?;
    }
    Ok(nodes)
}

/// Evaluates one step. Predicates see the nodes reached from each context
/// node separately, so `a/b[1]` selects the first `b` of every `a`.
fn evaluate_step<'a, N>(
    step: &Step,
    context_nodes: &[N],
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, PathError>
where
    N: TreeNode<'a> + 'a,
{
    let mut selected = Vec::new();
    for &node in context_nodes {
        let axis_nodes = collect_axis_nodes(step.axis, node);
        let tested_nodes = filter_by_node_test(axis_nodes, &step.node_test);
        selected.extend(apply_predicates(tested_nodes, &step.predicates, ctx)?);
    }
    Ok(document_order(selected))
}

/// The nodes along `axis` from `node`, nearest first.
fn collect_axis_nodes<'a, N>(axis: Axis, node: N) -> Vec<N>
where
    N: TreeNode<'a> + 'a,
{
    let mut found = Vec::new();
    match axis {
        Axis::Child => axes::collect_child_nodes(node, &mut found),
        Axis::Descendant => axes::collect_descendant_nodes(node, &mut found),
        Axis::DescendantOrSelf => {
            axes::collect_descendant_or_self_nodes(node, &mut found)
        }
        Axis::Parent => axes::collect_parent_nodes(node, &mut found),
        Axis::Ancestor => axes::collect_ancestor_nodes(node, &mut found),
        Axis::Root => axes::collect_root_nodes(node, &mut found),
        Axis::SelfAxis => axes::collect_self_nodes(node, &mut found),
        Axis::FollowingSibling => axes::collect_following_sibling_nodes(node, &mut found),
        Axis::PrecedingSibling => axes::collect_preceding_sibling_nodes(node, &mut found),
    }
    found
}

/// Keeps the nodes whose label passes `test`.
fn filter_by_node_test<'a, N>(mut nodes: Vec<N>, test: &NodeTest) -> Vec<N>
where
    N: TreeNode<'a> + 'a,
{
    if let NodeTest::Name(name) = test {
        nodes.retain(|node| node.label() == name);
    }
    nodes
}

/// Applies each predicate in turn; a number keeps only the node at that position.
fn apply_predicates<'a, N>(
    nodes: Vec<N>,
    predicates: &[Expression],
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, PathError>
where
    N: TreeNode<'a> + 'a,
{
    let mut kept = nodes;
    for predicate in predicates {
        let mut passed = Vec::new();
        let context_size = kept.len();
        for (i, node) in kept.iter().enumerate() {
            let focused = ctx.focused(*node, i + 1, context_size);
            let result = evaluate(predicate, &focused)?;
            let keep = match result {
                PathValue::Number(n) => n == (i + 1) as f64,
                _ => result.to_bool(),
            };
            if keep {
                passed.push(*node);
            }
        }
        kept = passed;
    }
    Ok(kept)
}

/// Removes duplicates and sorts nodes into document order (pre-order, siblings in order).
pub fn document_order<'a, N>(nodes: Vec<N>) -> Vec<N>
where
    N: TreeNode<'a> + 'a,
{
    let mut seen = HashSet::new();
    let mut keyed: Vec<(Vec<usize>, N)> = nodes
        .into_iter()
        .filter(|n| seen.insert(*n))
        .map(|n| (position_key(n), n))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, n)| n).collect()
}

/// Sibling indices from the root down to `node`; ordering these
/// lexicographically yields document order.
fn position_key<'a, N: TreeNode<'a>>(node: N) -> Vec<usize> {
    let mut key = Vec::new();
    let mut current = node;
    while let Some(parent) = current.parent() {
        key.push(current.sibling_index());
        current = parent;
    }
    key.reverse();
    key
}
