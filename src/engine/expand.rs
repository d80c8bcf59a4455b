//! Creating the nodes a path expression names but does not match.
//!
//! Expansion is planned against the unmodified tree and only then applied,
//! so a path that cannot be created leaves the tree untouched.

use super::Engine;
use crate::error::EngineError;
use treelens_pathx::{
    Axis, BinaryOperator, EvaluationContext, Expression, LocationPath, NodeTest, PathError, Step,
    evaluate, parse_expression,
};
use treelens_tree::{NodeId, validate_label};

/// The nodes to create: a chain of labels below an existing node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Expansion {
    pub(super) anchor: NodeId,
    pub(super) labels: Vec<String>,
}

fn not_creatable(expression: &str, message: impl Into<String>) -> EngineError {
    PathError::NotCreatable {
        expression: expression.to_string(),
        message: message.into(),
    }
    .into()
}

/// `[n]`, `[last()]` and `[last()+n]` select by position; for a missing
/// node they all mean "append a new one".
fn is_position_predicate(predicate: &Expression) -> bool {
    let is_last = |e: &Expression| {
        matches!(e, Expression::FunctionCall { name, args } if name == "last" && args.is_empty())
    };
    match predicate {
        Expression::Number(_) => true,
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Plus,
            right,
        } => is_last(left.as_ref()) && matches!(**right, Expression::Number(_)),
        other => is_last(other),
    }
}

fn creatable_label(expression: &str, step: &Step) -> Result<String, EngineError> {
    let NodeTest::Name(label) = &step.node_test else {
        return Err(not_creatable(expression, "cannot create a node for '*'"));
    };
    if step.axis != Axis::Child {
        return Err(not_creatable(
            expression,
            format!("cannot create '{}' along the {:?} axis", label, step.axis),
        ));
    }
    match step.predicates.as_slice() {
        [] => {}
        [p] if is_position_predicate(p) => {}
        _ => {
            return Err(not_creatable(
                expression,
                format!("cannot create '{}' to satisfy its predicates", label),
            ));
        }
    }
    validate_label(label)?;
    Ok(label.clone())
}

impl Engine {
    /// Finds the longest prefix of `path` that matches exactly one node and
    /// checks that the rest of the path can be created below it.
    pub(super) fn plan_expansion(
        &self,
        path: &str,
        context: Option<NodeId>,
    ) -> Result<Expansion, EngineError> {
        let Expression::LocationPath(location) = parse_expression(path)? else {
            return Err(not_creatable(path, "not a location path"));
        };

        let bindings = self.bindings();
        let root = self.tree.root_ref();
        let node = context.map_or(root, |id| self.tree.node_ref(id));
        let ctx = EvaluationContext::new(node, root, 1, 1, &bindings);

        for len in (0..=location.steps.len()).rev() {
            let prefix = Expression::LocationPath(LocationPath {
                start_point: location.start_point.clone(),
                is_absolute: location.is_absolute,
                steps: location.steps[..len].to_vec(),
            });
            let found = evaluate(&prefix, &ctx)?.into_nodes()?;
            match found.as_slice() {
                [] => continue,
                [anchor] => {
                    let labels = location.steps[len..]
                        .iter()
                        .map(|step| creatable_label(path, step))
                        .collect::<Result<Vec<_>, _>>()?;
                    return Ok(Expansion {
                        anchor: anchor.id(),
                        labels,
                    });
                }
                many => return Err(EngineError::multiple(path, many.len())),
            }
        }
        // Only an empty start point, such as an empty variable, gets here.
        Err(EngineError::NoMatch(path.to_string()))
    }

    pub(super) fn apply_expansion(&mut self, plan: Expansion) -> Result<NodeId, EngineError> {
        let mut current = plan.anchor;
        for label in &plan.labels {
            current = self.tree.append_child(current, label, None)?;
        }
        if !plan.labels.is_empty() {
            log::trace!("created {} node(s) below {}", plan.labels.len(), plan.anchor);
        }
        Ok(current)
    }

    /// Creates the nodes `path` names and returns the last one.
    pub(super) fn expand(
        &mut self,
        path: &str,
        context: Option<NodeId>,
    ) -> Result<NodeId, EngineError> {
        let plan = self.plan_expansion(path, context)?;
        self.apply_expansion(plan)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::tests::empty_engine;
    use crate::error::ErrorCode;

    #[test]
    fn test_expand_creates_chain() {
        let mut engine = empty_engine();
        let before = engine.tree().node_count();
        let plan = engine.plan_expansion("/x/y/z", None).unwrap();
        assert_eq!(plan.anchor, engine.tree().root());
        assert_eq!(plan.labels, vec!["x", "y", "z"]);
        // Planning alone changes nothing.
        assert_eq!(engine.tree().node_count(), before);

        engine.expand("/x/y/z", None).unwrap();
        assert_eq!(engine.match_paths("/x/y/z").unwrap(), vec!["/x/y/z"]);
    }

    #[test]
    fn test_expand_reuses_longest_prefix() {
        let mut engine = empty_engine();
        engine.set("/x/y", Some("1")).unwrap();
        let plan = engine.plan_expansion("/x/y/z", None).unwrap();
        assert_eq!(plan.labels, vec!["z"]);
    }

    #[test]
    fn test_ambiguous_prefix_fails_untouched() {
        let mut engine = empty_engine();
        engine.set("/x[1]/y", Some("1")).unwrap();
        engine.set("/x[last()+1]/y", Some("2")).unwrap();
        let before = engine.tree().node_count();

        let err = engine.set("/x/z", Some("3")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MultipleMatches);
        assert_eq!(engine.tree().node_count(), before);
    }

    #[test]
    fn test_uncreatable_steps() {
        let mut engine = empty_engine();
        for path in ["/x/*", "/x/y[z = '1']", "/x/descendant::y", "/x/..", "count(/x)"] {
            let err = engine.set(path, Some("1")).unwrap_err();
            assert_eq!(err.code(), ErrorCode::PathX, "path {}", path);
        }
        assert!(engine.match_paths("/x").unwrap().is_empty());
    }

    #[test]
    fn test_append_with_last_plus_one() {
        let mut engine = empty_engine();
        engine.set("/l/i[1]", Some("a")).unwrap();
        engine.set("/l/i[last()+1]", Some("b")).unwrap();
        engine.set("/l/i[last()+1]", Some("c")).unwrap();
        assert_eq!(
            engine.match_paths("/l/i").unwrap(),
            vec!["/l/i[1]", "/l/i[2]", "/l/i[3]"]
        );
        assert_eq!(engine.get("/l/i[3]").unwrap().as_deref(), Some("c"));
    }
}
