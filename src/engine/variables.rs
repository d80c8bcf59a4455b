//! Named variables: `defvar` and `defnode`.

use super::Engine;
use crate::error::EngineError;
use treelens_pathx::PathValue;
use treelens_tree::{NodeId, NodeRef, Tree};

/// A stored variable. Node-sets hold identities, so nodes deleted after the
/// definition silently drop out.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Variable {
    Nodes(Vec<NodeId>),
    String(String),
    Number(f64),
    Boolean(bool),
    Regexp(String),
}

impl Variable {
    fn from_value(value: PathValue<NodeRef<'_>>) -> Self {
        match value {
            PathValue::NodeSet(nodes) => Variable::Nodes(nodes.iter().map(NodeRef::id).collect()),
            PathValue::String(s) => Variable::String(s),
            PathValue::Number(n) => Variable::Number(n),
            PathValue::Boolean(b) => Variable::Boolean(b),
            PathValue::Regexp(r) => Variable::Regexp(r),
        }
    }

    pub(super) fn resolve<'a>(&self, tree: &'a Tree) -> PathValue<NodeRef<'a>> {
        match self {
            Variable::Nodes(ids) => PathValue::NodeSet(
                ids.iter()
                    .filter(|id| tree.contains(**id))
                    .map(|id| tree.node_ref(*id))
                    .collect(),
            ),
            Variable::String(s) => PathValue::String(s.clone()),
            Variable::Number(n) => PathValue::Number(*n),
            Variable::Boolean(b) => PathValue::Boolean(*b),
            Variable::Regexp(r) => PathValue::Regexp(r.clone()),
        }
    }
}

fn validate_name(name: &str) -> Result<(), EngineError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(EngineError::BadArgument(format!("invalid variable name '{}'", name)))
    }
}

impl Engine {
    /// Binds `$name` to the result of `expr`, or removes the binding when
    /// `expr` is `None`.
    ///
    /// Returns the number of nodes bound, `0` for scalars. A node-set of more
    /// than one node is rejected and leaves the previous binding in place.
    pub fn defvar(&mut self, name: &str, expr: Option<&str>) -> Result<usize, EngineError> {
        self.diagnostics.reset();
        let result = self.defvar_inner(name, expr);
        self.diagnostics.track(result)
    }

    fn defvar_inner(&mut self, name: &str, expr: Option<&str>) -> Result<usize, EngineError> {
        validate_name(name)?;
        let Some(expr) = expr else {
            if self.variables.remove(name).is_some() {
                log::debug!("undefined ${}", name);
            }
            return Ok(0);
        };

        let variable = Variable::from_value(self.evaluate_expr(expr, None)?);
        let count = match &variable {
            Variable::Nodes(ids) if ids.len() > 1 => {
                return Err(EngineError::multiple(expr, ids.len()));
            }
            Variable::Nodes(ids) => ids.len(),
            _ => 0,
        };
        log::debug!("defined ${} = {} ({} node(s))", name, expr, count);
        self.variables.insert(name.to_string(), variable);
        Ok(count)
    }

    /// Binds `$name` to the nodes `expr` selects, creating one node with
    /// `value` when nothing matches.
    ///
    /// Returns the number of bound nodes and whether a node was created.
    pub fn defnode(
        &mut self,
        name: &str,
        expr: &str,
        value: Option<&str>,
    ) -> Result<(usize, bool), EngineError> {
        self.diagnostics.reset();
        let result = self.defnode_inner(name, expr, value);
        self.diagnostics.track(result)
    }

    fn defnode_inner(
        &mut self,
        name: &str,
        expr: &str,
        value: Option<&str>,
    ) -> Result<(usize, bool), EngineError> {
        validate_name(name)?;
        if expr.trim().is_empty() {
            return Err(EngineError::BadArgument(
                "defnode needs a path expression".to_string(),
            ));
        }

        let existing = self.select(expr, None)?;
        let (nodes, created) = if existing.is_empty() {
            let id = self.expand(expr, None)?;
            self.tree.set_value(id, value.map(str::to_string))?;
            (vec![id], true)
        } else {
            (existing, false)
        };
        let count = nodes.len();
        self.variables.insert(name.to_string(), Variable::Nodes(nodes));
        Ok((count, created))
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::tests::empty_engine;
    use crate::error::ErrorCode;

    #[test]
    fn test_defvar_node_set_and_use() {
        let mut engine = empty_engine();
        engine.set("/a/b", Some("1")).unwrap();
        assert_eq!(engine.defvar("x", Some("/a/b")).unwrap(), 1);
        assert_eq!(engine.get("$x").unwrap().as_deref(), Some("1"));
        assert_eq!(engine.match_paths("$x/..").unwrap(), vec!["/a"]);
    }

    #[test]
    fn test_defvar_multiple_matches_keeps_table() {
        let mut engine = empty_engine();
        engine.set("/a/b[1]", Some("1")).unwrap();
        assert_eq!(engine.defvar("x", Some("/a/b")).unwrap(), 1);
        engine.set("/a/b[last()+1]", Some("2")).unwrap();

        let err = engine.defvar("x", Some("/a/b")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MultipleMatches);
        assert_eq!(engine.error().code, ErrorCode::MultipleMatches);
        // The old binding survives.
        assert_eq!(engine.get("$x").unwrap().as_deref(), Some("1"));

        assert_eq!(engine.defvar("x", None).unwrap(), 0);
        assert_eq!(engine.error().code, ErrorCode::NoError);
        assert!(engine.get("$x").is_err());
        // Removing an unbound variable succeeds too.
        assert_eq!(engine.defvar("never", None).unwrap(), 0);
    }

    #[test]
    fn test_defvar_scalar() {
        let mut engine = empty_engine();
        engine.set("/n", Some("3")).unwrap();
        assert_eq!(engine.defvar("limit", Some("2 + 1")).unwrap(), 0);
        assert_eq!(engine.match_paths("/n[. = $limit]").unwrap(), vec!["/n"]);
    }

    #[test]
    fn test_snapshot_drops_deleted_nodes() {
        let mut engine = empty_engine();
        engine.set("/a", Some("1")).unwrap();
        engine.defvar("a", Some("/a")).unwrap();
        engine.rm("/a").unwrap();
        assert!(engine.match_paths("$a").unwrap().is_empty());

        // A new node with the same path is not the same node.
        engine.set("/a", Some("2")).unwrap();
        assert!(engine.match_paths("$a").unwrap().is_empty());
    }

    #[test]
    fn test_defnode_creates_once() {
        let mut engine = empty_engine();
        assert_eq!(engine.defnode("n", "/a/b", Some("v")).unwrap(), (1, true));
        assert_eq!(engine.get("$n").unwrap().as_deref(), Some("v"));
        assert_eq!(engine.defnode("n", "/a/b", Some("ignored")).unwrap(), (1, false));
        assert_eq!(engine.get("/a/b").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_defnode_requires_expression() {
        let mut engine = empty_engine();
        let err = engine.defnode("n", "", None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadArg);
        assert!(engine.defvar("1bad", Some("/a")).is_err());
    }
}
