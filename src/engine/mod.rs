//! The engine handle: one tree, its variables, its lenses and the files
//! they were loaded from.
//!
//! Every public operation resets the diagnostics record on entry and records
//! its failure before returning, so [`Engine::error`] always describes the
//! most recent call.

mod expand;
mod mutation;
mod span;
mod text;
mod transform;
mod variables;

pub use span::SpanInfo;

use crate::config::{EngineConfig, Flags};
use crate::diagnostics::{Diagnostics, ErrorInfo};
use crate::error::EngineError;
use std::collections::{BTreeMap, HashMap};
use treelens_lens::LensRegistry;
use treelens_pathx::{EvaluationContext, PathValue, evaluate, parse_expression};
use treelens_resource::FilesystemFileProvider;
use treelens_traits::FileProvider;
use treelens_tree::{NodeId, NodeRef, Tree};
use variables::Variable;

/// A handle on one configuration tree.
///
/// Handles are independent of each other. All operations are synchronous;
/// share a handle between threads behind a `Mutex`.
#[derive(Debug)]
pub struct Engine {
    tree: Tree,
    variables: HashMap<String, Variable>,
    diagnostics: Diagnostics,
    lenses: LensRegistry,
    provider: Box<dyn FileProvider>,
    config: EngineConfig,
    /// Files from the last load or save, by path, with their text at that time.
    files: BTreeMap<String, transform::LoadedFile>,
}

impl Engine {
    /// Opens a handle on the directory named by `config.root`.
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        if !config.root.is_dir() {
            return Err(EngineError::Init(format!(
                "root '{}' is not a directory",
                config.root.display()
            )));
        }
        let provider = FilesystemFileProvider::new(&config.root);
        Self::open_with_provider(config, Box::new(provider))
    }

    /// Opens a handle whose files come from `provider` instead of the disk.
    pub fn open_with_provider(
        config: EngineConfig,
        provider: Box<dyn FileProvider>,
    ) -> Result<Self, EngineError> {
        log::debug!(
            "opening engine at {} with {} (flags {})",
            config.root.display(),
            provider.name(),
            config.flags.bits()
        );
        let mut engine = Self {
            tree: Tree::new(),
            variables: HashMap::new(),
            diagnostics: Diagnostics::default(),
            lenses: LensRegistry::with_builtins(),
            provider,
            config,
            files: BTreeMap::new(),
        };
        engine
            .init_metadata()
            .map_err(|e| EngineError::Init(e.to_string()))?;

        if !engine.config.flags.contains(Flags::NO_LOAD)
            && let Err(e) = engine.load()
        {
            // The handle stays usable; the failures are in the tree and in error().
            log::warn!("initial load incomplete: {}", e);
        }
        Ok(engine)
    }

    /// Releases the handle and its tree.
    pub fn close(self) {
        log::debug!("closing engine with {} nodes", self.tree.node_count());
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn lenses(&self) -> &LensRegistry {
        &self.lenses
    }

    /// The outcome of the most recent operation.
    pub fn error(&self) -> ErrorInfo {
        self.diagnostics.last().clone()
    }

    /// Canonical paths of every node `expr` selects, in document order.
    pub fn match_paths(&mut self, expr: &str) -> Result<Vec<String>, EngineError> {
        self.diagnostics.reset();
        let result = self.match_inner(expr);
        self.diagnostics.track(result)
    }

    fn match_inner(&self, expr: &str) -> Result<Vec<String>, EngineError> {
        self.select(expr, None)?
            .into_iter()
            .map(|id| self.tree.path_of(id).map_err(EngineError::from))
            .collect()
    }

    /// True iff `expr` selects exactly one node. More than one match
    /// records `MultipleMatches` and answers `false`.
    pub fn exists(&mut self, expr: &str) -> Result<bool, EngineError> {
        self.diagnostics.reset();
        let result = self.select(expr, None);
        let count = self.diagnostics.track(result)?.len();
        if count > 1 {
            self.diagnostics.record(&EngineError::multiple(expr, count));
        }
        Ok(count == 1)
    }

    /// The value of the single node `expr` selects; `None` when nothing
    /// matches or the node has no value.
    pub fn get(&mut self, expr: &str) -> Result<Option<String>, EngineError> {
        self.diagnostics.reset();
        let result = self.select_at_most_one(expr).map(|node| {
            node.and_then(|id| self.tree.value(id).ok().flatten().map(str::to_string))
        });
        self.diagnostics.track(result)
    }

    /// The label of the single node `expr` selects.
    pub fn label(&mut self, expr: &str) -> Result<Option<String>, EngineError> {
        self.diagnostics.reset();
        let result = self.select_at_most_one(expr).map(|node| {
            node.and_then(|id| self.tree.label(id).ok().map(str::to_string))
        });
        self.diagnostics.track(result)
    }

    // --- Evaluation helpers ---

    /// Variables as the evaluator sees them, resolved against the live tree.
    fn bindings(&self) -> HashMap<String, PathValue<NodeRef<'_>>> {
        self.variables
            .iter()
            .map(|(name, var)| (name.clone(), var.resolve(&self.tree)))
            .collect()
    }

    /// Evaluates `expr` with `context` (the root by default) as context node.
    fn evaluate_expr(
        &self,
        expr: &str,
        context: Option<NodeId>,
    ) -> Result<PathValue<NodeRef<'_>>, EngineError> {
        let parsed = parse_expression(expr)?;
        let bindings = self.bindings();
        let root = self.tree.root_ref();
        let node = context.map_or(root, |id| self.tree.node_ref(id));
        let ctx = EvaluationContext::new(node, root, 1, 1, &bindings);
        Ok(evaluate(&parsed, &ctx)?)
    }

    /// The nodes `expr` selects, in document order.
    fn select(&self, expr: &str, context: Option<NodeId>) -> Result<Vec<NodeId>, EngineError> {
        let nodes = self.evaluate_expr(expr, context)?.into_nodes()?;
        Ok(nodes.iter().map(NodeRef::id).collect())
    }

    fn select_at_most_one(&self, expr: &str) -> Result<Option<NodeId>, EngineError> {
        match self.select(expr, None)?.as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            many => Err(EngineError::multiple(expr, many.len())),
        }
    }

    fn select_one(&self, expr: &str) -> Result<NodeId, EngineError> {
        self.select_at_most_one(expr)?
            .ok_or_else(|| EngineError::NoMatch(expr.to_string()))
    }

    fn path_string(&self, id: NodeId) -> String {
        self.tree.path_of(id).unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use treelens_traits::InMemoryFileProvider;

    /// An engine over an empty in-memory root that loads nothing.
    pub(crate) fn empty_engine() -> Engine {
        let config = EngineConfig::new("/").with_flags(Flags::NO_LOAD | Flags::NO_STDINC);
        Engine::open_with_provider(config, Box::new(InMemoryFileProvider::new())).unwrap()
    }

    #[test]
    fn test_match_get_label() {
        let mut engine = empty_engine();
        engine.set("/a/b", Some("1")).unwrap();
        engine.set("/a/c", None).unwrap();

        assert_eq!(engine.match_paths("/a/*").unwrap(), vec!["/a/b", "/a/c"]);
        assert_eq!(engine.get("/a/b").unwrap().as_deref(), Some("1"));
        assert_eq!(engine.get("/a/c").unwrap(), None);
        assert_eq!(engine.get("/nothing").unwrap(), None);
        assert_eq!(engine.label("/a/*[. = '1']").unwrap().as_deref(), Some("b"));
        assert!(engine.exists("/a/b").unwrap());
        assert!(!engine.exists("/a/*").unwrap());
    }

    #[test]
    fn test_get_multiple_matches_is_recorded() {
        let mut engine = empty_engine();
        engine.set("/a/b[1]", Some("1")).unwrap();
        engine.set("/a/b[last()+1]", Some("2")).unwrap();

        let err = engine.get("/a/b").unwrap_err();
        assert_eq!(err.code(), ErrorCode::MultipleMatches);
        assert_eq!(engine.error().code, ErrorCode::MultipleMatches);

        assert!(!engine.exists("/a/b").unwrap());
        assert_eq!(engine.error().code, ErrorCode::MultipleMatches);

        // The next successful call clears the record.
        engine.get("/a/b[1]").unwrap();
        assert_eq!(engine.error().code, ErrorCode::NoError);
    }

    #[test]
    fn test_bad_expression_details() {
        let mut engine = empty_engine();
        assert!(engine.match_paths("/a[").is_err());
        let info = engine.error();
        assert_eq!(info.code, ErrorCode::PathX);
        assert!(info.details.unwrap().contains("|=|"));
    }

    #[test]
    fn test_match_rejects_scalars() {
        let mut engine = empty_engine();
        assert!(engine.match_paths("1 + 2").is_err());
        assert_eq!(engine.error().code, ErrorCode::PathX);
    }

    #[test]
    fn test_metadata_is_present() {
        let mut engine = empty_engine();
        assert_eq!(engine.get("/augeas/root").unwrap().as_deref(), Some("/"));
        assert_eq!(engine.get("/augeas/save").unwrap().as_deref(), Some("overwrite"));
        assert!(engine.exists("/augeas/load/Hosts/lens").unwrap());
    }
}
