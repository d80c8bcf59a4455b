//! Running lenses over strings held in the tree: `text_store` and
//! `text_retrieve`, plus the conversions between tree nodes and the
//! fragments lenses work on.

use super::Engine;
use crate::error::EngineError;
use treelens_lens::Fragment;
use treelens_tree::{NodeId, Span, Tree};

/// The children of `id` as detached fragments, without spans.
pub(super) fn fragments_below(tree: &Tree, id: NodeId) -> Vec<Fragment> {
    tree.children(id)
        .iter()
        .filter_map(|&child| {
            let node = tree.get(child)?;
            Some(Fragment {
                label: node.label().to_string(),
                value: node.value().map(str::to_string),
                children: fragments_below(tree, child),
                span: None,
            })
        })
        .collect()
}

impl Engine {
    /// Appends `fragments` below `parent`. With a `filename` and span
    /// tracking enabled, every new node records where it came from.
    pub(super) fn graft(
        &mut self,
        parent: NodeId,
        fragments: Vec<Fragment>,
        filename: Option<&str>,
    ) -> Result<(), EngineError> {
        let record_spans = self.spans_enabled();
        for fragment in fragments {
            let id = self.tree.append_child(parent, &fragment.label, fragment.value)?;
            if let (true, Some(file), Some(span)) = (record_spans, filename, fragment.span) {
                let span = Span::new(file, span.span)
                    .with_label(span.label)
                    .with_value(span.value);
                self.tree.set_span(id, Some(span))?;
            }
            self.graft(id, fragment.children, filename)?;
        }
        Ok(())
    }

    /// Parses the value of the node `node` with `lens` and stores the
    /// result as the children of `path`, replacing what was there.
    pub fn text_store(&mut self, lens: &str, node: &str, path: &str) -> Result<(), EngineError> {
        self.diagnostics.reset();
        let result = self.text_store_inner(lens, node, path);
        self.diagnostics.track(result)
    }

    fn text_store_inner(&mut self, lens: &str, node: &str, path: &str) -> Result<(), EngineError> {
        let lens = self.lenses.get(lens)?;
        let source = self.select_one(node)?;
        let text = self
            .tree
            .value(source)?
            .ok_or_else(|| EngineError::BadArgument(format!("node '{}' has no value", node)))?
            .to_string();
        let fragments = lens.get(&text)?;

        let target = match self.select(path, None)?.as_slice() {
            [] => self.expand(path, None)?,
            [one] => *one,
            many => return Err(EngineError::multiple(path, many.len())),
        };
        self.tree.clear_children(target)?;
        self.graft(target, fragments, None)?;
        log::debug!("text_store {} from {} into {}", lens.name(), node, path);
        Ok(())
    }

    /// Renders the children of `path` with `lens`, using the value of
    /// `node_in` as the original text, and stores the result as the value of
    /// `node_out`.
    pub fn text_retrieve(
        &mut self,
        lens: &str,
        node_in: &str,
        path: &str,
        node_out: &str,
    ) -> Result<(), EngineError> {
        self.diagnostics.reset();
        let result = self.text_retrieve_inner(lens, node_in, path, node_out);
        self.diagnostics.track(result)
    }

    fn text_retrieve_inner(
        &mut self,
        lens: &str,
        node_in: &str,
        path: &str,
        node_out: &str,
    ) -> Result<(), EngineError> {
        let lens = self.lenses.get(lens)?;
        let basis = self.select_one(node_in)?;
        let original = self.tree.value(basis)?.map(str::to_string);
        let tree_node = self.select_one(path)?;

        let fragments = fragments_below(&self.tree, tree_node);
        let text = lens.put(&fragments, original.as_deref())?;
        self.set_inner(node_out, Some(&text))?;
        log::debug!("text_retrieve {} from {} into {}", lens.name(), path, node_out);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::tests::empty_engine;
    use crate::error::ErrorCode;

    const HOSTS: &str = "127.0.0.1 localhost\n\n# lan\n192.168.0.1  gw router\n";

    #[test]
    fn test_store_then_retrieve_round_trips() {
        let mut engine = empty_engine();
        engine.set("/raw", Some(HOSTS)).unwrap();
        engine.text_store("Hosts.lns", "/raw", "/parsed").unwrap();

        assert_eq!(engine.get("/parsed/2/canonical").unwrap().as_deref(), Some("gw"));
        assert_eq!(engine.get("/parsed/#comment").unwrap().as_deref(), Some("lan"));

        engine.text_retrieve("Hosts.lns", "/raw", "/parsed", "/out").unwrap();
        assert_eq!(engine.get("/out").unwrap().as_deref(), Some(HOSTS));
    }

    #[test]
    fn test_retrieve_after_edit() {
        let mut engine = empty_engine();
        engine.set("/raw", Some("a = 1\nb = 2\n")).unwrap();
        engine.text_store("Simplevars", "/raw", "/t").unwrap();
        engine.set("/t/b", Some("3")).unwrap();
        engine.text_retrieve("Simplevars", "/raw", "/t", "/raw").unwrap();
        assert_eq!(engine.get("/raw").unwrap().as_deref(), Some("a = 1\nb = 3\n"));
    }

    #[test]
    fn test_store_replaces_previous_children() {
        let mut engine = empty_engine();
        engine.set("/raw", Some("x=1\n")).unwrap();
        engine.set("/t/old", Some("gone")).unwrap();
        engine.text_store("Shellvars.lns", "/raw", "/t").unwrap();
        assert_eq!(engine.match_paths("/t/*").unwrap(), vec!["/t/x"]);
    }

    #[test]
    fn test_store_errors() {
        let mut engine = empty_engine();
        engine.set("/raw", Some("not an assignment\n")).unwrap();
        engine.set("/empty", None).unwrap();

        let cases = [
            ("Nope.lns", "/raw", ErrorCode::NoLens),
            ("Simplevars.lns", "/missing", ErrorCode::NoMatch),
            ("Simplevars.lns", "/empty", ErrorCode::BadArg),
            ("Simplevars.lns", "/raw", ErrorCode::LensFailure),
        ];
        for (lens, node, code) in cases {
            let err = engine.text_store(lens, node, "/t").unwrap_err();
            assert_eq!(err.code(), code, "{} {}", lens, node);
            assert_eq!(engine.error().code, code);
        }
        assert!(engine.match_paths("/t").unwrap().is_empty());
    }
}
