//! Operations that change the tree: `set`, `setm`, `insert`, `mv`, `rm`
//! and `rename`.
//!
//! Single-node operations validate everything before they touch the tree.
//! Multi-node operations work node by node and report how many they changed.

use super::Engine;
use super::transform::META;
use crate::error::EngineError;
use treelens_tree::{NodeId, validate_label};

impl Engine {
    /// Sets the value of the node `path` selects, creating it if needed.
    pub fn set(&mut self, path: &str, value: Option<&str>) -> Result<(), EngineError> {
        self.diagnostics.reset();
        let result = self.set_inner(path, value);
        self.diagnostics.track(result)
    }

    pub(super) fn set_inner(&mut self, path: &str, value: Option<&str>) -> Result<(), EngineError> {
        let target = match self.select(path, None)?.as_slice() {
            [] => self.expand(path, None)?,
            [one] => *one,
            many => return Err(EngineError::multiple(path, many.len())),
        };
        self.tree.set_value(target, value.map(str::to_string))?;
        log::debug!("set {} = {:?}", path, value);
        Ok(())
    }

    /// Sets `value` on `sub` relative to every node `base` selects, or on the
    /// base nodes themselves when `sub` is `None`. Returns how many nodes
    /// were set.
    pub fn setm(
        &mut self,
        base: &str,
        sub: Option<&str>,
        value: Option<&str>,
    ) -> Result<usize, EngineError> {
        self.diagnostics.reset();
        let result = self.setm_inner(base, sub, value);
        self.diagnostics.track(result)
    }

    fn setm_inner(
        &mut self,
        base: &str,
        sub: Option<&str>,
        value: Option<&str>,
    ) -> Result<usize, EngineError> {
        let bases = self.select(base, None)?;
        let mut count = 0;
        for node in bases {
            if !self.tree.contains(node) {
                continue;
            }
            let targets = match sub {
                None => vec![node],
                Some(sub) => match self.select(sub, Some(node))? {
                    found if found.is_empty() => vec![self.expand(sub, Some(node))?],
                    found => found,
                },
            };
            for target in targets {
                self.tree.set_value(target, value.map(str::to_string))?;
                count += 1;
            }
        }
        log::debug!("setm {} {:?}: {} node(s)", base, sub, count);
        Ok(count)
    }

    /// Inserts a new node labeled `label` directly before or after the node
    /// `path` selects.
    pub fn insert(&mut self, path: &str, label: &str, before: bool) -> Result<(), EngineError> {
        self.diagnostics.reset();
        let result = self.insert_inner(path, label, before);
        self.diagnostics.track(result)
    }

    fn insert_inner(&mut self, path: &str, label: &str, before: bool) -> Result<(), EngineError> {
        validate_label(label)?;
        let anchor = self.select_one(path)?;
        if anchor == self.tree.root() {
            return Err(EngineError::BadArgument(
                "cannot insert a sibling of the root".to_string(),
            ));
        }
        self.tree.insert_sibling(anchor, label, before)?;
        Ok(())
    }

    /// Moves the node `src` selects to `dst`.
    ///
    /// An existing `dst` is replaced: it loses its subtree and takes over the
    /// value and children of `src`, keeping its own label and position. A
    /// missing `dst` is created first.
    pub fn mv(&mut self, src: &str, dst: &str) -> Result<(), EngineError> {
        self.diagnostics.reset();
        let result = self.mv_inner(src, dst);
        self.diagnostics.track(result)
    }

    fn mv_inner(&mut self, src: &str, dst: &str) -> Result<(), EngineError> {
        let source = self.select_one(src)?;
        let into_descendant = || EngineError::MoveIntoDescendant {
            src: src.to_string(),
            dst: dst.to_string(),
        };

        let target = match self.select(dst, None)?.as_slice() {
            [] => {
                let plan = self.plan_expansion(dst, None)?;
                if plan.anchor == source || self.tree.is_ancestor_of(source, plan.anchor) {
                    return Err(into_descendant());
                }
                self.apply_expansion(plan)?
            }
            [one] => *one,
            many => return Err(EngineError::multiple(dst, many.len())),
        };

        if target == source {
            return Ok(());
        }
        if self.tree.is_ancestor_of(source, target) || self.tree.is_ancestor_of(target, source) {
            return Err(into_descendant());
        }
        self.tree.transplant(source, target)?;
        log::debug!("moved {} to {}", src, self.path_string(target));
        Ok(())
    }

    /// Deletes every node `path` selects, with its subtree. Returns the
    /// number of nodes deleted.
    ///
    /// Selecting the root deletes its children except `/augeas`. Deleting
    /// `/files` this way still means the next [`Engine::save`] deletes every
    /// loaded file.
    pub fn rm(&mut self, path: &str) -> Result<usize, EngineError> {
        self.diagnostics.reset();
        let result = self.rm_inner(path);
        self.diagnostics.track(result)
    }

    fn rm_inner(&mut self, path: &str) -> Result<usize, EngineError> {
        let nodes = self.select(path, None)?;
        let root = self.tree.root();
        let mut count = 0;
        for node in nodes {
            // Nodes inside an already deleted subtree are gone.
            if !self.tree.contains(node) {
                continue;
            }
            count += if node == root {
                self.clear_root()?
            } else {
                self.tree.remove(node)?
            };
        }
        log::debug!("rm {}: {} node(s)", path, count);
        Ok(count)
    }

    fn clear_root(&mut self) -> Result<usize, EngineError> {
        let root = self.tree.root();
        let doomed: Vec<NodeId> = self
            .tree
            .children(root)
            .iter()
            .copied()
            .filter(|&child| self.tree.label(child).is_ok_and(|label| label != META))
            .collect();
        let mut count = 0;
        for child in doomed {
            count += self.tree.remove(child)?;
        }
        Ok(count)
    }

    /// Relabels every node `src` selects. Returns the number of nodes renamed.
    pub fn rename(&mut self, src: &str, label: &str) -> Result<usize, EngineError> {
        self.diagnostics.reset();
        let result = self.rename_inner(src, label);
        self.diagnostics.track(result)
    }

    fn rename_inner(&mut self, src: &str, label: &str) -> Result<usize, EngineError> {
        validate_label(label)?;
        let nodes: Vec<NodeId> = self.select(src, None)?;
        if nodes.contains(&self.tree.root()) {
            return Err(EngineError::BadArgument("cannot rename the root".to_string()));
        }
        for node in &nodes {
            self.tree.set_label(*node, label)?;
        }
        Ok(nodes.len())
    }
}
