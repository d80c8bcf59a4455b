//! The arena that owns every node of a configuration tree.

use crate::error::{TreeError, validate_label};
use crate::node_ref::NodeRef;
use crate::span::Span;
use itertools::Itertools;
use std::fmt;
use treelens_pathx::escape_label;

/// Opaque node identity. The generation makes ids of deleted nodes stale
/// even after their slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    label: String,
    value: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    span: Option<Span>,
    dirty: bool,
}

impl Node {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// An ordered, labeled tree. The root always exists and has an empty label.
#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    count: usize,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::default()),
            }],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            count: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.count
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.get(id).ok_or(TreeError::StaleNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.get_mut(id).ok_or(TreeError::StaleNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn label(&self, id: NodeId) -> Result<&str, TreeError> {
        self.node(id).map(Node::label)
    }

    pub fn value(&self, id: NodeId) -> Result<Option<&str>, TreeError> {
        self.node(id).map(Node::value)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children in sibling order; empty for a stale id.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Zero-based position among the parent's children.
    pub fn sibling_index(&self, id: NodeId) -> usize {
        self.parent(id)
            .and_then(|p| self.children(p).iter().position(|c| *c == id))
            .unwrap_or(0)
    }

    pub fn set_value(&mut self, id: NodeId, value: Option<String>) -> Result<(), TreeError> {
        self.node_mut(id)?.value = value;
        self.mark_dirty(id);
        Ok(())
    }

    pub fn set_label(&mut self, id: NodeId, label: &str) -> Result<(), TreeError> {
        if id == self.root {
            return Err(TreeError::RootOperation("renamed"));
        }
        validate_label(label)?;
        self.node_mut(id)?.label = label.to_string();
        self.mark_dirty(id);
        Ok(())
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        self.count += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn new_node(label: &str, value: Option<String>, parent: NodeId) -> Node {
        Node {
            label: label.to_string(),
            value,
            parent: Some(parent),
            dirty: true,
            ..Default::default()
        }
    }

    /// Adds a node after the last child of `parent`.
    pub fn append_child(
        &mut self,
        parent: NodeId,
        label: &str,
        value: Option<String>,
    ) -> Result<NodeId, TreeError> {
        validate_label(label)?;
        self.node(parent)?;
        let id = self.allocate(Self::new_node(label, value, parent));
        self.node_mut(parent)?.children.push(id);
        self.mark_dirty(parent);
        Ok(id)
    }

    /// Adds a valueless node directly before or after `anchor`.
    pub fn insert_sibling(
        &mut self,
        anchor: NodeId,
        label: &str,
        before: bool,
    ) -> Result<NodeId, TreeError> {
        validate_label(label)?;
        let parent = self.node(anchor)?.parent.ok_or(TreeError::RootSibling)?;
        let position = self.sibling_index(anchor) + usize::from(!before);
        let id = self.allocate(Self::new_node(label, None, parent));
        self.node_mut(parent)?.children.insert(position, id);
        self.mark_dirty(parent);
        Ok(id)
    }

    /// Deletes `id` and its subtree, returning the number of nodes deleted.
    pub fn remove(&mut self, id: NodeId) -> Result<usize, TreeError> {
        let parent = self
            .node(id)?
            .parent
            .ok_or(TreeError::RootOperation("removed"))?;
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        self.mark_dirty(parent);
        let count = self.release(id);
        log::trace!("removed {} node(s) at {}", count, id);
        Ok(count)
    }

    /// Deletes every child subtree of `id`, returning the number of nodes deleted.
    pub fn clear_children(&mut self, id: NodeId) -> Result<usize, TreeError> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        let count: usize = children.into_iter().map(|c| self.release(c)).sum();
        self.mark_dirty(id);
        Ok(count)
    }

    fn release(&mut self, id: NodeId) -> usize {
        let mut stack = vec![id];
        let mut count = 0;
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
                stack.extend(node.children);
                count += 1;
            }
        }
        self.count -= count;
        count
    }

    /// True when `ancestor` lies strictly above `node`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Moves all children of `from` to the end of `to`'s children.
    pub fn adopt_children(&mut self, from: NodeId, to: NodeId) -> Result<(), TreeError> {
        if from == to {
            return Ok(());
        }
        if self.is_ancestor_of(from, to) {
            return Err(TreeError::Cycle);
        }
        self.node(to)?;
        let children = std::mem::take(&mut self.node_mut(from)?.children);
        for child in &children {
            if let Some(node) = self.get_mut(*child) {
                node.parent = Some(to);
            }
        }
        self.node_mut(to)?.children.extend(children);
        self.mark_dirty(from);
        self.mark_dirty(to);
        Ok(())
    }

    /// Replaces the content of `dst` with the value, span and children of
    /// `src`, then deletes `src`. `dst` keeps its label and position.
    pub fn transplant(&mut self, src: NodeId, dst: NodeId) -> Result<(), TreeError> {
        if src == dst {
            return Ok(());
        }
        if self.is_ancestor_of(src, dst) || self.is_ancestor_of(dst, src) {
            return Err(TreeError::Cycle);
        }
        self.node(dst)?;
        let (value, span) = {
            let node = self.node_mut(src)?;
            (node.value.take(), node.span.take())
        };
        self.clear_children(dst)?;
        {
            let node = self.node_mut(dst)?;
            node.value = value;
            node.span = span;
        }
        self.adopt_children(src, dst)?;
        self.remove(src)?;
        self.mark_dirty(dst);
        Ok(())
    }

    /// Every node below `id` in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// The `index`-th (1-based) child of `parent` labeled `label`.
    pub fn child_by_label(&self, parent: NodeId, label: &str, index: usize) -> Option<NodeId> {
        if index == 0 {
            return None;
        }
        self.children(parent)
            .iter()
            .filter(|c| self.get(**c).is_some_and(|n| n.label == label))
            .nth(index - 1)
            .copied()
    }

    /// Follows the first child with each label, starting at the root.
    pub fn lookup<S: AsRef<str>>(&self, labels: &[S]) -> Option<NodeId> {
        labels.iter().try_fold(self.root, |node, label| {
            self.child_by_label(node, label.as_ref(), 1)
        })
    }

    /// The canonical path of `id`, e.g. `/files/etc/hosts/2/alias[1]`.
    pub fn path_of(&self, id: NodeId) -> Result<String, TreeError> {
        self.node(id)?;
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let label = self.label(current)?;
            let same_label: Vec<NodeId> = self
                .children(parent)
                .iter()
                .filter(|c| self.get(**c).is_some_and(|n| n.label == label))
                .copied()
                .collect();
            let mut segment = escape_label(label);
            if same_label.len() > 1 {
                let position = same_label.iter().position(|c| *c == current).unwrap_or(0) + 1;
                segment.push_str(&format!("[{}]", position));
            }
            segments.push(segment);
            current = parent;
        }
        Ok(format!("/{}", segments.iter().rev().join("/")))
    }

    pub fn set_span(&mut self, id: NodeId, span: Option<Span>) -> Result<(), TreeError> {
        self.node_mut(id)?.span = span;
        Ok(())
    }

    pub fn span(&self, id: NodeId) -> Option<&Span> {
        self.get(id).and_then(|n| n.span.as_ref())
    }

    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.dirty)
    }

    /// Marks `id` and all of its ancestors as changed.
    pub fn mark_dirty(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node) = current {
            match self.get_mut(node) {
                Some(n) => {
                    n.dirty = true;
                    current = n.parent;
                }
                None => break,
            }
        }
    }

    /// Clears the dirty flag on `id` and everything below it.
    pub fn clear_dirty(&mut self, id: NodeId) {
        let mut nodes = self.descendants(id);
        nodes.push(id);
        for node in nodes {
            if let Some(n) = self.get_mut(node) {
                n.dirty = false;
            }
        }
    }

    /// A borrowed handle for path evaluation.
    pub fn node_ref(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef::new(self, id)
    }

    pub fn root_ref(&self) -> NodeRef<'_> {
        self.node_ref(self.root)
    }
}
