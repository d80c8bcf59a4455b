use crate::tree::{NodeId, Tree};
use std::fmt;
use std::hash::{Hash, Hasher};
use treelens_pathx::TreeNode;

/// A borrowed view of one node, used to evaluate path expressions over a [`Tree`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn new(tree: &'a Tree, id: NodeId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("label", &self.label())
            .finish()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.tree, other.tree)
    }
}

impl Eq for NodeRef<'_> {}

impl Hash for NodeRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<'a> TreeNode<'a> for NodeRef<'a> {
    fn label(&self) -> &'a str {
        self.tree.get(self.id).map(|n| n.label()).unwrap_or("")
    }

    fn value(&self) -> Option<&'a str> {
        self.tree.get(self.id).and_then(|n| n.value())
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let tree = self.tree;
        Box::new(
            tree.children(self.id)
                .iter()
                .map(move |&id| NodeRef { tree, id }),
        )
    }

    fn parent(&self) -> Option<Self> {
        self.tree.parent(self.id).map(|id| NodeRef {
            tree: self.tree,
            id,
        })
    }

    fn sibling_index(&self) -> usize {
        self.tree.sibling_index(self.id)
    }

    fn is_dirty(&self) -> bool {
        self.tree.is_dirty(self.id)
    }
}
