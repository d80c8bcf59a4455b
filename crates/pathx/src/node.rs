//! Defines the core abstraction for a navigable configuration tree.
use std::hash::Hash;

/// The contract the evaluator needs from a node of a labeled tree.
///
/// The evaluator is written exclusively against this trait; the tree store
/// implements it with a borrowed handle (`tree + id`), tests with a mock.
///
/// `'a` is the lifetime of the underlying tree.
pub trait TreeNode<'a>: std::fmt::Debug + Clone + Copy + PartialEq + Eq + Hash {
    /// The node's label. The root's label is empty.
    fn label(&self) -> &'a str;

    /// The node's value, which is distinct from an empty string when absent.
    fn value(&self) -> Option<&'a str>;

    /// An iterator over the child nodes of this node, in sibling order.
    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The parent node, `None` for the root.
    fn parent(&self) -> Option<Self>;

    /// Zero-based position among the parent's children.
    fn sibling_index(&self) -> usize;

    /// Whether the node changed since the tree was last loaded or saved.
    fn is_dirty(&self) -> bool;
}

// Test utilities - publicly available for integration testing in downstream crates
pub mod tests {
    use super::*;
    use std::hash::Hasher;

    #[derive(Debug, Clone)]
    struct MockNodeData {
        label: String,
        value: Option<String>,
        children: Vec<usize>,
        parent: Option<usize>,
        dirty: bool,
    }

    /// An append-only tree; node 0 is the root.
    #[derive(Debug)]
    pub struct MockTree {
        nodes: Vec<MockNodeData>,
    }

    /// A simple, in-memory node representation that holds a reference to its tree.
    #[derive(Debug, Clone, Copy)]
    pub struct MockNode<'a> {
        pub id: usize,
        pub tree: &'a MockTree,
    }

    impl<'a> PartialEq for MockNode<'a> {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }
    impl<'a> Eq for MockNode<'a> {}

    impl<'a> Hash for MockNode<'a> {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl<'a> TreeNode<'a> for MockNode<'a> {
        fn label(&self) -> &'a str {
            &self.tree.nodes[self.id].label
        }

        fn value(&self) -> Option<&'a str> {
            self.tree.nodes[self.id].value.as_deref()
        }

        fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree; // Re-borrow to help the lifetime checker
            Box::new(
                tree.nodes[self.id]
                    .children
                    .iter()
                    .map(move |&id| MockNode { id, tree }),
            )
        }

        fn parent(&self) -> Option<Self> {
            self.tree.nodes[self.id].parent.map(|id| MockNode {
                id,
                tree: self.tree,
            })
        }

        fn sibling_index(&self) -> usize {
            self.tree.nodes[self.id]
                .parent
                .and_then(|p| self.tree.nodes[p].children.iter().position(|&c| c == self.id))
                .unwrap_or(0)
        }

        fn is_dirty(&self) -> bool {
            self.tree.nodes[self.id].dirty
        }
    }

    impl MockTree {
        pub fn new() -> Self {
            Self {
                nodes: vec![MockNodeData {
                    label: String::new(),
                    value: None,
                    children: vec![],
                    parent: None,
                    dirty: false,
                }],
            }
        }

        /// Appends a child and returns its id.
        pub fn add(&mut self, parent: usize, label: &str, value: Option<&str>) -> usize {
            let id = self.nodes.len();
            self.nodes.push(MockNodeData {
                label: label.to_string(),
                value: value.map(str::to_string),
                children: vec![],
                parent: Some(parent),
                dirty: false,
            });
            self.nodes[parent].children.push(id);
            id
        }

        pub fn mark_dirty(&mut self, id: usize) {
            self.nodes[id].dirty = true;
        }

        pub fn node(&self, id: usize) -> MockNode<'_> {
            MockNode { id, tree: self }
        }

        pub fn root(&self) -> MockNode<'_> {
            self.node(0)
        }
    }

    impl Default for MockTree {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Creates a small tree for testing:
    /// ```text
    /// /                               0
    ///   hosts                         1
    ///     1                           2
    ///       ipaddr = 127.0.0.1        3
    ///       canonical = localhost     4
    ///       alias = localhost.local   5
    ///     2                           6
    ///       ipaddr = 192.168.0.1      7
    ///       canonical = gateway       8
    ///   #comment = managed            9
    ///   opts                          10
    ///     a = 1                       11
    ///     b = 2                       12
    ///     a = 3                       13
    ///     c                           14
    /// ```
    pub fn create_test_tree() -> MockTree {
        let mut tree = MockTree::new();
        let hosts = tree.add(0, "hosts", None);
        let first = tree.add(hosts, "1", None);
        tree.add(first, "ipaddr", Some("127.0.0.1"));
        tree.add(first, "canonical", Some("localhost"));
        tree.add(first, "alias", Some("localhost.local"));
        let second = tree.add(hosts, "2", None);
        tree.add(second, "ipaddr", Some("192.168.0.1"));
        tree.add(second, "canonical", Some("gateway"));
        tree.add(0, "#comment", Some("managed"));
        let opts = tree.add(0, "opts", None);
        tree.add(opts, "a", Some("1"));
        tree.add(opts, "b", Some("2"));
        tree.add(opts, "a", Some("3"));
        tree.add(opts, "c", None);
        tree
    }
}
