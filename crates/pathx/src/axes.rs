//! Contains pure functions for collecting nodes along each axis.
//!
//! Every collector appends in proximity order: forward axes in document
//! order, reverse axes starting from the node nearest to the context node.

use crate::node::TreeNode;

pub fn collect_self_nodes<'a, N: TreeNode<'a>>(node: N, results: &mut Vec<N>) {
    results.push(node);
}

pub fn collect_child_nodes<'a, N: TreeNode<'a>>(node: N, results: &mut Vec<N>) {
    results.extend(node.children());
}

/// Pre-order traversal of everything below `node`.
pub fn collect_descendant_nodes<'a, N: TreeNode<'a>>(node: N, results: &mut Vec<N>) {
    let mut stack: Vec<N> = node.children().collect();
    stack.reverse();
    while let Some(current) = stack.pop() {
        results.push(current);
        let mut children: Vec<N> = current.children().collect();
        children.reverse();
        stack.extend(children);
    }
}

pub fn collect_descendant_or_self_nodes<'a, N: TreeNode<'a>>(node: N, results: &mut Vec<N>) {
    results.push(node);
    collect_descendant_nodes(node, results);
}

pub fn collect_parent_nodes<'a, N: TreeNode<'a>>(node: N, results: &mut Vec<N>) {
    if let Some(parent) = node.parent() {
        results.push(parent);
    }
}

pub fn collect_ancestor_nodes<'a, N: TreeNode<'a>>(node: N, results: &mut Vec<N>) {
    let mut current = node.parent();
    while let Some(p) = current {
        results.push(p);
        current = p.parent();
    }
}

pub fn collect_root_nodes<'a, N: TreeNode<'a>>(node: N, results: &mut Vec<N>) {
    results.push(root_of(node));
}

pub fn collect_following_sibling_nodes<'a, N: TreeNode<'a>>(node: N, results: &mut Vec<N>) {
    if let Some(parent) = node.parent() {
        results.extend(parent.children().skip_while(|s| *s != node).skip(1));
    }
}

pub fn collect_preceding_sibling_nodes<'a, N: TreeNode<'a>>(node: N, results: &mut Vec<N>) {
    if let Some(parent) = node.parent() {
        let mut siblings: Vec<N> = parent.children().take_while(|s| *s != node).collect();
        siblings.reverse();
        results.extend(siblings);
    }
}

pub fn root_of<'a, N: TreeNode<'a>>(node: N) -> N {
    let mut current = node;
    while let Some(p) = current.parent() {
        current = p;
    }
    current
}
