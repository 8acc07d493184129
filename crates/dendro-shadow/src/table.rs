//! Normalized, validated node table shared by every export family.

use std::collections::VecDeque;

use crate::error::ShadowError;
use crate::node::{NodeIndex, TableNode};

/// One tree of a forest, normalized into an array-indexed node table.
///
/// Construction checks that the nodes form a single binary tree rooted at
/// index 0: every child index is in range, every non-root node has exactly
/// one parent, and every node is reachable from the root.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NodeTable {
    nodes: Vec<TableNode>,
    depth_limit: Option<usize>,
}

impl NodeTable {
    /// Validate `nodes` and wrap them into a table.
    ///
    /// `depth_limit` is the model's own notion of tree depth, when the export
    /// records one.
    ///
    /// # Errors
    ///
    /// Returns [`ShadowError::MalformedExport`] when the nodes do not form a
    /// single tree rooted at index 0.
    pub fn new(
        tree_index: usize,
        nodes: Vec<TableNode>,
        depth_limit: Option<usize>,
    ) -> Result<Self, ShadowError> {
        let malformed = |reason: String| ShadowError::MalformedExport { tree_index, reason };

        if nodes.is_empty() {
            return Err(malformed("tree has no nodes".to_string()));
        }

        let n_nodes = nodes.len();
        let mut parent_count = vec![0usize; n_nodes];
        for (idx, node) in nodes.iter().enumerate() {
            let Some((left, right)) = node.children() else {
                continue;
            };
            for child in [left, right] {
                if child.index() >= n_nodes {
                    return Err(malformed(format!(
                        "node {idx} references child {child}, but the tree has {n_nodes} nodes"
                    )));
                }
                parent_count[child.index()] += 1;
            }
            if left == right {
                return Err(malformed(format!("node {idx} has the same node as both children")));
            }
        }

        if parent_count[0] != 0 {
            return Err(malformed("root is referenced as a child".to_string()));
        }
        if let Some(orphan) = (1..n_nodes).find(|&i| parent_count[i] != 1) {
            return Err(malformed(format!(
                "node {orphan} has {} parents, expected exactly 1",
                parent_count[orphan]
            )));
        }

        // Single parents everywhere still allow detached cycles.
        let mut reached = 0usize;
        let mut queue = VecDeque::from([0usize]);
        while let Some(idx) = queue.pop_front() {
            reached += 1;
            if let Some((left, right)) = nodes[idx].children() {
                queue.push_back(left.index());
                queue.push_back(right.index());
            }
        }
        if reached != n_nodes {
            return Err(malformed(format!(
                "only {reached} of {n_nodes} nodes are reachable from the root"
            )));
        }

        Ok(Self { nodes, depth_limit })
    }

    /// Return the total number of nodes (splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the node at `index`, if it exists.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<&TableNode> {
        self.nodes.get(index.index())
    }

    /// Return all nodes in table order.
    #[must_use]
    pub fn nodes(&self) -> &[TableNode] {
        &self.nodes
    }

    /// Return the depth limit recorded by the model export, if any.
    #[must_use]
    pub fn depth_limit(&self) -> Option<usize> {
        self.depth_limit
    }

    /// Return the maximum root-to-leaf edge count.
    ///
    /// A single-node tree has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut queue = VecDeque::from([(0usize, 0usize)]);
        while let Some((idx, d)) = queue.pop_front() {
            match self.nodes[idx].children() {
                None => max_depth = max_depth.max(d),
                Some((left, right)) => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    /// Return the nodes visited by `sample`, from the root to its leaf.
    ///
    /// Callers guarantee every split feature indexes into `sample`.
    pub(crate) fn path(&self, sample: &[f64]) -> Vec<NodeIndex> {
        let mut path = vec![NodeIndex::ROOT];
        let mut idx = 0usize;
        while let TableNode::Split {
            feature,
            condition,
            left,
            right,
            ..
        } = &self.nodes[idx]
        {
            let next = if condition.goes_left(sample[feature.index()]) {
                *left
            } else {
                *right
            };
            path.push(next);
            idx = next.index();
        }
        path
    }
}
