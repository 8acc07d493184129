//! scikit-learn style CART tree exports.
//!
//! Each tree is a set of parallel arrays indexed by node id. Leaves carry
//! `-1` children, matching the normalized sentinels, and every node records
//! its class weights in `value`.

use tracing::{debug, instrument};

use crate::error::ShadowError;
use crate::node::{Boundary, Condition, FeatureIndex, LEAF_CHILD, NodeIndex, TableNode};
use crate::reader::{ModelFamily, TreeExportReader, check_tree_index};
use crate::table::NodeTable;

/// One CART tree as parallel node arrays.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CartTree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    /// Per-node class weights.
    #[serde(default)]
    value: Vec<Vec<f64>>,
}

impl CartTree {
    /// Create a tree from its node arrays.
    ///
    /// `value` may be empty when the export carries no class weights.
    #[must_use]
    pub fn new(
        children_left: Vec<i64>,
        children_right: Vec<i64>,
        feature: Vec<i64>,
        threshold: Vec<f64>,
        value: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            children_left,
            children_right,
            feature,
            threshold,
            value,
        }
    }

    /// Return the number of nodes declared by `children_left`.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.children_left.len()
    }
}

/// A fitted CART forest.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CartForest {
    trees: Vec<CartTree>,
}

impl CartForest {
    /// Create a forest from its trees.
    #[must_use]
    pub fn new(trees: Vec<CartTree>) -> Self {
        Self { trees }
    }

    /// Return the trees.
    #[must_use]
    pub fn trees(&self) -> &[CartTree] {
        &self.trees
    }
}

impl TreeExportReader for CartForest {
    fn family(&self) -> ModelFamily {
        ModelFamily::Cart
    }

    fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[instrument(skip(self), fields(family = "cart"))]
    fn read_tree(&self, tree_index: usize) -> Result<NodeTable, ShadowError> {
        check_tree_index(tree_index, self.trees.len())?;
        let tree = &self.trees[tree_index];
        let malformed = |reason: String| ShadowError::MalformedExport { tree_index, reason };

        let n_nodes = tree.n_nodes();
        let lengths = [
            ("children_right", tree.children_right.len()),
            ("feature", tree.feature.len()),
            ("threshold", tree.threshold.len()),
        ];
        for (name, len) in lengths {
            if len != n_nodes {
                return Err(malformed(format!(
                    "{name} has {len} entries, children_left has {n_nodes}"
                )));
            }
        }
        if !tree.value.is_empty() && tree.value.len() != n_nodes {
            return Err(malformed(format!(
                "value has {} entries, children_left has {n_nodes}",
                tree.value.len()
            )));
        }

        let mut nodes = Vec::with_capacity(n_nodes);
        for idx in 0..n_nodes {
            let distribution = tree.value.get(idx).cloned();
            let (left, right) = (tree.children_left[idx], tree.children_right[idx]);

            if left == LEAF_CHILD && right == LEAF_CHILD {
                nodes.push(TableNode::Leaf { distribution });
                continue;
            }

            let as_index = |value: i64, what: &str| {
                usize::try_from(value)
                    .map_err(|_| malformed(format!("node {idx} has {what} {value}")))
            };
            let left = as_index(left, "left child")?;
            let right = as_index(right, "right child")?;
            let feature = as_index(tree.feature[idx], "feature")?;

            nodes.push(TableNode::Split {
                feature: FeatureIndex::new(feature),
                condition: Condition::Numeric {
                    threshold: tree.threshold[idx],
                    boundary: Boundary::LeftInclusive,
                },
                left: NodeIndex::new(left),
                right: NodeIndex::new(right),
                distribution,
            });
        }

        debug!(n_nodes, "normalized cart tree");
        NodeTable::new(tree_index, nodes, None)
    }
}
