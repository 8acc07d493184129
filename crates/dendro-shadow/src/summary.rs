//! Serializable snapshots of a shadow tree for downstream renderers.

use std::fmt;
use std::hash::Hash;

use crate::node::{Condition, TableNode};
use crate::reader::ModelFamily;
use crate::shadow::ShadowTree;

/// One node of a [`TreeSummary`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeSummary {
    /// Node index.
    pub index: usize,
    /// Left child, `-1` for leaves.
    pub left: i64,
    /// Right child, `-1` for leaves.
    pub right: i64,
    /// Split feature, `-2` for leaves.
    pub feature: i64,
    /// Name of the split feature.
    pub feature_name: Option<String>,
    /// Numeric threshold; absent for leaves and categorical splits.
    pub threshold: Option<f64>,
    /// Categories sent right by a categorical split.
    pub categories: Option<Vec<u32>>,
    /// Training rows reaching the node.
    pub n_samples: usize,
    /// Training rows per class, ordered like the class names.
    pub n_samples_by_class: Vec<usize>,
    /// Predicted class label.
    pub prediction: String,
}

/// Whole-tree snapshot of a [`ShadowTree`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TreeSummary {
    /// Model family of the export.
    pub family: ModelFamily,
    /// Tree index within the forest.
    pub tree_index: usize,
    /// Label column name.
    pub target_name: String,
    /// Feature column names.
    pub feature_names: Vec<String>,
    /// Class labels in class-index order.
    pub class_names: Vec<String>,
    /// Depth as reported by [`ShadowTree::max_depth`].
    pub max_depth: usize,
    /// Number of nodes.
    pub n_nodes: usize,
    /// Number of leaves.
    pub n_leaves: usize,
    /// Per-node details in index order.
    pub nodes: Vec<NodeSummary>,
}

impl<L> ShadowTree<'_, L>
where
    L: Clone + Eq + Hash + fmt::Debug + fmt::Display,
{
    /// Snapshot every query result into a serializable [`TreeSummary`].
    #[must_use]
    pub fn summary(&self) -> TreeSummary {
        let left = self.children_left();
        let right = self.children_right();
        let features = self.features();

        let nodes = self
            .table()
            .nodes()
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let (feature_name, threshold, categories) = match node {
                    TableNode::Split {
                        feature, condition, ..
                    } => (
                        Some(self.feature_names()[feature.index()].clone()),
                        condition.threshold(),
                        match condition {
                            Condition::Categorical { categories } => {
                                Some(categories.iter().collect())
                            }
                            Condition::Numeric { .. } => None,
                        },
                    ),
                    TableNode::Leaf { .. } => (None, None, None),
                };
                let n_samples_by_class = self.class_counts(index);
                let prediction = self.predicted_class(index).to_string();
                NodeSummary {
                    index,
                    left: left[index],
                    right: right[index],
                    feature: features[index],
                    feature_name,
                    threshold,
                    categories,
                    n_samples: self.node_samples()[index].len(),
                    n_samples_by_class,
                    prediction,
                }
            })
            .collect();

        TreeSummary {
            family: self.family(),
            tree_index: self.tree_index(),
            target_name: self.target_name().to_string(),
            feature_names: self.feature_names().to_vec(),
            class_names: self.classes().iter().map(ToString::to_string).collect(),
            max_depth: self.max_depth(),
            n_nodes: self.n_nodes(),
            n_leaves: self.table().n_leaves(),
            nodes,
        }
    }
}
