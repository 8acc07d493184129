//! Yggdrasil / TensorFlow Decision Forests tree exports.
//!
//! YDF stores each tree as a flat pre-order list: a split node is followed
//! by its whole negative subtree, then its positive subtree. Conditions are
//! phrased positively ("attribute >= threshold", "attribute in set"), so the
//! negative branch becomes the left child.

use tracing::{debug, instrument};

use crate::error::ShadowError;
use crate::node::{Boundary, CategorySet, Condition, FeatureIndex, NodeIndex, TableNode};
use crate::reader::{ModelFamily, TreeExportReader, check_tree_index};
use crate::table::NodeTable;

/// A YDF split condition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum YdfCondition {
    /// Positive when `attribute >= threshold`.
    Higher {
        /// Feature column tested.
        attribute: usize,
        /// Split boundary.
        threshold: f64,
    },
    /// Positive when the attribute's category id is in `categories`.
    Contains {
        /// Feature column tested.
        attribute: usize,
        /// Category ids taking the positive branch.
        categories: CategorySet,
    },
}

/// One node of a YDF tree.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct YdfNode {
    #[serde(default)]
    condition: Option<YdfCondition>,
    #[serde(default)]
    distribution: Option<Vec<f64>>,
}

impl YdfNode {
    /// Create a leaf.
    #[must_use]
    pub fn leaf(distribution: Option<Vec<f64>>) -> Self {
        Self {
            condition: None,
            distribution,
        }
    }

    /// Create a split on `attribute >= threshold`.
    #[must_use]
    pub fn higher(attribute: usize, threshold: f64, distribution: Option<Vec<f64>>) -> Self {
        Self {
            condition: Some(YdfCondition::Higher {
                attribute,
                threshold,
            }),
            distribution,
        }
    }

    /// Create a split on category membership.
    #[must_use]
    pub fn contains(
        attribute: usize,
        categories: CategorySet,
        distribution: Option<Vec<f64>>,
    ) -> Self {
        Self {
            condition: Some(YdfCondition::Contains {
                attribute,
                categories,
            }),
            distribution,
        }
    }

    /// Return the split condition, or `None` for leaves.
    #[must_use]
    pub fn condition(&self) -> Option<&YdfCondition> {
        self.condition.as_ref()
    }
}

/// One YDF tree: its nodes in pre-order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct YdfTree {
    nodes: Vec<YdfNode>,
}

impl YdfTree {
    /// Create a tree from its pre-order node list.
    #[must_use]
    pub fn new(nodes: Vec<YdfNode>) -> Self {
        Self { nodes }
    }

    /// Return the pre-order node list.
    #[must_use]
    pub fn nodes(&self) -> &[YdfNode] {
        &self.nodes
    }
}

/// A fitted YDF random forest.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct YdfForest {
    trees: Vec<YdfTree>,
    /// Learner `max_depth` hyperparameter, counting the root as depth 1.
    #[serde(default)]
    max_depth: Option<usize>,
}

impl YdfForest {
    /// Create a forest from its trees.
    #[must_use]
    pub fn new(trees: Vec<YdfTree>) -> Self {
        Self {
            trees,
            max_depth: None,
        }
    }

    /// Record the learner's `max_depth` hyperparameter.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Return the recorded `max_depth` hyperparameter.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the trees.
    #[must_use]
    pub fn trees(&self) -> &[YdfTree] {
        &self.trees
    }
}

impl TreeExportReader for YdfForest {
    fn family(&self) -> ModelFamily {
        ModelFamily::Ydf
    }

    fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[instrument(skip(self), fields(family = "ydf"))]
    fn read_tree(&self, tree_index: usize) -> Result<NodeTable, ShadowError> {
        check_tree_index(tree_index, self.trees.len())?;
        let source = &self.trees[tree_index].nodes;
        let malformed = |reason: String| ShadowError::MalformedExport { tree_index, reason };

        if source.is_empty() {
            return Err(malformed("tree has no nodes".to_string()));
        }

        let mut decoded: Vec<Option<TableNode>> = vec![None; source.len()];
        let end = decode_pre_order(source, &mut decoded).map_err(malformed)?;
        if end != source.len() {
            return Err(malformed(format!(
                "{} trailing nodes follow the root subtree",
                source.len() - end
            )));
        }

        let nodes = decoded
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| malformed("pre-order decoding left gaps".to_string()))?;

        debug!(n_nodes = nodes.len(), "decoded ydf tree");
        NodeTable::new(tree_index, nodes, self.max_depth)
    }
}

/// Decode the pre-order list, returning the position just past the root subtree.
///
/// Splits wait on an explicit stack: once a split's left subtree is closed,
/// the next position is its right child; once the right subtree closes too,
/// the split itself is written.
fn decode_pre_order(source: &[YdfNode], out: &mut [Option<TableNode>]) -> Result<usize, String> {
    // (split position, its condition, right child once the left subtree is closed)
    let mut pending: Vec<(usize, &YdfCondition, Option<usize>)> = Vec::new();
    let mut pos = 0usize;

    loop {
        let Some(node) = source.get(pos) else {
            return Err(format!("pre-order list ends before node {pos}"));
        };
        if let Some(condition) = &node.condition {
            pending.push((pos, condition, None));
            pos += 1;
            continue;
        }
        out[pos] = Some(TableNode::Leaf {
            distribution: node.distribution.clone(),
        });
        pos += 1;

        // A subtree just closed at `pos`; climb until a split still needs its right side.
        while let Some(top) = pending.last_mut() {
            match top.2 {
                None => {
                    top.2 = Some(pos);
                    break;
                }
                Some(right) => {
                    let (split, condition, _) = *top;
                    pending.pop();
                    out[split] = Some(split_node(
                        condition,
                        source[split].distribution.clone(),
                        split + 1,
                        right,
                    ));
                }
            }
        }
        if pending.is_empty() {
            return Ok(pos);
        }
    }
}

fn split_node(
    condition: &YdfCondition,
    distribution: Option<Vec<f64>>,
    left: usize,
    right: usize,
) -> TableNode {
    let (feature, condition) = match condition {
        YdfCondition::Higher {
            attribute,
            threshold,
        } => (
            *attribute,
            Condition::Numeric {
                threshold: *threshold,
                boundary: Boundary::RightInclusive,
            },
        ),
        YdfCondition::Contains {
            attribute,
            categories,
        } => (
            *attribute,
            Condition::Categorical {
                categories: categories.clone(),
            },
        ),
    };

    TableNode::Split {
        feature: FeatureIndex::new(feature),
        condition,
        left: NodeIndex::new(left),
        right: NodeIndex::new(right),
        distribution,
    }
}
