use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::{debug, instrument};

use crate::error::ShadowError;
use crate::node::{
    CategorySet, Condition, LEAF_CHILD, LEAF_FEATURE, LEAF_THRESHOLD, NodeIndex, TableNode,
};
use crate::reader::{ModelFamily, TreeExportReader};
use crate::table::NodeTable;

/// Configuration for building a [`ShadowTree`].
///
/// Construct via [`ShadowTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter       | Default    |
/// |-----------------|------------|
/// | `feature_names` | empty      |
/// | `target_name`   | `"target"` |
/// | `class_names`   | empty      |
///
/// Feature and class names have no usable default: [`build`](Self::build)
/// rejects a config whose names do not match the data.
#[derive(Debug, Clone)]
pub struct ShadowTreeConfig<L> {
    tree_index: usize,
    feature_names: Vec<String>,
    target_name: String,
    class_names: Vec<L>,
}

impl<L> ShadowTreeConfig<L>
where
    L: Clone + Eq + Hash + fmt::Debug,
{
    /// Create a config for the tree at `tree_index`.
    #[must_use]
    pub fn new(tree_index: usize) -> Self {
        Self {
            tree_index,
            feature_names: Vec::new(),
            target_name: "target".to_string(),
            class_names: Vec::new(),
        }
    }

    /// Set the feature column names, in matrix column order.
    #[must_use]
    pub fn with_feature_names<S: Into<String>>(
        mut self,
        feature_names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.feature_names = feature_names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the name of the label column.
    #[must_use]
    pub fn with_target_name(mut self, target_name: impl Into<String>) -> Self {
        self.target_name = target_name.into();
        self
    }

    /// Set the class labels. Their order defines the class indices.
    #[must_use]
    pub fn with_class_names(mut self, class_names: impl IntoIterator<Item = L>) -> Self {
        self.class_names = class_names.into_iter().collect();
        self
    }

    // --- Getters ---

    /// Return the tree index.
    #[must_use]
    pub fn tree_index(&self) -> usize {
        self.tree_index
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the label column name.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Return the class labels.
    #[must_use]
    pub fn class_names(&self) -> &[L] {
        &self.class_names
    }

    /// Build the shadow tree over one tree of `model`.
    ///
    /// `x_data[row][feature]` is the training matrix, `y_data[row]` its
    /// labels in the original label space. Both stay borrowed by the result;
    /// `model` is only read during this call.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ShadowError::InvalidTreeIndex`] | `tree_index` is not a tree of `model` |
    /// | [`ShadowError::MalformedExport`] | the tree export is not a valid tree |
    /// | [`ShadowError::EmptyDataset`] | `x_data` is empty |
    /// | [`ShadowError::LabelCountMismatch`] | `x_data` and `y_data` lengths differ |
    /// | [`ShadowError::FeatureNameCountMismatch`] | names do not match the column count |
    /// | [`ShadowError::FeatureCountMismatch`] | rows have inconsistent lengths |
    /// | [`ShadowError::NonFiniteValue`] | any value is NaN or infinite |
    /// | [`ShadowError::EmptyClassNames`] | no class names were set |
    /// | [`ShadowError::DuplicateClassName`] | a class name repeats |
    /// | [`ShadowError::UnknownLabel`] | a label is not a class name |
    /// | [`ShadowError::FeatureOutOfRange`] | a split uses a missing column |
    /// | [`ShadowError::ClassCountMismatch`] | a recorded distribution has the wrong length |
    #[instrument(skip_all, fields(tree_index = self.tree_index, n_rows = x_data.len()))]
    pub fn build<'a, R>(
        &self,
        model: &R,
        x_data: &'a [Vec<f64>],
        y_data: &'a [L],
    ) -> Result<ShadowTree<'a, L>, ShadowError>
    where
        R: TreeExportReader + ?Sized,
    {
        let table = model.read_tree(self.tree_index)?;

        // --- Validate data ---
        if x_data.is_empty() {
            return Err(ShadowError::EmptyDataset);
        }
        if x_data.len() != y_data.len() {
            return Err(ShadowError::LabelCountMismatch {
                n_rows: x_data.len(),
                n_labels: y_data.len(),
            });
        }

        let n_features = x_data[0].len();
        if self.feature_names.len() != n_features {
            return Err(ShadowError::FeatureNameCountMismatch {
                expected: n_features,
                got: self.feature_names.len(),
            });
        }

        for (row_index, row) in x_data.iter().enumerate() {
            if row.len() != n_features {
                return Err(ShadowError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    row_index,
                });
            }
            if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
                return Err(ShadowError::NonFiniteValue {
                    row_index,
                    feature_index,
                });
            }
        }

        // --- Validate classes ---
        if self.class_names.is_empty() {
            return Err(ShadowError::EmptyClassNames);
        }
        let mut class_index: HashMap<&L, usize> = HashMap::with_capacity(self.class_names.len());
        for (idx, label) in self.class_names.iter().enumerate() {
            if class_index.insert(label, idx).is_some() {
                return Err(ShadowError::DuplicateClassName {
                    label: format!("{label:?}"),
                });
            }
        }
        let row_classes = y_data
            .iter()
            .enumerate()
            .map(|(row_index, label)| {
                class_index
                    .get(label)
                    .copied()
                    .ok_or_else(|| ShadowError::UnknownLabel {
                        label: format!("{label:?}"),
                        row_index,
                    })
            })
            .collect::<Result<Vec<usize>, _>>()?;

        // --- Validate the tree against the data ---
        let n_classes = self.class_names.len();
        for (node, entry) in table.nodes().iter().enumerate() {
            if let TableNode::Split { feature, .. } = entry
                && feature.index() >= n_features
            {
                return Err(ShadowError::FeatureOutOfRange {
                    node,
                    feature: feature.index(),
                    n_features,
                });
            }
            if let Some(distribution) = entry.distribution()
                && distribution.len() != n_classes
            {
                return Err(ShadowError::ClassCountMismatch {
                    node,
                    expected: n_classes,
                    got: distribution.len(),
                });
            }
        }

        let node_samples = partition_samples(&table, x_data);

        debug!(
            family = %model.family(),
            n_nodes = table.n_nodes(),
            n_leaves = table.n_leaves(),
            n_features,
            n_classes,
            "shadow tree built"
        );

        Ok(ShadowTree {
            tree_index: self.tree_index,
            family: model.family(),
            table,
            x_data,
            y_data,
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
            classes: self.class_names.clone(),
            row_classes,
            node_samples,
        })
    }
}

/// Route every training row from the root down, recording the rows each node sees.
///
/// Child sets are always carved out of the parent's set, so the two children
/// of a split partition their parent exactly. Row order is preserved.
fn partition_samples(table: &NodeTable, x_data: &[Vec<f64>]) -> Vec<Vec<usize>> {
    let mut samples = vec![Vec::new(); table.n_nodes()];
    let mut stack = vec![(NodeIndex::ROOT, (0..x_data.len()).collect::<Vec<usize>>())];

    while let Some((node, rows)) = stack.pop() {
        if let TableNode::Split {
            feature,
            condition,
            left,
            right,
            ..
        } = &table.nodes()[node.index()]
        {
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .copied()
                .partition(|&row| condition.goes_left(x_data[row][feature.index()]));
            stack.push((*right, right_rows));
            stack.push((*left, left_rows));
        }
        samples[node.index()] = rows;
    }

    samples
}

/// Index of the first maximum; ties resolve to the lowest index.
fn first_argmax<T: PartialOrd>(values: &[T]) -> usize {
    let mut best = 0usize;
    for (idx, value) in values.iter().enumerate().skip(1) {
        if *value > values[best] {
            best = idx;
        }
    }
    best
}

/// A read-only, normalized view over one tree of a fitted forest.
///
/// Every query is a pure read of state fixed at construction. Per-node
/// mappings are dense vectors whose position is the node index.
#[derive(Debug, Clone)]
pub struct ShadowTree<'a, L> {
    tree_index: usize,
    family: ModelFamily,
    table: NodeTable,
    x_data: &'a [Vec<f64>],
    y_data: &'a [L],
    feature_names: Vec<String>,
    target_name: String,
    classes: Vec<L>,
    row_classes: Vec<usize>,
    node_samples: Vec<Vec<usize>>,
}

impl<'a, L> ShadowTree<'a, L>
where
    L: Clone + Eq + Hash + fmt::Debug,
{
    fn node(&self, node: usize) -> Result<&TableNode, ShadowError> {
        self.table
            .node(NodeIndex::new(node))
            .ok_or(ShadowError::NodeIndexOutOfRange {
                node,
                n_nodes: self.table.n_nodes(),
            })
    }

    /// Per-class row counts at `node`; `node` must be in range.
    pub(crate) fn class_counts(&self, node: usize) -> Vec<usize> {
        let mut counts = vec![0usize; self.classes.len()];
        for &row in &self.node_samples[node] {
            counts[self.row_classes[row]] += 1;
        }
        counts
    }

    /// Predicted label at `node`; `node` must be in range.
    pub(crate) fn predicted_class(&self, node: usize) -> &L {
        let class = match self.table.nodes()[node].distribution() {
            Some(distribution) => first_argmax(distribution),
            None => first_argmax(self.class_counts(node).as_slice()),
        };
        &self.classes[class]
    }

    /// Return `true`; a shadow tree only exists once fully built.
    #[must_use]
    pub fn is_fit(&self) -> bool {
        true
    }

    /// Return the left child of every node, [`LEAF_CHILD`] for leaves.
    #[must_use]
    pub fn children_left(&self) -> Vec<i64> {
        self.table
            .nodes()
            .iter()
            .map(|n| n.children().map_or(LEAF_CHILD, |(left, _)| left.index() as i64))
            .collect()
    }

    /// Return the right child of every node, [`LEAF_CHILD`] for leaves.
    #[must_use]
    pub fn children_right(&self) -> Vec<i64> {
        self.table
            .nodes()
            .iter()
            .map(|n| n.children().map_or(LEAF_CHILD, |(_, right)| right.index() as i64))
            .collect()
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Return the class labels in the order they were configured.
    #[must_use]
    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    /// Return the split feature of every node, [`LEAF_FEATURE`] for leaves.
    #[must_use]
    pub fn features(&self) -> Vec<i64> {
        self.table.nodes().iter().map(feature_of).collect()
    }

    /// Return the split feature of `node`, [`LEAF_FEATURE`] for leaves.
    ///
    /// # Errors
    ///
    /// Returns [`ShadowError::NodeIndexOutOfRange`] for an unknown node.
    pub fn node_feature(&self, node: usize) -> Result<i64, ShadowError> {
        self.node(node).map(feature_of)
    }

    /// Return the split threshold of every node.
    ///
    /// Leaves report [`LEAF_THRESHOLD`]; categorical splits have no threshold
    /// and report `NaN` (see [`split_categories`](Self::split_categories)).
    #[must_use]
    pub fn thresholds(&self) -> Vec<f64> {
        self.table
            .nodes()
            .iter()
            .map(|n| match n {
                TableNode::Leaf { .. } => LEAF_THRESHOLD,
                TableNode::Split { condition, .. } => condition.threshold().unwrap_or(f64::NAN),
            })
            .collect()
    }

    /// Return the training rows reaching each node, in ascending row order.
    #[must_use]
    pub fn node_samples(&self) -> &[Vec<usize>] {
        &self.node_samples
    }

    /// Return the number of training rows reaching `node`.
    ///
    /// # Errors
    ///
    /// Returns [`ShadowError::NodeIndexOutOfRange`] for an unknown node.
    pub fn node_n_samples(&self, node: usize) -> Result<usize, ShadowError> {
        self.node(node)?;
        Ok(self.node_samples[node].len())
    }

    /// Return the per-class row counts at `node`, ordered like [`classes`](Self::classes).
    ///
    /// # Errors
    ///
    /// Returns [`ShadowError::NodeIndexOutOfRange`] for an unknown node.
    pub fn node_n_samples_by_class(&self, node: usize) -> Result<Vec<usize>, ShadowError> {
        self.node(node)?;
        Ok(self.class_counts(node))
    }

    /// Return the class predicted at `node`, in the original label space.
    ///
    /// Uses the class distribution the export recorded for the node; when the
    /// export has none, falls back to the majority class of the node's
    /// training rows. Ties go to the class listed first.
    ///
    /// # Errors
    ///
    /// Returns [`ShadowError::NodeIndexOutOfRange`] for an unknown node.
    pub fn prediction(&self, node: usize) -> Result<&L, ShadowError> {
        self.node(node)?;
        Ok(self.predicted_class(node))
    }

    /// Return the tree's maximum depth.
    ///
    /// This is the depth limit recorded by the model export when present,
    /// otherwise the computed root-to-leaf edge count ([`tree_depth`](Self::tree_depth)).
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.table.depth_limit().unwrap_or_else(|| self.table.depth())
    }

    /// Return `true` if `node` splits on category membership. Leaves return `false`.
    ///
    /// # Errors
    ///
    /// Returns [`ShadowError::NodeIndexOutOfRange`] for an unknown node.
    pub fn is_categorical_split(&self, node: usize) -> Result<bool, ShadowError> {
        Ok(match self.node(node)? {
            TableNode::Split { condition, .. } => condition.is_categorical(),
            TableNode::Leaf { .. } => false,
        })
    }

    // --- Supplementary queries ---

    /// Return the index of the shadowed tree within its forest.
    #[must_use]
    pub fn tree_index(&self) -> usize {
        self.tree_index
    }

    /// Return the model family the tree was read from.
    #[must_use]
    pub fn family(&self) -> ModelFamily {
        self.family
    }

    /// Return the normalized node table.
    #[must_use]
    pub fn table(&self) -> &NodeTable {
        &self.table
    }

    /// Return the number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.table.n_nodes()
    }

    /// Return the computed maximum root-to-leaf edge count.
    #[must_use]
    pub fn tree_depth(&self) -> usize {
        self.table.depth()
    }

    /// Return `true` if `node` is a leaf.
    ///
    /// # Errors
    ///
    /// Returns [`ShadowError::NodeIndexOutOfRange`] for an unknown node.
    pub fn is_leaf(&self, node: usize) -> Result<bool, ShadowError> {
        Ok(self.node(node)?.is_leaf())
    }

    /// Return the leaf nodes in index order.
    #[must_use]
    pub fn leaves(&self) -> Vec<NodeIndex> {
        self.indices_where(TableNode::is_leaf)
    }

    /// Return the split nodes in index order.
    #[must_use]
    pub fn internal(&self) -> Vec<NodeIndex> {
        self.indices_where(|n| !n.is_leaf())
    }

    fn indices_where(&self, keep: impl Fn(&TableNode) -> bool) -> Vec<NodeIndex> {
        self.table
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, n)| keep(n))
            .map(|(idx, _)| NodeIndex::new(idx))
            .collect()
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the label column name.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Return the name of the feature `node` splits on, `None` for leaves.
    ///
    /// # Errors
    ///
    /// Returns [`ShadowError::NodeIndexOutOfRange`] for an unknown node.
    pub fn node_feature_name(&self, node: usize) -> Result<Option<&str>, ShadowError> {
        Ok(match self.node(node)? {
            TableNode::Split { feature, .. } => Some(self.feature_names[feature.index()].as_str()),
            TableNode::Leaf { .. } => None,
        })
    }

    /// Return the categories sent right by a categorical split at `node`.
    ///
    /// # Errors
    ///
    /// Returns [`ShadowError::NodeIndexOutOfRange`] for an unknown node.
    pub fn split_categories(&self, node: usize) -> Result<Option<&CategorySet>, ShadowError> {
        Ok(match self.node(node)? {
            TableNode::Split {
                condition: Condition::Categorical { categories },
                ..
            } => Some(categories),
            _ => None,
        })
    }

    /// Return the training matrix the tree was shadowed with.
    #[must_use]
    pub fn x_data(&self) -> &'a [Vec<f64>] {
        self.x_data
    }

    /// Return the training labels the tree was shadowed with.
    #[must_use]
    pub fn y_data(&self) -> &'a [L] {
        self.y_data
    }

    /// Return the nodes a new sample visits, from the root to its leaf.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ShadowError::SampleWidthMismatch`] | `sample` has the wrong number of features |
    /// | [`ShadowError::NonFiniteSampleValue`] | `sample` holds a NaN or infinite value |
    pub fn predict_path(&self, sample: &[f64]) -> Result<Vec<NodeIndex>, ShadowError> {
        if sample.len() != self.feature_names.len() {
            return Err(ShadowError::SampleWidthMismatch {
                expected: self.feature_names.len(),
                got: sample.len(),
            });
        }
        if let Some(feature_index) = sample.iter().position(|v| !v.is_finite()) {
            return Err(ShadowError::NonFiniteSampleValue { feature_index });
        }
        Ok(self.table.path(sample))
    }
}

fn feature_of(node: &TableNode) -> i64 {
    match node {
        TableNode::Split { feature, .. } => feature.index() as i64,
        TableNode::Leaf { .. } => LEAF_FEATURE,
    }
}
