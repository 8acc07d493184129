use std::collections::BTreeSet;
use std::fmt;

/// Child index reported for leaves.
pub const LEAF_CHILD: i64 = -1;

/// Feature index reported for leaves.
pub const LEAF_FEATURE: i64 = -2;

/// Threshold reported for leaves.
pub const LEAF_THRESHOLD: f64 = -2.0;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a node in a normalized node table. The root is index 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// The root of every tree.
    pub const ROOT: NodeIndex = NodeIndex(0);

    /// Create a new node index from a zero-based table position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based table position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Set of category ids routed to the right branch of a categorical split.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CategorySet(BTreeSet<u32>);

impl CategorySet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `true` if the set holds `category`.
    #[must_use]
    pub fn contains(&self, category: u32) -> bool {
        self.0.contains(&category)
    }

    /// Add a category to the set.
    pub fn insert(&mut self, category: u32) {
        self.0.insert(category);
    }

    /// Number of categories in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the categories in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u32> for CategorySet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Which side of a numeric threshold includes the boundary value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Boundary {
    /// Go left when `value <= threshold`.
    LeftInclusive,
    /// Go right when `value >= threshold`.
    RightInclusive,
}

/// The learned routing decision of a split node.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Condition {
    /// Threshold comparison on a numeric feature.
    Numeric {
        /// Split boundary value.
        threshold: f64,
        /// Side that includes `threshold` itself.
        boundary: Boundary,
    },
    /// Set membership on a categorical feature encoded as integral ids.
    Categorical {
        /// Categories sent right; everything else goes left.
        categories: CategorySet,
    },
}

impl Condition {
    /// Return `true` if a sample with this feature value takes the left branch.
    #[must_use]
    pub fn goes_left(&self, value: f64) -> bool {
        match self {
            Condition::Numeric {
                threshold,
                boundary: Boundary::LeftInclusive,
            } => value <= *threshold,
            Condition::Numeric {
                threshold,
                boundary: Boundary::RightInclusive,
            } => value < *threshold,
            Condition::Categorical { categories } => match category_id(value) {
                Some(id) => !categories.contains(id),
                None => true,
            },
        }
    }

    /// Return `true` for categorical set-membership conditions.
    #[must_use]
    pub fn is_categorical(&self) -> bool {
        matches!(self, Condition::Categorical { .. })
    }

    /// Return the numeric threshold, or `None` for categorical conditions.
    #[must_use]
    pub fn threshold(&self) -> Option<f64> {
        match self {
            Condition::Numeric { threshold, .. } => Some(*threshold),
            Condition::Categorical { .. } => None,
        }
    }
}

/// Interpret a feature value as a category id.
fn category_id(value: f64) -> Option<u32> {
    if value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        Some(value as u32)
    } else {
        None
    }
}

/// A node of a normalized tree table.
///
/// Children are referenced by [`NodeIndex`] into the owning table. The
/// optional `distribution` holds the per-class weights the model export
/// recorded for the node, ordered like the caller's class names.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TableNode {
    /// An interior split node.
    Split {
        /// Feature used for the split.
        feature: FeatureIndex,
        /// Routing decision applied to `feature`.
        condition: Condition,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// Class weights recorded by the export, if any.
        distribution: Option<Vec<f64>>,
    },
    /// A terminal leaf node.
    Leaf {
        /// Class weights recorded by the export, if any.
        distribution: Option<Vec<f64>>,
    },
}

impl TableNode {
    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, TableNode::Leaf { .. })
    }

    /// Return the recorded class distribution, if the export carried one.
    #[must_use]
    pub fn distribution(&self) -> Option<&[f64]> {
        match self {
            TableNode::Split { distribution, .. } | TableNode::Leaf { distribution } => {
                distribution.as_deref()
            }
        }
    }

    /// Return the left and right children of a split node.
    #[must_use]
    pub fn children(&self) -> Option<(NodeIndex, NodeIndex)> {
        match self {
            TableNode::Split { left, right, .. } => Some((*left, *right)),
            TableNode::Leaf { .. } => None,
        }
    }
}
