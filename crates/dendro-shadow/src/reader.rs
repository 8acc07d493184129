use std::fmt;

use crate::error::ShadowError;
use crate::table::NodeTable;

/// Model family a forest export comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Yggdrasil / TensorFlow Decision Forests pre-order node lists.
    Ydf,
    /// scikit-learn style parallel node arrays.
    Cart,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Ydf => f.write_str("ydf"),
            ModelFamily::Cart => f.write_str("cart"),
        }
    }
}

/// Read access to the trees of a fitted forest.
///
/// Each supported model family implements this to translate its own node
/// layout into a [`NodeTable`]. Implementations never recompute splits; they
/// only re-index what the model exported.
pub trait TreeExportReader {
    /// Return the family this export belongs to.
    fn family(&self) -> ModelFamily;

    /// Return the number of trees in the forest.
    fn n_trees(&self) -> usize;

    /// Normalize the tree at `tree_index`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ShadowError::InvalidTreeIndex`] | `tree_index >= n_trees()` |
    /// | [`ShadowError::MalformedExport`] | the export does not describe a tree |
    fn read_tree(&self, tree_index: usize) -> Result<NodeTable, ShadowError>;
}

/// Fail with [`ShadowError::InvalidTreeIndex`] unless `tree_index` is in range.
pub(crate) fn check_tree_index(tree_index: usize, n_trees: usize) -> Result<(), ShadowError> {
    if tree_index >= n_trees {
        return Err(ShadowError::InvalidTreeIndex { tree_index, n_trees });
    }
    Ok(())
}
