//! Family-tagged forest exports and their JSON files.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::cart::CartForest;
use crate::error::ShadowError;
use crate::reader::{ModelFamily, TreeExportReader};
use crate::table::NodeTable;
use crate::ydf::YdfForest;

/// A forest export of any supported family.
///
/// Serialized with a `"family"` tag so one file format covers every family.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ForestExport {
    /// Yggdrasil / TensorFlow Decision Forests.
    Ydf(YdfForest),
    /// scikit-learn style CART.
    Cart(CartForest),
}

impl ForestExport {
    fn reader(&self) -> &dyn TreeExportReader {
        match self {
            ForestExport::Ydf(forest) => forest,
            ForestExport::Cart(forest) => forest,
        }
    }

    /// Save the export as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ShadowError::WriteExport`] when the file cannot be written.
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ShadowError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| ShadowError::WriteExport {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?;
        std::fs::write(path, json.as_bytes()).map_err(|e| ShadowError::WriteExport {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!(
            family = %self.family(),
            n_trees = self.n_trees(),
            size_bytes = json.len(),
            "forest export saved"
        );
        Ok(())
    }

    /// Load an export from a JSON file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ShadowError::ReadExport`] | file read failed |
    /// | [`ShadowError::ParseExport`] | contents are not a known export |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ShadowError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ShadowError::ReadExport {
            path: path.to_path_buf(),
            source: e,
        })?;
        let export: ForestExport =
            serde_json::from_slice(&bytes).map_err(|e| ShadowError::ParseExport {
                path: path.to_path_buf(),
                source: e,
            })?;
        debug!(
            family = %export.family(),
            n_trees = export.n_trees(),
            "forest export loaded"
        );
        Ok(export)
    }
}

impl From<YdfForest> for ForestExport {
    fn from(forest: YdfForest) -> Self {
        ForestExport::Ydf(forest)
    }
}

impl From<CartForest> for ForestExport {
    fn from(forest: CartForest) -> Self {
        ForestExport::Cart(forest)
    }
}

impl TreeExportReader for ForestExport {
    fn family(&self) -> ModelFamily {
        self.reader().family()
    }

    fn n_trees(&self) -> usize {
        self.reader().n_trees()
    }

    fn read_tree(&self, tree_index: usize) -> Result<NodeTable, ShadowError> {
        self.reader().read_tree(tree_index)
    }
}
