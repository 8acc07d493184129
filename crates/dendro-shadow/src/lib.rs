//! Shadow trees: normalized, read-only views over one tree of a fitted forest.
//!
//! A [`TreeExportReader`] turns a model family's own tree layout into a
//! validated [`NodeTable`]; [`ShadowTreeConfig::build`] pairs that table with
//! the training data to answer topology, split, sample and prediction
//! queries in one uniform shape.

mod cart;
mod error;
mod export;
mod node;
mod reader;
mod shadow;
mod summary;
mod table;
mod ydf;

pub use cart::{CartForest, CartTree};
pub use error::{ErrorKind, ShadowError};
pub use export::ForestExport;
pub use node::{
    Boundary, CategorySet, Condition, FeatureIndex, LEAF_CHILD, LEAF_FEATURE, LEAF_THRESHOLD,
    NodeIndex, TableNode,
};
pub use reader::{ModelFamily, TreeExportReader};
pub use shadow::{ShadowTree, ShadowTreeConfig};
pub use summary::{NodeSummary, TreeSummary};
pub use table::NodeTable;
pub use ydf::{YdfCondition, YdfForest, YdfNode, YdfTree};
