use std::path::PathBuf;

/// Broad category of a [`ShadowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied inputs that cannot describe this tree.
    Configuration,
    /// A per-node query named a node that does not exist.
    Index,
    /// The model export itself is unreadable or violates tree invariants.
    Export,
}

/// Errors from building or querying a shadow tree.
#[derive(Debug, thiserror::Error)]
pub enum ShadowError {
    /// Returned when the requested tree does not exist in the forest.
    #[error("tree index {tree_index} out of range, forest has {n_trees} trees")]
    InvalidTreeIndex {
        /// The requested tree index.
        tree_index: usize,
        /// Number of trees in the forest.
        n_trees: usize,
    },

    /// Returned when the number of feature names differs from the column count.
    #[error("got {got} feature names, but the feature matrix has {expected} columns")]
    FeatureNameCountMismatch {
        /// Column count of the feature matrix.
        expected: usize,
        /// Number of feature names supplied.
        got: usize,
    },

    /// Returned when the feature matrix and label vector lengths differ.
    #[error("feature matrix has {n_rows} rows, but {n_labels} labels were supplied")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_rows: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when the feature matrix has zero rows.
    #[error("feature matrix has zero rows")]
    EmptyDataset,

    /// Returned when a row has a different width than the first row.
    #[error("row {row_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the row.
        got: usize,
        /// The zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value at row {row_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending row.
        row_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when no class names were supplied.
    #[error("class names must not be empty")]
    EmptyClassNames,

    /// Returned when the same class label is listed twice.
    #[error("class label {label} is listed more than once")]
    DuplicateClassName {
        /// Debug rendering of the repeated label.
        label: String,
    },

    /// Returned when a training label is not among the class names.
    #[error("label {label} at row {row_index} is not one of the class names")]
    UnknownLabel {
        /// Debug rendering of the unknown label.
        label: String,
        /// The zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when a split references a column the feature matrix lacks.
    #[error("node {node} splits on feature {feature}, but the data has {n_features} features")]
    FeatureOutOfRange {
        /// The offending node index.
        node: usize,
        /// The referenced feature index.
        feature: usize,
        /// Column count of the feature matrix.
        n_features: usize,
    },

    /// Returned when a recorded class distribution has the wrong length.
    #[error("node {node} records {got} class weights, expected {expected}")]
    ClassCountMismatch {
        /// The offending node index.
        node: usize,
        /// Number of class names.
        expected: usize,
        /// Length of the recorded distribution.
        got: usize,
    },

    /// Returned when a sample to route has the wrong number of features.
    #[error("sample has {got} features, expected {expected}")]
    SampleWidthMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
    },

    /// Returned when a sample to route holds a NaN or infinite value.
    #[error("sample has a non-finite value at feature {feature_index}")]
    NonFiniteSampleValue {
        /// The zero-based index of the offending feature.
        feature_index: usize,
    },

    /// Returned when a per-node query names a node that does not exist.
    #[error("node index {node} out of range, tree has {n_nodes} nodes")]
    NodeIndexOutOfRange {
        /// The requested node index.
        node: usize,
        /// Number of nodes in the tree.
        n_nodes: usize,
    },

    /// Returned when a tree export violates the tree invariants.
    #[error("malformed export for tree {tree_index}: {reason}")]
    MalformedExport {
        /// Tree whose export is malformed.
        tree_index: usize,
        /// Human-readable description of the violation.
        reason: String,
    },

    /// Returned when reading a forest export file fails.
    #[error("failed to read forest export from {path}")]
    ReadExport {
        /// Path to the export file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a forest export file is not valid JSON for any family.
    #[error("failed to parse forest export from {path}")]
    ParseExport {
        /// Path to the export file.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when writing a forest export file fails.
    #[error("failed to write forest export to {path}")]
    WriteExport {
        /// Path to the export file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl ShadowError {
    /// Return the broad category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShadowError::NodeIndexOutOfRange { .. } => ErrorKind::Index,
            ShadowError::MalformedExport { .. }
            | ShadowError::ReadExport { .. }
            | ShadowError::ParseExport { .. }
            | ShadowError::WriteExport { .. } => ErrorKind::Export,
            _ => ErrorKind::Configuration,
        }
    }
}
