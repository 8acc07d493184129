//! Domain types for dendro-io.

use std::collections::BTreeSet;

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The frame a forest was trained on: feature matrix plus label column.
///
/// Produced by [`FrameReader`](crate::FrameReader). `features[i]` and
/// `labels[i]` describe the same CSV row.
#[derive(Debug)]
pub struct TrainingFrame {
    feature_names: Vec<String>,
    target_name: String,
    features: Vec<Vec<f64>>,
    labels: Vec<String>,
}

impl TrainingFrame {
    /// Create a new training frame.
    pub(crate) fn new(
        feature_names: Vec<String>,
        target_name: String,
        features: Vec<Vec<f64>>,
        labels: Vec<String>,
    ) -> Self {
        Self {
            feature_names,
            target_name,
            features,
            labels,
        }
    }

    /// Return the feature column names, in matrix column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the label column name.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the raw label of every row.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Return the distinct labels in ascending order.
    ///
    /// When every label parses as a number they are ordered by value, so
    /// `"2"` precedes `"10"`; otherwise they are ordered as strings.
    #[must_use]
    pub fn distinct_labels(&self) -> Vec<String> {
        let mut distinct: Vec<String> = self
            .labels
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();

        let numeric: Option<Vec<f64>> = distinct
            .iter()
            .map(|label| label.trim().parse::<f64>().ok())
            .collect();
        if let Some(values) = numeric {
            let mut keyed: Vec<(f64, String)> = values.into_iter().zip(distinct).collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
            distinct = keyed.into_iter().map(|(_, label)| label).collect();
        }
        distinct
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}
