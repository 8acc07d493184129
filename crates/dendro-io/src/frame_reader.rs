//! CSV training-frame reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::TrainingFrame;

/// Reads the frame a forest was trained on from a CSV file.
///
/// Expected CSV format:
/// - Header row required
/// - One column holds the label (the target); it is kept as raw text
/// - Feature columns hold finite floats; categorical features are stored as
///   their integral category ids
///
/// Without [`with_features`](Self::with_features), every non-target column
/// is a feature, in header order.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | Target or a selected feature is not in the header |
/// | [`IoError::NoFeatureColumns`] | Only the target column remains |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Feature cell is NaN, Inf, or unparseable float |
/// | [`IoError::EmptyLabel`] | Target cell is empty |
pub struct FrameReader {
    path: PathBuf,
    target: String,
    features: Option<Vec<String>>,
}

impl FrameReader {
    /// Create a new reader for the given CSV file path.
    ///
    /// The target column defaults to `"target"`.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            target: "target".to_string(),
            features: None,
        }
    }

    /// Set the label column name.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Select and order the feature columns explicitly.
    #[must_use]
    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = Some(features);
        self
    }

    fn column_index(&self, header: &csv::StringRecord, column: &str) -> Result<usize, IoError> {
        header
            .iter()
            .position(|name| name == column)
            .ok_or_else(|| IoError::MissingColumn {
                path: self.path.clone(),
                column: column.to_string(),
            })
    }

    /// Read and validate the CSV file, returning a [`TrainingFrame`].
    #[instrument(skip(self), fields(path = %self.path.display(), target = %self.target))]
    pub fn read(&self) -> Result<TrainingFrame, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets our own InconsistentRowLength check fire instead
        // of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr
            .headers()
            .map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?
            .clone();
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        let target_col = self.column_index(&header, &self.target)?;
        let feature_names: Vec<String> = match &self.features {
            Some(selected) => selected.clone(),
            None => header
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != target_col)
                .map(|(_, name)| name.to_string())
                .collect(),
        };
        if feature_names.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        let feature_cols = feature_names
            .iter()
            .map(|name| self.column_index(&header, name))
            .collect::<Result<Vec<usize>, _>>()?;

        let mut features = Vec::new();
        let mut labels = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let label = record.get(target_col).unwrap_or("").trim();
            if label.is_empty() {
                return Err(IoError::EmptyLabel {
                    path: self.path.clone(),
                    row_index,
                });
            }

            let mut row = Vec::with_capacity(feature_cols.len());
            for (&col, name) in feature_cols.iter().zip(&feature_names) {
                let raw = record.get(col).unwrap_or("");
                let non_finite = || IoError::NonFiniteValue {
                    path: self.path.clone(),
                    row_index,
                    column: name.clone(),
                    raw: raw.to_string(),
                };
                let value: f64 = raw.trim().parse().map_err(|_| non_finite())?;
                if !value.is_finite() {
                    return Err(non_finite());
                }
                row.push(value);
            }

            labels.push(label.to_string());
            features.push(row);
        }

        if features.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_samples = features.len(),
            n_features = feature_names.len(),
            "training frame loaded"
        );

        Ok(TrainingFrame::new(
            feature_names,
            self.target.clone(),
            features,
            labels,
        ))
    }
}
