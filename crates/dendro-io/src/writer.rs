//! JSON writer for tree summaries and forest surveys.

use std::fs;
use std::path::{Path, PathBuf};

use dendro_shadow::TreeSummary;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Shape of one tree in a forest survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyEntry {
    /// Tree index within the forest.
    pub tree_index: usize,
    /// Number of nodes.
    pub n_nodes: usize,
    /// Number of leaves.
    pub n_leaves: usize,
    /// Computed root-to-leaf edge count.
    pub depth: usize,
    /// Depth as reported by the shadow tree (recorded limit when present).
    pub max_depth: usize,
}

/// Writes shadow-tree summaries to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_tree{index}.json` and
/// `{experiment}_survey.json`.
pub struct SummaryWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl SummaryWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Path of the summary file for `tree_index`.
    #[must_use]
    pub fn summary_path(&self, tree_index: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_tree{tree_index}.json", self.experiment.as_str()))
    }

    /// Path of the survey file.
    #[must_use]
    pub fn survey_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_survey.json", self.experiment.as_str()))
    }

    /// Write one tree summary to `{experiment}_tree{index}.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(tree_index = summary.tree_index))]
    pub fn write_summary(&self, summary: &TreeSummary) -> Result<PathBuf, IoError> {
        let path = self.summary_path(summary.tree_index);
        let artifact = SummaryArtifact {
            experiment: self.experiment.as_str(),
            tree: summary,
        };
        write_json(&path, &artifact)?;
        info!(path = %path.display(), n_nodes = summary.n_nodes, "tree summary written");
        Ok(path)
    }

    /// Write a forest survey to `{experiment}_survey.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n_trees = entries.len()))]
    pub fn write_survey(&self, entries: &[SurveyEntry]) -> Result<PathBuf, IoError> {
        let path = self.survey_path();
        let artifact = SurveyArtifact {
            experiment: self.experiment.as_str(),
            n_trees: entries.len(),
            trees: entries,
        };
        write_json(&path, &artifact)?;
        info!(path = %path.display(), "survey written");
        Ok(path)
    }
}

fn write_json<T: Serialize>(path: &Path, artifact: &T) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, json).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct SummaryArtifact<'a> {
    experiment: &'a str,
    tree: &'a TreeSummary,
}

#[derive(Serialize)]
struct SurveyArtifact<'a> {
    experiment: &'a str,
    n_trees: usize,
    trees: &'a [SurveyEntry],
}

#[cfg(test)]
mod tests {
    use super::*;
    use dendro_shadow::{CartForest, CartTree, ShadowTreeConfig};
    use tempfile::TempDir;

    fn stump_summary() -> TreeSummary {
        let forest = CartForest::new(vec![CartTree::new(
            vec![1, -1, -1],
            vec![2, -1, -1],
            vec![0, -2, -2],
            vec![0.5, -2.0, -2.0],
            vec![],
        )]);
        let x = vec![vec![0.0], vec![1.0], vec![1.0]];
        let y = vec!["no".to_string(), "yes".to_string(), "yes".to_string()];
        ShadowTreeConfig::new(0)
            .with_feature_names(["Sex_label"])
            .with_target_name("Survived")
            .with_class_names(["no".to_string(), "yes".to_string()])
            .build(&forest, &x, &y)
            .unwrap()
            .summary()
    }

    #[test]
    fn write_summary_json_structure() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("titanic".into()).unwrap();
        let writer = SummaryWriter::new(dir.path(), experiment).unwrap();

        let path = writer.write_summary(&stump_summary()).unwrap();
        assert_eq!(path, dir.path().join("titanic_tree0.json"));

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(content["experiment"], "titanic");
        assert_eq!(content["tree"]["family"], "cart");
        assert_eq!(content["tree"]["target_name"], "Survived");
        assert_eq!(content["tree"]["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(content["tree"]["nodes"][2]["prediction"], "yes");
    }

    #[test]
    fn write_survey_json_structure() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("survey_run".into()).unwrap();
        let writer = SummaryWriter::new(dir.path(), experiment).unwrap();

        let entries = vec![
            SurveyEntry {
                tree_index: 0,
                n_nodes: 7,
                n_leaves: 4,
                depth: 2,
                max_depth: 3,
            },
            SurveyEntry {
                tree_index: 1,
                n_nodes: 3,
                n_leaves: 2,
                depth: 1,
                max_depth: 3,
            },
        ];
        writer.write_survey(&entries).unwrap();

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(writer.survey_path()).unwrap()).unwrap();
        assert_eq!(content["n_trees"], 2);
        let back: Vec<SurveyEntry> = serde_json::from_value(content["trees"].clone()).unwrap();
        assert_eq!(back, entries);
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let experiment = ExperimentName::new("nested".into()).unwrap();
        SummaryWriter::new(&nested, experiment).unwrap();
        assert!(nested.is_dir());
    }
}
