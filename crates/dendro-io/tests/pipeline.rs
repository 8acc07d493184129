//! End-to-end integration tests: CSV + forest export -> shadow tree -> JSON -> deserialize.

use std::fs;
use std::path::{Path, PathBuf};

use dendro_io::{ExperimentName, FrameReader, SummaryWriter, SurveyEntry};
use dendro_shadow::{ForestExport, ShadowTree, ShadowTreeConfig, TreeExportReader, TreeSummary};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn read_frame() -> dendro_io::TrainingFrame {
    FrameReader::new(&fixture_path("titanic_12.csv"))
        .with_target("Survived")
        .read()
        .expect("fixture should parse")
}

fn shadow<'a>(
    forest: &ForestExport,
    frame: &'a dendro_io::TrainingFrame,
    tree_index: usize,
) -> ShadowTree<'a, String> {
    ShadowTreeConfig::new(tree_index)
        .with_feature_names(frame.feature_names().iter().cloned())
        .with_target_name(frame.target_name())
        .with_class_names(frame.distinct_labels())
        .build(forest, frame.features(), frame.labels())
        .expect("fixture forest fits fixture frame")
}

#[test]
fn inspect_round_trip() {
    let frame = read_frame();
    assert_eq!(frame.n_samples(), 12);
    assert_eq!(frame.feature_names(), &["Pclass", "Sex_label", "Age", "Fare"]);

    let forest = ForestExport::load(fixture_path("titanic_forest.json")).unwrap();
    assert_eq!(forest.n_trees(), 2);

    let tree = shadow(&forest, &frame, 0);
    assert_eq!(tree.node_samples()[0].len(), 12);
    assert_eq!(tree.node_samples()[1], vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(tree.node_samples()[4], vec![6, 7, 8, 9, 10, 11]);
    assert_eq!(tree.node_n_samples_by_class(0).unwrap(), vec![7, 5]);
    assert_eq!(tree.node_n_samples_by_class(6).unwrap(), vec![2, 1]);
    assert_eq!(tree.prediction(5).unwrap(), "1");
    assert_eq!(tree.max_depth(), 3);

    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("pipeline".into()).unwrap();
    let writer = SummaryWriter::new(dir.path(), experiment).unwrap();
    let summary = tree.summary();
    let path = writer.write_summary(&summary).unwrap();
    assert_eq!(path, dir.path().join("pipeline_tree0.json"));

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "pipeline");

    let back: TreeSummary = serde_json::from_value(content["tree"].clone()).unwrap();
    assert_eq!(back, summary);
    assert_eq!(back.class_names, vec!["0", "1"]);
    assert_eq!(back.nodes[0].feature_name.as_deref(), Some("Sex_label"));
    assert_eq!(back.nodes[4].threshold, Some(2.5));

    // Children account for every sample of their parent.
    for node in &back.nodes {
        if node.left >= 0 {
            let left = &back.nodes[node.left as usize];
            let right = &back.nodes[node.right as usize];
            assert_eq!(left.n_samples + right.n_samples, node.n_samples);
        }
    }
}

#[test]
fn categorical_tree_round_trip() {
    let frame = read_frame();
    let forest = ForestExport::load(fixture_path("titanic_forest.json")).unwrap();
    let tree = shadow(&forest, &frame, 1);

    assert!(tree.is_categorical_split(0).unwrap());
    assert!(tree.thresholds()[0].is_nan());
    assert_eq!(tree.node_samples()[2], vec![3, 4, 5, 9, 10, 11]);
    // Third-class passengers mostly died; the rest mostly survived.
    assert_eq!(tree.prediction(2).unwrap(), "0");
    assert_eq!(tree.prediction(1).unwrap(), "1");

    let summary = tree.summary();
    assert_eq!(summary.nodes[0].threshold, None);
    assert_eq!(summary.nodes[0].categories, Some(vec![3]));
}

#[test]
fn survey_round_trip() {
    let frame = read_frame();
    let forest = ForestExport::load(fixture_path("titanic_forest.json")).unwrap();

    let entries: Vec<SurveyEntry> = (0..forest.n_trees())
        .map(|i| {
            let tree = shadow(&forest, &frame, i);
            SurveyEntry {
                tree_index: i,
                n_nodes: tree.n_nodes(),
                n_leaves: tree.leaves().len(),
                depth: tree.tree_depth(),
                max_depth: tree.max_depth(),
            }
        })
        .collect();

    let dir = TempDir::new().unwrap();
    let writer = SummaryWriter::new(dir.path(), ExperimentName::new("forest".into()).unwrap())
        .unwrap();
    let path = writer.write_survey(&entries).unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(content["n_trees"], 2);
    assert_eq!(content["trees"][0]["n_leaves"], 4);
    assert_eq!(content["trees"][0]["depth"], 2);
    assert_eq!(content["trees"][1]["n_nodes"], 3);
    assert_eq!(content["trees"][1]["max_depth"], 3);
}

#[test]
fn mismatched_frame_is_rejected() {
    let frame = FrameReader::new(&fixture_path("titanic_12.csv"))
        .with_target("Survived")
        .with_features(vec!["Age".into()])
        .read()
        .unwrap();
    let forest = ForestExport::load(fixture_path("titanic_forest.json")).unwrap();

    // Tree 0 splits on column 1, which a one-column frame lacks.
    let err = ShadowTreeConfig::new(0)
        .with_feature_names(frame.feature_names().iter().cloned())
        .with_class_names(frame.distinct_labels())
        .build(&forest, frame.features(), frame.labels())
        .unwrap_err();
    assert!(matches!(
        err,
        dendro_shadow::ShadowError::FeatureOutOfRange { feature: 1, .. }
    ));
}
