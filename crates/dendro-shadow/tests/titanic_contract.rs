//! Contract tests for shadow trees over a Titanic-style random forest.
//!
//! The fixture reproduces the first tree of a depth-3 YDF forest trained on
//! the 891-row Titanic frame (seed 1234). Rows are synthesized so that each
//! leaf receives the same number of passengers, per class, as the real data.

use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use dendro_shadow::{
    ErrorKind, LEAF_CHILD, LEAF_FEATURE, LEAF_THRESHOLD, ShadowError, ShadowTree,
    ShadowTreeConfig, TreeExportReader, YdfForest, YdfNode, YdfTree,
};

const FEATURES: [&str; 7] = [
    "Pclass",
    "Sex_label",
    "Embarked_label",
    "Age_mean",
    "SibSp",
    "Parch",
    "Fare",
];

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// A block of passengers that all end in the same leaf.
struct Cohort {
    n_rows: usize,
    n_died: usize,
    pclass: &'static [f64],
    sex: f64,
    parch: &'static [f64],
}

/// Generate the 891-row frame with `Survived` labels in {0, 1}.
fn titanic_frame() -> (Vec<Vec<f64>>, Vec<i32>) {
    let cohorts = [
        // Men in first class.
        Cohort { n_rows: 122, n_died: 77, pclass: &[1.0], sex: 0.0, parch: &[0.0, 1.0, 2.0] },
        // Men in second and third class.
        Cohort { n_rows: 455, n_died: 391, pclass: &[2.0, 3.0], sex: 0.0, parch: &[0.0, 1.0, 2.0, 3.0] },
        // Women with at most two parents/children aboard.
        Cohort { n_rows: 294, n_died: 63, pclass: &[1.0, 2.0, 3.0], sex: 1.0, parch: &[0.0, 1.0, 2.0] },
        // Women with larger families.
        Cohort { n_rows: 20, n_died: 18, pclass: &[1.0, 2.0, 3.0], sex: 1.0, parch: &[3.0, 4.0, 5.0, 6.0] },
    ];

    let mut rng = ChaCha8Rng::seed_from_u64(1234);
    let mut rows: Vec<(Vec<f64>, i32)> = Vec::with_capacity(891);
    for cohort in &cohorts {
        for i in 0..cohort.n_rows {
            let row = vec![
                cohort.pclass[rng.gen_range(0..cohort.pclass.len())],
                cohort.sex,
                rng.gen_range(0..3) as f64,
                rng.gen_range(1.0..80.0),
                rng.gen_range(0..5) as f64,
                cohort.parch[rng.gen_range(0..cohort.parch.len())],
                rng.gen_range(5.0..250.0),
            ];
            let survived = i32::from(i >= cohort.n_died);
            rows.push((row, survived));
        }
    }
    rows.shuffle(&mut rng);
    rows.into_iter().unzip()
}

/// The exported forest: tree 0 as learned, tree 1 a stump on `Fare`.
fn titanic_forest() -> YdfForest {
    let tree0 = YdfTree::new(vec![
        YdfNode::higher(1, 0.5, Some(vec![549.0, 342.0])),
        YdfNode::higher(0, 1.5, Some(vec![468.0, 109.0])),
        YdfNode::leaf(Some(vec![77.0, 45.0])),
        YdfNode::leaf(Some(vec![391.0, 64.0])),
        YdfNode::higher(5, 2.5, Some(vec![81.0, 233.0])),
        YdfNode::leaf(Some(vec![63.0, 231.0])),
        YdfNode::leaf(Some(vec![18.0, 2.0])),
    ]);
    let tree1 = YdfTree::new(vec![
        YdfNode::higher(6, 50.0, Some(vec![549.0, 342.0])),
        YdfNode::leaf(Some(vec![400.0, 200.0])),
        YdfNode::leaf(Some(vec![149.0, 142.0])),
    ]);
    YdfForest::new(vec![tree0, tree1]).with_max_depth(Some(3))
}

fn config(tree_index: usize) -> ShadowTreeConfig<i32> {
    ShadowTreeConfig::new(tree_index)
        .with_feature_names(FEATURES)
        .with_target_name("Survived")
        .with_class_names([0, 1])
}

fn shadow<'a>(forest: &YdfForest, x: &'a [Vec<f64>], y: &'a [i32]) -> ShadowTree<'a, i32> {
    config(0).build(forest, x, y).unwrap()
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

#[test]
fn is_fit() {
    let (x, y) = titanic_frame();
    assert!(shadow(&titanic_forest(), &x, &y).is_fit());
}

#[test]
fn children() {
    let (x, y) = titanic_frame();
    let tree = shadow(&titanic_forest(), &x, &y);
    assert_eq!(tree.children_left(), vec![1, 2, -1, -1, 5, -1, -1]);
    assert_eq!(tree.children_right(), vec![4, 3, -1, -1, 6, -1, -1]);
}

#[test]
fn classes() {
    let (x, y) = titanic_frame();
    let tree = shadow(&titanic_forest(), &x, &y);
    assert_eq!(tree.n_classes(), 2);
    assert_eq!(tree.classes(), &[0, 1]);
}

#[test]
fn features_and_thresholds() {
    let (x, y) = titanic_frame();
    let tree = shadow(&titanic_forest(), &x, &y);
    assert_eq!(tree.features(), vec![1, 0, -2, -2, 5, -2, -2]);
    assert_eq!(tree.node_feature(0).unwrap(), 1);
    assert_eq!(tree.node_feature(4).unwrap(), 5);
    assert_eq!(tree.node_feature(2).unwrap(), -2);
    assert_eq!(
        tree.thresholds(),
        vec![0.5, 1.5, -2.0, -2.0, 2.5, -2.0, -2.0]
    );
    assert_eq!(tree.node_feature_name(0).unwrap(), Some("Sex_label"));
}

#[test]
fn max_depth() {
    let (x, y) = titanic_frame();
    let tree = shadow(&titanic_forest(), &x, &y);
    assert_eq!(tree.max_depth(), 3);
    assert_eq!(tree.tree_depth(), 2);
}

#[test]
fn numeric_splits_only() {
    let (x, y) = titanic_frame();
    let tree = shadow(&titanic_forest(), &x, &y);
    assert!(!tree.is_categorical_split(0).unwrap());
    assert!(!tree.is_categorical_split(1).unwrap());
}

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

#[test]
fn node_samples() {
    let (x, y) = titanic_frame();
    let tree = shadow(&titanic_forest(), &x, &y);
    let samples = tree.node_samples();
    assert_eq!(samples[0].len(), 891, "node 0 should hold every row");
    assert_eq!(samples[1].len(), 577, "node 1 should hold 577 rows");
    assert_eq!(samples[2].len(), 122, "node 2 should hold 122 rows");
    assert_eq!(samples[4].len(), 314, "node 4 should hold 314 rows");

    assert_eq!(tree.node_n_samples(0).unwrap(), 891);
    assert_eq!(tree.node_n_samples(1).unwrap(), 577);
    assert_eq!(tree.node_n_samples(2).unwrap(), 122);
    assert_eq!(tree.node_n_samples(4).unwrap(), 314);
}

#[test]
fn node_samples_by_class() {
    let (x, y) = titanic_frame();
    let tree = shadow(&titanic_forest(), &x, &y);
    assert_eq!(tree.node_n_samples_by_class(0).unwrap(), vec![549, 342]);
    assert_eq!(tree.node_n_samples_by_class(1).unwrap(), vec![468, 109]);
    assert_eq!(tree.node_n_samples_by_class(4).unwrap(), vec![81, 233]);
}

#[test]
fn predictions() {
    let (x, y) = titanic_frame();
    let tree = shadow(&titanic_forest(), &x, &y);
    let predicted: Vec<i32> = (0..7).map(|n| *tree.prediction(n).unwrap()).collect();
    assert_eq!(predicted, vec![0, 0, 0, 0, 1, 1, 0]);
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

/// Children partition their parent: disjoint, and together equal to it.
#[test]
fn children_partition_parent() {
    let (x, y) = titanic_frame();
    let tree = shadow(&titanic_forest(), &x, &y);
    let samples = tree.node_samples();
    let (left, right) = (tree.children_left(), tree.children_right());

    for node in tree.internal() {
        let i = node.index();
        let l = &samples[left[i] as usize];
        let r = &samples[right[i] as usize];
        assert!(l.iter().all(|row| !r.contains(row)), "children of {i} overlap");

        let mut union: Vec<usize> = l.iter().chain(r).copied().collect();
        union.sort_unstable();
        assert_eq!(union, samples[i], "children of {i} do not cover it");
        assert!(!l.is_empty() && l.len() < samples[i].len());
    }
}

#[test]
fn counts_are_consistent() {
    let (x, y) = titanic_frame();
    let tree = shadow(&titanic_forest(), &x, &y);
    assert_eq!(tree.children_left().len(), tree.n_nodes());
    assert_eq!(tree.children_right().len(), tree.n_nodes());

    for i in 0..tree.n_nodes() {
        let n = tree.node_n_samples(i).unwrap();
        assert_eq!(n, tree.node_samples()[i].len());
        assert_eq!(tree.node_n_samples_by_class(i).unwrap().iter().sum::<usize>(), n);
    }
}

#[test]
fn leaves_carry_sentinels() {
    let (x, y) = titanic_frame();
    let tree = shadow(&titanic_forest(), &x, &y);
    let thresholds = tree.thresholds();
    for leaf in tree.leaves() {
        let i = leaf.index();
        assert_eq!(tree.node_feature(i).unwrap(), LEAF_FEATURE);
        assert_eq!(thresholds[i], LEAF_THRESHOLD);
        assert_eq!(tree.children_left()[i], LEAF_CHILD);
        assert!(!tree.is_categorical_split(i).unwrap());
    }
    assert_eq!(tree.leaves().len(), 4);
}

/// Two shadows of the same tree answer every query identically.
#[test]
fn deterministic_construction() {
    let (x, y) = titanic_frame();
    let forest = titanic_forest();
    let a = shadow(&forest, &x, &y);
    let b = shadow(&forest, &x, &y);

    assert_eq!(a.children_left(), b.children_left());
    assert_eq!(a.children_right(), b.children_right());
    assert_eq!(a.features(), b.features());
    assert_eq!(a.thresholds(), b.thresholds());
    assert_eq!(a.node_samples(), b.node_samples());
    assert_eq!(a.max_depth(), b.max_depth());
    assert_eq!(a.summary(), b.summary());
    for i in 0..a.n_nodes() {
        assert_eq!(a.prediction(i).unwrap(), b.prediction(i).unwrap());
        assert_eq!(
            a.node_n_samples_by_class(i).unwrap(),
            b.node_n_samples_by_class(i).unwrap()
        );
    }
}

#[test]
fn predict_path_matches_training_samples() {
    let (x, y) = titanic_frame();
    let tree = shadow(&titanic_forest(), &x, &y);
    for (row, sample) in x.iter().enumerate().take(50) {
        let path = tree.predict_path(sample).unwrap();
        for node in path {
            assert!(tree.node_samples()[node.index()].contains(&row));
        }
    }
}

// ---------------------------------------------------------------------------
// Other trees and failures
// ---------------------------------------------------------------------------

#[test]
fn second_tree() {
    let (x, y) = titanic_frame();
    let forest = titanic_forest();
    assert_eq!(forest.n_trees(), 2);
    let tree = config(1).build(&forest, &x, &y).unwrap();
    assert_eq!(tree.tree_index(), 1);
    assert_eq!(tree.n_nodes(), 3);
    assert_eq!(tree.node_feature_name(0).unwrap(), Some("Fare"));
    let n_left = tree.node_n_samples(1).unwrap();
    let n_right = tree.node_n_samples(2).unwrap();
    assert_eq!(n_left + n_right, 891);
}

#[test]
fn tree_index_out_of_range() {
    let (x, y) = titanic_frame();
    let err = config(2).build(&titanic_forest(), &x, &y).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(matches!(err, ShadowError::InvalidTreeIndex { tree_index: 2, n_trees: 2 }));
}

#[test]
fn feature_name_mismatch() {
    let (x, y) = titanic_frame();
    let err = config(0)
        .with_feature_names(FEATURES[..6].iter().copied())
        .build(&titanic_forest(), &x, &y)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn node_index_out_of_range() {
    let (x, y) = titanic_frame();
    let tree = shadow(&titanic_forest(), &x, &y);
    let err = tree.node_feature(7).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Index);
    assert!(matches!(err, ShadowError::NodeIndexOutOfRange { node: 7, n_nodes: 7 }));
}
