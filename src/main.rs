use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use dendro_io::{ExperimentName, FrameReader, SummaryWriter, SurveyEntry, TrainingFrame};
use dendro_shadow::{ForestExport, ShadowTree, ShadowTreeConfig, TreeExportReader};

#[derive(Parser)]
#[command(name = "dendro")]
#[command(about = "Inspect single trees of fitted random forests against their training data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Inputs shared by every command: the forest and the frame it was trained on.
#[derive(Args, Debug, Clone)]
struct ModelArgs {
    /// Path to the JSON forest export
    #[arg(long)]
    model: PathBuf,

    /// Path to the training CSV file
    #[arg(long)]
    data: PathBuf,

    /// Name of the label column
    #[arg(long)]
    target: String,

    /// Class labels in the model's class order (defaults to the distinct labels, numeric ones by value)
    #[arg(long, value_delimiter = ',')]
    classes: Option<Vec<String>>,

    /// Feature columns in the model's feature order (defaults to every non-target column)
    #[arg(long, value_delimiter = ',')]
    features: Option<Vec<String>>,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long, default_value = "dendro")]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Build the shadow tree of one tree and write its summary
    Inspect {
        #[command(flatten)]
        model: ModelArgs,

        /// Index of the tree within the forest
        #[arg(long, default_value_t = 0)]
        tree: usize,
    },

    /// Build a shadow tree for every tree of the forest and report their shapes
    Survey {
        #[command(flatten)]
        model: ModelArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct InspectOutput {
    experiment: String,
    family: String,
    tree_index: usize,
    n_samples: usize,
    n_nodes: usize,
    n_leaves: usize,
    max_depth: usize,
    root_prediction: String,
    summary_path: PathBuf,
}

#[derive(Serialize)]
struct SurveyOutput {
    experiment: String,
    family: String,
    n_trees: usize,
    n_samples: usize,
    survey_path: PathBuf,
    trees: Vec<SurveyEntry>,
}

/// Everything a command needs, loaded and validated once.
struct Loaded {
    forest: ForestExport,
    frame: TrainingFrame,
    classes: Vec<String>,
    writer: SummaryWriter,
    experiment: String,
}

fn load(args: ModelArgs) -> Result<Loaded> {
    let experiment = ExperimentName::new(args.experiment.clone())
        .context("invalid experiment name")?;

    let forest = ForestExport::load(&args.model)
        .with_context(|| format!("failed to load forest from {}", args.model.display()))?;
    info!(family = %forest.family(), n_trees = forest.n_trees(), "forest loaded");

    let mut reader = FrameReader::new(&args.data).with_target(args.target);
    if let Some(features) = args.features {
        reader = reader.with_features(features);
    }
    let frame = reader
        .read()
        .with_context(|| format!("failed to read training data from {}", args.data.display()))?;

    let classes = args.classes.unwrap_or_else(|| frame.distinct_labels());
    info!(n_classes = classes.len(), "class labels resolved");

    let writer = SummaryWriter::new(&args.output_dir, experiment)
        .context("failed to prepare output directory")?;

    Ok(Loaded {
        forest,
        frame,
        classes,
        writer,
        experiment: args.experiment,
    })
}

fn shadow_tree(loaded: &Loaded, tree_index: usize) -> Result<ShadowTree<'_, String>> {
    ShadowTreeConfig::new(tree_index)
        .with_feature_names(loaded.frame.feature_names().iter().cloned())
        .with_target_name(loaded.frame.target_name())
        .with_class_names(loaded.classes.iter().cloned())
        .build(&loaded.forest, loaded.frame.features(), loaded.frame.labels())
        .with_context(|| format!("failed to build shadow tree {tree_index}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Inspect { model, tree } => {
            let loaded = load(model)?;
            let shadow = shadow_tree(&loaded, tree)?;

            let summary = shadow.summary();
            let summary_path = loaded
                .writer
                .write_summary(&summary)
                .context("failed to write tree summary")?;

            let output = InspectOutput {
                experiment: loaded.experiment.clone(),
                family: summary.family.to_string(),
                tree_index: tree,
                n_samples: shadow.node_samples()[0].len(),
                n_nodes: summary.n_nodes,
                n_leaves: summary.n_leaves,
                max_depth: summary.max_depth,
                root_prediction: shadow.prediction(0)?.clone(),
                summary_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Survey { model } => {
            let loaded = load(model)?;
            let n_trees = loaded.forest.n_trees();

            let trees = (0..n_trees)
                .into_par_iter()
                .map(|tree_index| -> Result<SurveyEntry> {
                    let shadow = shadow_tree(&loaded, tree_index)?;
                    Ok(SurveyEntry {
                        tree_index,
                        n_nodes: shadow.n_nodes(),
                        n_leaves: shadow.leaves().len(),
                        depth: shadow.tree_depth(),
                        max_depth: shadow.max_depth(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            info!(n_trees, "survey complete");

            let survey_path = loaded
                .writer
                .write_survey(&trees)
                .context("failed to write survey")?;

            let output = SurveyOutput {
                experiment: loaded.experiment.clone(),
                family: loaded.forest.family().to_string(),
                n_trees,
                n_samples: loaded.frame.n_samples(),
                survey_path,
                trees,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
