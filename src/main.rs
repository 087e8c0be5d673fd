mod synthetic;

use std::time::Instant;

use anyhow::{Context, Result, bail, ensure};
use clap::{Parser, Subcommand};
use ndarray::{Array1, Array2, array};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;

use sylva_graph::{BinaryForest, NodeMap};
use sylva_rf::{ForestModel, LessEqualSplitTest, MajorityVote, PredictOptions, ProblemSpec};

use crate::synthetic::{ForestShape, random_features, random_forest};

#[derive(Parser)]
#[command(name = "sylva")]
#[command(about = "Parallel decision-forest inference and ensemble merging")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Predict a fixed set of points with the seven-node reference tree
    Demo {
        /// Worker threads (-1 = all cores)
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        threads: i32,
    },

    /// Time predictions on a seeded random forest across thread counts
    Bench {
        /// Number of trees
        #[arg(long, default_value_t = 100)]
        n_trees: usize,

        /// Maximum tree depth
        #[arg(long, default_value_t = 10)]
        depth: usize,

        /// Number of features
        #[arg(long, default_value_t = 16)]
        n_features: usize,

        /// Number of classes
        #[arg(long, default_value_t = 4)]
        n_classes: usize,

        /// Number of instances to predict
        #[arg(long, default_value_t = 10_000)]
        n_instances: usize,

        /// Thread counts to compare (-1 = all cores)
        #[arg(
            long,
            value_delimiter = ',',
            default_values_t = [1, 4],
            allow_negative_numbers = true
        )]
        threads: Vec<i32>,

        /// Merge a second forest of the same shape before predicting
        #[arg(long, default_value_t = false)]
        merge: bool,
    },
}

#[derive(Serialize)]
struct DemoOutput {
    n_nodes: usize,
    n_trees: usize,
    avg_split_comparisons: f64,
    instances: Vec<DemoInstance>,
}

#[derive(Serialize)]
struct DemoInstance {
    features: Vec<f64>,
    leaf: Option<usize>,
    probabilities: Vec<f64>,
    label: i32,
}

#[derive(Serialize)]
struct BenchOutput {
    seed: u64,
    n_trees: usize,
    n_nodes: usize,
    n_instances: usize,
    merged: bool,
    runs: Vec<BenchRun>,
    outputs_identical: bool,
}

#[derive(Serialize)]
struct BenchRun {
    threads: i32,
    resolved_threads: usize,
    avg_split_comparisons: f64,
    elapsed_ms: f64,
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

    match cli.command {
        Command::Demo { threads } => {
            let model = seven_node_tree().context("failed to assemble demo tree")?;
            model.validate().context("demo tree is malformed")?;
            let options = PredictOptions::new().with_n_threads(threads);

            let features = array![
                [0.2, 0.2],
                [0.4, 0.2],
                [0.2, 0.7],
                [0.4, 0.7],
                [0.7, 0.2],
                [0.8, 0.2],
                [0.7, 0.8],
                [0.8, 0.8],
            ];
            let n = features.nrows();

            let mut ids = Array2::from_elem((n, model.num_trees()), None);
            let avg_split_comparisons = model
                .leaf_ids(features.view(), ids.view_mut(), &options)
                .context("leaf id query failed")?;
            let mut probs = Array2::zeros((n, model.num_classes()));
            model
                .predict_proba(features.view(), probs.view_mut(), &options)
                .context("probability query failed")?;
            let mut labels = Array1::zeros(n);
            model
                .predict(features.view(), labels.view_mut(), &options)
                .context("label query failed")?;

            let instances = (0..n)
                .map(|i| DemoInstance {
                    features: features.row(i).to_vec(),
                    leaf: ids[[i, 0]].map(|leaf| leaf.index()),
                    probabilities: probs.row(i).to_vec(),
                    label: labels[i],
                })
                .collect();

            let output = DemoOutput {
                n_nodes: model.num_nodes(),
                n_trees: model.num_trees(),
                avg_split_comparisons,
                instances,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Bench {
            n_trees,
            depth,
            n_features,
            n_classes,
            n_instances,
            threads,
            merge,
        } => {
            ensure!(!threads.is_empty(), "--threads needs at least one value");
            let shape = ForestShape {
                n_trees,
                depth,
                n_features,
                n_classes,
            };
            let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);

            let mut model = random_forest(shape, &mut rng).context("failed to build forest")?;
            if merge {
                let other =
                    random_forest(shape, &mut rng).context("failed to build second forest")?;
                model.merge(&other).context("merge failed")?;
            }
            info!(
                n_trees = model.num_trees(),
                n_nodes = model.num_nodes(),
                "forest ready"
            );

            let features = random_features(n_instances, n_features, &mut rng);

            let mut runs = Vec::with_capacity(threads.len());
            let mut reference: Option<(Array2<f64>, Array1<usize>)> = None;
            let mut outputs_identical = true;
            for &n_threads in &threads {
                let options = PredictOptions::new().with_n_threads(n_threads);
                let start = Instant::now();
                let mut probs = Array2::zeros((n_instances, model.num_classes()));
                let avg_split_comparisons = model
                    .predict_proba(features.view(), probs.view_mut(), &options)
                    .with_context(|| format!("predict_proba failed with {n_threads} threads"))?;
                let mut labels = Array1::zeros(n_instances);
                model
                    .predict(features.view(), labels.view_mut(), &options)
                    .with_context(|| format!("predict failed with {n_threads} threads"))?;
                let elapsed_ms = start.elapsed().as_secs_f64() * 1e3;

                info!(n_threads, elapsed_ms, avg_split_comparisons, "run complete");
                runs.push(BenchRun {
                    threads: n_threads,
                    resolved_threads: sylva_rf::resolve_n_threads(n_threads),
                    avg_split_comparisons,
                    elapsed_ms,
                });

                match &reference {
                    Some((ref_probs, ref_labels)) => {
                        outputs_identical &= *ref_probs == probs && *ref_labels == labels;
                    }
                    None => reference = Some((probs, labels)),
                }
            }

            let output = BenchOutput {
                seed: cli.seed,
                n_trees: model.num_trees(),
                n_nodes: model.num_nodes(),
                n_instances,
                merged: merge,
                runs,
                outputs_identical,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            if !outputs_identical {
                bail!("predictions differ between thread counts");
            }
        }
    }

    Ok(())
}

/// Two-feature, four-class tree with labels `[0, 1, -7, 3]`.
fn seven_node_tree() -> Result<ForestModel<i32, LessEqualSplitTest<f64>, MajorityVote>> {
    let mut graph = BinaryForest::new();
    let nodes: Vec<_> = (0..7).map(|_| graph.add_node()).collect();
    for (parent, child) in [(0, 1), (0, 2), (1, 3), (1, 4), (2, 5), (2, 6)] {
        graph.add_arc(nodes[parent], nodes[child])?;
    }

    let mut split_tests = NodeMap::new();
    split_tests.insert(nodes[0], LessEqualSplitTest::new(0, 0.6))?;
    split_tests.insert(nodes[1], LessEqualSplitTest::new(1, 0.25))?;
    split_tests.insert(nodes[2], LessEqualSplitTest::new(1, 0.75))?;

    let mut leaf_responses = NodeMap::new();
    for (leaf, class) in [(3, 0), (4, 1), (5, 2), (6, 3)] {
        leaf_responses.insert(nodes[leaf], class)?;
    }

    let spec = ProblemSpec::new()
        .with_num_features(2)
        .with_distinct_classes(vec![0, 1, -7, 3]);
    Ok(ForestModel::new(graph, split_tests, leaf_responses, spec))
}
