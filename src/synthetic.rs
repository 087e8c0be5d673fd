//! Seeded random threshold forests for the `bench` command.

use anyhow::{Result, ensure};
use ndarray::Array2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use sylva_graph::{BinaryForest, NodeIndex, NodeMap};
use sylva_rf::{ForestModel, LessEqualSplitTest, MajorityVote, ProblemSpec};

/// Forest of `x[feature] <= threshold` trees voting for class indices.
pub type ThresholdForest = ForestModel<usize, LessEqualSplitTest<f64>, MajorityVote>;

/// Probability that a node above the depth limit becomes a leaf anyway.
const EARLY_LEAF_PROBABILITY: f64 = 0.1;

/// Size parameters of a synthetic forest.
#[derive(Debug, Clone, Copy)]
pub struct ForestShape {
    pub n_trees: usize,
    pub depth: usize,
    pub n_features: usize,
    pub n_classes: usize,
}

/// Build a random forest of the given shape.
///
/// Thresholds are uniform in `[0, 1)`, matching [`random_features`].
pub fn random_forest(shape: ForestShape, rng: &mut ChaCha8Rng) -> Result<ThresholdForest> {
    ensure!(shape.n_features > 0, "n_features must be at least 1");
    ensure!(shape.n_classes > 0, "n_classes must be at least 1");

    let mut builder = Builder {
        rng,
        shape,
        graph: BinaryForest::new(),
        split_tests: NodeMap::new(),
        leaf_responses: NodeMap::dense(),
    };
    for _ in 0..shape.n_trees {
        builder.grow(shape.depth)?;
    }

    let spec = ProblemSpec::new()
        .with_num_features(shape.n_features)
        .with_distinct_classes((0..shape.n_classes).collect());
    Ok(ThresholdForest::new(
        builder.graph,
        builder.split_tests,
        builder.leaf_responses,
        spec,
    ))
}

/// Uniform `[0, 1)` feature matrix.
pub fn random_features(n_instances: usize, n_features: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    Array2::from_shape_fn((n_instances, n_features), |_| rng.r#gen::<f64>())
}

struct Builder<'a> {
    rng: &'a mut ChaCha8Rng,
    shape: ForestShape,
    graph: BinaryForest,
    split_tests: NodeMap<LessEqualSplitTest<f64>>,
    leaf_responses: NodeMap<usize>,
}

impl Builder<'_> {
    fn grow(&mut self, depth: usize) -> Result<NodeIndex> {
        let node = self.graph.add_node();
        if depth == 0 || self.rng.r#gen::<f64>() < EARLY_LEAF_PROBABILITY {
            let class = self.rng.gen_range(0..self.shape.n_classes);
            self.leaf_responses.insert(node, class)?;
            return Ok(node);
        }

        let feature = self.rng.gen_range(0..self.shape.n_features);
        let threshold = self.rng.r#gen::<f64>();
        self.split_tests
            .insert(node, LessEqualSplitTest::new(feature, threshold))?;
        for _ in 0..2 {
            let child = self.grow(depth - 1)?;
            self.graph.add_arc(node, child)?;
        }
        Ok(node)
    }
}
