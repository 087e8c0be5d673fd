//! Parallel root-to-leaf traversal.

use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut2, Axis};
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use sylva_graph::NodeIndex;
use tracing::{debug, instrument};

use crate::accumulator::Accumulator;
use crate::config::{PredictOptions, resolve_n_threads, resolve_tree_indices};
use crate::error::RfError;
use crate::model::ForestModel;
use crate::pool::WorkerPool;
use crate::split::SplitTest;

impl<L, S, A> ForestModel<L, S, A>
where
    L: Sync,
    S: SplitTest,
    S::Feature: Sync,
    A: Accumulator,
{
    /// For every instance, find the leaf it reaches in each requested tree.
    ///
    /// `ids` must have shape `(features.nrows(), num_trees)`. On success
    /// `ids[[i, k]]` holds the leaf instance `i` reaches in tree `k` for
    /// every requested tree, and `None` for the others.
    ///
    /// Returns the average number of split comparisons per instance, summed
    /// over the requested trees.
    ///
    /// # Errors
    ///
    /// | Variant                            | When                                        |
    /// |------------------------------------|---------------------------------------------|
    /// | [`RfError::ShapeMismatch`]         | `ids.nrows() != features.nrows()`           |
    /// | [`RfError::FeatureWidthMismatch`]  | `features.ncols() != num_features`          |
    /// | [`RfError::OutputWidthMismatch`]   | `ids.ncols() != num_trees`                  |
    /// | [`RfError::TreeIndexOutOfRange`]   | a requested tree index `>= num_trees`       |
    /// | [`RfError::MissingSplitTest`]      | a visited internal node has no split test   |
    /// | [`RfError::MalformedNode`]         | a visited node has exactly one child        |
    /// | [`RfError::ThreadPool`]            | the worker pool could not be started        |
    ///
    /// `ids` is only written when the whole call succeeds.
    #[instrument(skip_all, fields(n_instances = features.nrows(), n_trees = self.num_trees()))]
    pub fn leaf_ids(
        &self,
        features: ArrayView2<'_, S::Feature>,
        mut ids: ArrayViewMut2<'_, Option<NodeIndex>>,
        options: &PredictOptions,
    ) -> Result<f64, RfError> {
        const OPERATION: &str = "leaf_ids";

        if features.nrows() != ids.nrows() {
            return Err(RfError::ShapeMismatch {
                operation: OPERATION,
                features: features.nrows(),
                output: ids.nrows(),
            });
        }
        self.check_feature_width(OPERATION, features.ncols())?;
        if ids.ncols() != self.num_trees() {
            return Err(RfError::OutputWidthMismatch {
                operation: OPERATION,
                expected: self.num_trees(),
                got: ids.ncols(),
            });
        }
        let trees = resolve_tree_indices(&options.tree_indices, self.num_trees())?;

        let workers = WorkerPool::new(resolve_n_threads(options.n_threads), features.nrows())?;
        let mut buffer = Array2::from_elem(ids.raw_dim(), None);
        let average = self.fill_leaf_ids(&workers, features, buffer.view_mut(), &trees)?;
        ids.assign(&buffer);
        Ok(average)
    }

    pub(crate) fn check_feature_width(
        &self,
        operation: &'static str,
        got: usize,
    ) -> Result<(), RfError> {
        if got == self.num_features() {
            Ok(())
        } else {
            Err(RfError::FeatureWidthMismatch {
                operation,
                expected: self.num_features(),
                got,
            })
        }
    }

    /// Traverse `trees` for every row, one contiguous row chunk per worker.
    ///
    /// Shapes and tree indices must already be validated. Each chunk counts
    /// its own split comparisons; the counts are summed after the join.
    pub(crate) fn fill_leaf_ids(
        &self,
        workers: &WorkerPool,
        features: ArrayView2<'_, S::Feature>,
        mut ids: ArrayViewMut2<'_, Option<NodeIndex>>,
        trees: &[usize],
    ) -> Result<f64, RfError> {
        let n_instances = features.nrows();
        if n_instances == 0 {
            return Ok(0.0);
        }
        let chunk_len = workers.chunk_len(n_instances);

        let per_chunk: Vec<usize> = if workers.is_sequential() {
            vec![self.leaf_ids_impl(features, ids, trees)?]
        } else {
            workers.install(|| {
                features
                    .axis_chunks_iter(Axis(0), chunk_len)
                    .into_par_iter()
                    .zip(ids.axis_chunks_iter_mut(Axis(0), chunk_len))
                    .map(|(rows, out)| self.leaf_ids_impl(rows, out, trees))
                    .collect::<Result<Vec<usize>, RfError>>()
            })?
        };

        let split_comparisons: usize = per_chunk.iter().sum();
        let average = split_comparisons as f64 / n_instances as f64;
        debug!(
            n_threads = workers.n_threads(),
            n_chunks = per_chunk.len(),
            chunk_len,
            split_comparisons,
            average,
            "leaf ids computed"
        );
        Ok(average)
    }

    /// Compute the leaf ids of one chunk and return its split comparisons.
    fn leaf_ids_impl(
        &self,
        features: ArrayView2<'_, S::Feature>,
        mut ids: ArrayViewMut2<'_, Option<NodeIndex>>,
        trees: &[usize],
    ) -> Result<usize, RfError> {
        let mut split_comparisons = 0;
        for (row, mut out) in features.outer_iter().zip(ids.outer_iter_mut()) {
            for &tree in trees {
                let (leaf, depth) = self.descend(tree, row)?;
                out[tree] = Some(leaf);
                split_comparisons += depth;
            }
        }
        Ok(split_comparisons)
    }

    /// Walk tree `tree` from its root to a leaf.
    ///
    /// Returns the leaf and the number of split tests evaluated. Each node
    /// below a root has exactly one parent, so the walk cannot revisit a
    /// node and ends after at most `num_nodes` steps.
    fn descend(
        &self,
        tree: usize,
        row: ArrayView1<'_, S::Feature>,
    ) -> Result<(NodeIndex, usize), RfError> {
        let mut node = self
            .graph
            .get_root(tree)
            .ok_or(RfError::TreeIndexOutOfRange {
                index: tree,
                n_trees: self.num_trees(),
            })?;
        let mut comparisons = 0;
        loop {
            match self.graph.out_degree(node) {
                0 => return Ok((node, comparisons)),
                2 => {
                    let test = self
                        .split_tests
                        .get(node)
                        .ok_or(RfError::MissingSplitTest { node })?;
                    let branch = test.branch(row);
                    node = self
                        .graph
                        .get_child(node, branch.index())
                        .ok_or(RfError::MalformedNode {
                            node,
                            out_degree: 2,
                        })?;
                    comparisons += 1;
                }
                out_degree => return Err(RfError::MalformedNode { node, out_degree }),
            }
        }
    }
}
