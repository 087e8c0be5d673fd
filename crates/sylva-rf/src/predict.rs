//! Class probabilities and labels.

use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis};
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use sylva_graph::NodeIndex;
use tracing::{debug, instrument};

use crate::accumulator::Accumulator;
use crate::config::{PredictOptions, resolve_n_threads, resolve_tree_indices};
use crate::error::RfError;
use crate::model::ForestModel;
use crate::pool::WorkerPool;
use crate::split::SplitTest;

/// Return the index of the largest value in `row`.
///
/// The first maximum wins on ties and `NaN` never wins. Returns `None` if
/// `row` is empty or holds only `NaN`.
#[must_use]
pub fn argmax(row: ArrayView1<'_, f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, &value) in row.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

impl<L, S, A> ForestModel<L, S, A>
where
    L: Sync,
    S: SplitTest,
    S::Feature: Sync,
    A: Accumulator,
{
    /// Write the class probabilities of every instance into `probs`.
    ///
    /// For each instance the responses of the reached leaves, ordered by
    /// ascending tree index, go to the accumulator in a single call.
    /// `probs` must have shape `(features.nrows(), num_classes)`.
    ///
    /// Returns the average number of split comparisons per instance, as
    /// [`ForestModel::leaf_ids`] does.
    ///
    /// # Errors
    ///
    /// Everything [`ForestModel::leaf_ids`] reports, with the output checks
    /// applied to `probs`:
    ///
    /// | Variant                           | When                                   |
    /// |-----------------------------------|----------------------------------------|
    /// | [`RfError::ShapeMismatch`]        | `probs.nrows() != features.nrows()`    |
    /// | [`RfError::OutputWidthMismatch`]  | `probs.ncols() != num_classes`         |
    /// | [`RfError::MissingLeafResponse`]  | a reached leaf has no response         |
    ///
    /// plus whatever the accumulator rejects. `probs` is only written when
    /// the whole call succeeds.
    #[instrument(skip_all, fields(n_instances = features.nrows(), n_trees = self.num_trees()))]
    pub fn predict_proba(
        &self,
        features: ArrayView2<'_, S::Feature>,
        mut probs: ArrayViewMut2<'_, f64>,
        options: &PredictOptions,
    ) -> Result<f64, RfError> {
        const OPERATION: &str = "predict_proba";

        if features.nrows() != probs.nrows() {
            return Err(RfError::ShapeMismatch {
                operation: OPERATION,
                features: features.nrows(),
                output: probs.nrows(),
            });
        }
        self.check_feature_width(OPERATION, features.ncols())?;
        if probs.ncols() != self.num_classes() {
            return Err(RfError::OutputWidthMismatch {
                operation: OPERATION,
                expected: self.num_classes(),
                got: probs.ncols(),
            });
        }
        let trees = resolve_tree_indices(&options.tree_indices, self.num_trees())?;

        let workers = WorkerPool::new(resolve_n_threads(options.n_threads), features.nrows())?;
        let mut ids = Array2::from_elem((features.nrows(), self.num_trees()), None);
        let average = self.fill_leaf_ids(&workers, features, ids.view_mut(), &trees)?;

        let mut buffer = Array2::zeros(probs.raw_dim());
        self.fill_probabilities(&workers, ids.view(), buffer.view_mut())?;
        probs.assign(&buffer);
        Ok(average)
    }

    /// Write the predicted label of every instance into `labels`.
    ///
    /// The label of an instance is `distinct_classes[argmax(row)]` for its
    /// probability row; see [`argmax`] for tie handling.
    ///
    /// # Errors
    ///
    /// Everything [`ForestModel::predict_proba`] reports, plus:
    ///
    /// | Variant                     | When                                              |
    /// |-----------------------------|---------------------------------------------------|
    /// | [`RfError::ShapeMismatch`]  | `labels.len() != features.nrows()`                |
    /// | [`RfError::NoClasses`]      | there is at least one instance but no class       |
    ///
    /// `labels` is only written when the whole call succeeds.
    #[instrument(skip_all, fields(n_instances = features.nrows(), n_trees = self.num_trees()))]
    pub fn predict(
        &self,
        features: ArrayView2<'_, S::Feature>,
        mut labels: ArrayViewMut1<'_, L>,
        options: &PredictOptions,
    ) -> Result<f64, RfError>
    where
        L: Clone,
    {
        const OPERATION: &str = "predict";

        if features.nrows() != labels.len() {
            return Err(RfError::ShapeMismatch {
                operation: OPERATION,
                features: features.nrows(),
                output: labels.len(),
            });
        }
        self.check_feature_width(OPERATION, features.ncols())?;
        if features.nrows() > 0 && self.num_classes() == 0 {
            return Err(RfError::NoClasses);
        }

        let mut probs = Array2::zeros((features.nrows(), self.num_classes()));
        let average = self.predict_proba(features, probs.view_mut(), options)?;

        let mut predicted = Vec::with_capacity(features.nrows());
        for row in probs.outer_iter() {
            let class = argmax(row).unwrap_or(0);
            let label = self
                .problem_spec
                .class_label(class)
                .ok_or(RfError::NoClasses)?;
            predicted.push(label.clone());
        }
        for (slot, label) in labels.iter_mut().zip(predicted) {
            *slot = label;
        }
        Ok(average)
    }

    /// Accumulate the responses of the leaves in `ids` into `probs`, one
    /// contiguous row chunk per worker.
    fn fill_probabilities(
        &self,
        workers: &WorkerPool,
        ids: ArrayView2<'_, Option<NodeIndex>>,
        mut probs: ArrayViewMut2<'_, f64>,
    ) -> Result<(), RfError> {
        let n_instances = ids.nrows();
        if n_instances == 0 {
            return Ok(());
        }
        let chunk_len = workers.chunk_len(n_instances);

        if workers.is_sequential() {
            self.probabilities_impl(ids, probs)?;
        } else {
            workers.install(|| {
                ids.axis_chunks_iter(Axis(0), chunk_len)
                    .into_par_iter()
                    .zip(probs.axis_chunks_iter_mut(Axis(0), chunk_len))
                    .try_for_each(|(ids, probs)| self.probabilities_impl(ids, probs))
            })?;
        }

        debug!(chunk_len, "probabilities accumulated");
        Ok(())
    }

    fn probabilities_impl(
        &self,
        ids: ArrayView2<'_, Option<NodeIndex>>,
        mut probs: ArrayViewMut2<'_, f64>,
    ) -> Result<(), RfError> {
        let mut responses = Vec::with_capacity(ids.ncols());
        for (row, out) in ids.outer_iter().zip(probs.outer_iter_mut()) {
            responses.clear();
            // Unrequested trees hold `None`; the rest are in tree order.
            for &leaf in row.iter().flatten() {
                let response = self
                    .leaf_responses
                    .get(leaf)
                    .ok_or(RfError::MissingLeafResponse { node: leaf })?;
                responses.push(response);
            }
            self.accumulator.accumulate(&responses, out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2, ArrayViewMut1, array};
    use sylva_graph::{BinaryForest, NodeIndex, NodeMap};

    use super::argmax;
    use crate::accumulator::{Accumulator, MajorityVote, MeanDistribution};
    use crate::config::PredictOptions;
    use crate::error::RfError;
    use crate::model::ForestModel;
    use crate::problem::ProblemSpec;
    use crate::split::LessEqualSplitTest;

    type Model = ForestModel<&'static str, LessEqualSplitTest<f64>, MajorityVote>;

    /// A forest of stumps on feature 0, one per `(threshold, left, right)`.
    fn stumps(votes: &[(f64, usize, usize)]) -> Model {
        let mut graph = BinaryForest::new();
        let mut tests = NodeMap::new();
        let mut responses = NodeMap::new();
        for &(threshold, left_class, right_class) in votes {
            let root = graph.add_node();
            let left = graph.add_node();
            let right = graph.add_node();
            graph.add_arc(root, left).unwrap();
            graph.add_arc(root, right).unwrap();
            tests
                .insert(root, LessEqualSplitTest::new(0, threshold))
                .unwrap();
            responses.insert(left, left_class).unwrap();
            responses.insert(right, right_class).unwrap();
        }
        let spec = ProblemSpec::new()
            .with_num_features(1)
            .with_distinct_classes(vec!["a", "b", "c"]);
        Model::new(graph, tests, responses, spec)
    }

    #[test]
    fn argmax_first_maximum_wins() {
        assert_eq!(argmax(array![0.2, 0.4, 0.4].view()), Some(1));
        assert_eq!(argmax(array![0.5, 0.5].view()), Some(0));
        assert_eq!(argmax(array![0.1, 0.7, 0.2].view()), Some(1));
    }

    #[test]
    fn argmax_ignores_nan() {
        assert_eq!(argmax(array![f64::NAN, 0.1, 0.3].view()), Some(2));
        assert_eq!(argmax(array![f64::NAN, f64::NAN].view()), None);
        assert_eq!(argmax(Array1::<f64>::zeros(0).view()), None);
    }

    #[test]
    fn predict_proba_is_vote_share() {
        let model = stumps(&[(0.5, 0, 1), (0.5, 0, 2), (0.8, 1, 2)]);
        let features = array![[0.1], [0.6], [0.9]];
        let mut probs = Array2::zeros((3, 3));

        let average = model
            .predict_proba(features.view(), probs.view_mut(), &PredictOptions::new())
            .unwrap();

        let third = 1.0 / 3.0;
        let expected = array![
            [2.0 * third, third, 0.0],
            [0.0, 2.0 * third, third],
            [0.0, third, 2.0 * third],
        ];
        for (got, want) in probs.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-12, "{probs:?}");
        }
        assert!((average - 3.0).abs() < 1e-12);
    }

    #[test]
    fn predict_picks_labels() {
        let model = stumps(&[(0.5, 0, 1), (0.5, 0, 2), (0.8, 1, 2)]);
        let features = array![[0.1], [0.6], [0.9]];
        let mut labels = Array1::from_elem(3, "");
        model
            .predict(features.view(), labels.view_mut(), &PredictOptions::new())
            .unwrap();
        assert_eq!(labels, array!["a", "b", "c"]);
    }

    #[test]
    fn predict_tie_goes_to_lower_class() {
        // Two trees voting "b" and "a" for every input: tie, first wins.
        let model = stumps(&[(10.0, 1, 1), (10.0, 0, 0)]);
        let mut labels = Array1::from_elem(1, "");
        model
            .predict(array![[0.0]].view(), labels.view_mut(), &PredictOptions::new())
            .unwrap();
        assert_eq!(labels, array!["a"]);
    }

    #[test]
    fn tree_subset_restricts_votes() {
        let model = stumps(&[(0.5, 0, 1), (0.5, 2, 2), (0.5, 1, 1)]);
        let features = array![[0.1]];
        let mut probs = Array2::zeros((1, 3));
        model
            .predict_proba(
                features.view(),
                probs.view_mut(),
                &PredictOptions::new().with_tree_indices([2, 0]),
            )
            .unwrap();
        assert_eq!(probs, array![[0.5, 0.5, 0.0]]);
    }

    #[test]
    fn out_of_range_tree_leaves_probs_untouched() {
        let model = stumps(&[(0.5, 0, 1)]);
        let mut probs = Array2::from_elem((1, 3), 7.0);
        let err = model
            .predict_proba(
                array![[0.1]].view(),
                probs.view_mut(),
                &PredictOptions::new().with_tree_indices([0, 1]),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::TreeIndexOutOfRange {
                index: 1,
                n_trees: 1
            }
        ));
        assert_eq!(probs, Array2::from_elem((1, 3), 7.0));
    }

    #[test]
    fn missing_leaf_response_leaves_probs_untouched() {
        let mut model = stumps(&[(0.5, 0, 1)]);
        model.leaf_responses = NodeMap::new();
        model.leaf_responses.insert(NodeIndex::new(1), 0).unwrap();
        let mut probs = Array2::from_elem((2, 3), 7.0);
        let err = model
            .predict_proba(
                array![[0.1], [0.9]].view(),
                probs.view_mut(),
                &PredictOptions::new(),
            )
            .unwrap_err();
        assert!(matches!(err, RfError::MissingLeafResponse { node } if node.index() == 2));
        assert_eq!(probs, Array2::from_elem((2, 3), 7.0));
    }

    #[test]
    fn probs_width_rejected() {
        let model = stumps(&[(0.5, 0, 1)]);
        let mut probs = Array2::zeros((1, 2));
        let err = model
            .predict_proba(array![[0.1]].view(), probs.view_mut(), &PredictOptions::new())
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::OutputWidthMismatch {
                operation: "predict_proba",
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn probs_rows_rejected_and_untouched() {
        let model = stumps(&[(0.5, 0, 1)]);
        let mut probs = Array2::from_elem((3, 3), 7.0);
        let err = model
            .predict_proba(
                array![[0.1], [0.9]].view(),
                probs.view_mut(),
                &PredictOptions::new(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::ShapeMismatch {
                operation: "predict_proba",
                features: 2,
                output: 3
            }
        ));
        assert_eq!(probs, Array2::from_elem((3, 3), 7.0));
    }

    #[test]
    fn labels_length_rejected() {
        let model = stumps(&[(0.5, 0, 1)]);
        let mut labels = Array1::from_elem(2, "");
        let err = model
            .predict(array![[0.1]].view(), labels.view_mut(), &PredictOptions::new())
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::ShapeMismatch {
                operation: "predict",
                features: 1,
                output: 2
            }
        ));
    }

    #[test]
    fn predict_without_classes_rejected() {
        let model = stumps(&[(0.5, 0, 1)]);
        let empty_spec = ForestModel::<&str, _, MajorityVote>::new(
            model.graph.clone(),
            model.split_tests.clone(),
            model.leaf_responses.clone(),
            ProblemSpec::new().with_num_features(1),
        );
        let mut labels = Array1::from_elem(1, "");
        let err = empty_spec
            .predict(array![[0.1]].view(), labels.view_mut(), &PredictOptions::new())
            .unwrap_err();
        assert!(matches!(err, RfError::NoClasses));
        assert_eq!(labels, array![""]);
    }

    #[test]
    fn empty_input_predicts_nothing() {
        let model = stumps(&[(0.5, 0, 1)]);
        let mut labels = Array1::from_elem(0, "");
        let average = model
            .predict(
                Array2::<f64>::zeros((0, 1)).view(),
                labels.view_mut(),
                &PredictOptions::new(),
            )
            .unwrap();
        assert_eq!(average, 0.0);
    }

    #[test]
    fn mean_distribution_averages_leaves() {
        let mut graph = BinaryForest::new();
        let mut tests = NodeMap::new();
        let mut responses = NodeMap::dense();
        let trees = [(0.5, [1.0, 0.0], [0.0, 1.0]), (0.2, [0.6, 0.4], [0.2, 0.8])];
        for (threshold, low, high) in trees {
            let root = graph.add_node();
            let left = graph.add_node();
            let right = graph.add_node();
            graph.add_arc(root, left).unwrap();
            graph.add_arc(root, right).unwrap();
            tests
                .insert(root, LessEqualSplitTest::new(0, threshold))
                .unwrap();
            responses.insert(left, low.to_vec()).unwrap();
            responses.insert(right, high.to_vec()).unwrap();
        }
        let spec = ProblemSpec::new()
            .with_num_features(1)
            .with_distinct_classes(vec![false, true]);
        let model = ForestModel::<bool, _, MeanDistribution>::new(graph, tests, responses, spec);

        let mut probs = Array2::zeros((1, 2));
        model
            .predict_proba(array![[0.3]].view(), probs.view_mut(), &PredictOptions::new())
            .unwrap();
        assert!((probs[[0, 0]] - 0.6).abs() < 1e-12);
        assert!((probs[[0, 1]] - 0.4).abs() < 1e-12);

        let mut labels = Array1::from_elem(1, true);
        model
            .predict(array![[0.3]].view(), labels.view_mut(), &PredictOptions::new())
            .unwrap();
        assert_eq!(labels, array![false]);
    }

    /// Vote share scaled per class and renormalised. Has no default.
    struct WeightedVote {
        weights: Vec<f64>,
    }

    impl Accumulator for WeightedVote {
        type Input = usize;

        fn accumulate(
            &self,
            responses: &[&usize],
            mut out: ArrayViewMut1<'_, f64>,
        ) -> Result<(), RfError> {
            MajorityVote.accumulate(responses, out.view_mut())?;
            for (cell, weight) in out.iter_mut().zip(&self.weights) {
                *cell *= weight;
            }
            let total = out.sum();
            if total > 0.0 {
                out.mapv_inplace(|p| p / total);
            }
            Ok(())
        }
    }

    #[test]
    fn configured_accumulator_from_parts() {
        let votes = stumps(&[(0.5, 0, 0), (0.5, 1, 1)]);
        let model = ForestModel::from_parts(
            votes.graph.clone(),
            votes.split_tests.clone(),
            votes.leaf_responses.clone(),
            votes.problem_spec.clone(),
            WeightedVote {
                weights: vec![1.0, 3.0, 1.0],
            },
        );

        let mut probs = Array2::zeros((1, 3));
        model
            .predict_proba(array![[0.1]].view(), probs.view_mut(), &PredictOptions::new())
            .unwrap();
        assert!((probs[[0, 0]] - 0.25).abs() < 1e-12);
        assert!((probs[[0, 1]] - 0.75).abs() < 1e-12);

        let mut labels = Array1::from_elem(1, "");
        model
            .predict(array![[0.1]].view(), labels.view_mut(), &PredictOptions::new())
            .unwrap();
        assert_eq!(labels, array!["b"]);
    }
}
