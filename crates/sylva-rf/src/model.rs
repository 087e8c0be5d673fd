//! The forest model container: construction, accessors, merge, validation.

use std::fmt;

use sylva_graph::{BinaryForest, GraphError, NodeMap};
use tracing::{info, instrument};

use crate::accumulator::Accumulator;
use crate::error::RfError;
use crate::problem::ProblemSpec;

/// An ensemble of binary decision trees over one feature space and one
/// label set.
///
/// Internal nodes carry a split test of type `S`, leaves carry a response of
/// type `A::Input`, and the accumulator `A` combines the responses of the
/// reached leaves into class probabilities. Labels have type `L`.
///
/// Queries take `&self` and may run concurrently with each other; [`merge`]
/// takes `&mut self` and therefore never overlaps a query.
///
/// [`merge`]: ForestModel::merge
pub struct ForestModel<L, S, A: Accumulator> {
    pub(crate) graph: BinaryForest,
    pub(crate) split_tests: NodeMap<S>,
    pub(crate) leaf_responses: NodeMap<A::Input>,
    pub(crate) problem_spec: ProblemSpec<L>,
    pub(crate) accumulator: A,
}

impl<L, S, A> ForestModel<L, S, A>
where
    A: Accumulator + Default,
{
    /// Assemble a model from pre-built parts with a default accumulator.
    ///
    /// Nothing is validated here; structural faults surface as errors from
    /// the queries, or up front from [`ForestModel::validate`].
    #[must_use]
    pub fn new(
        graph: BinaryForest,
        split_tests: NodeMap<S>,
        leaf_responses: NodeMap<A::Input>,
        problem_spec: ProblemSpec<L>,
    ) -> Self {
        Self::from_parts(graph, split_tests, leaf_responses, problem_spec, A::default())
    }
}

impl<L, S, A> Default for ForestModel<L, S, A>
where
    A: Accumulator + Default,
{
    /// An empty model, only useful as a merge target.
    fn default() -> Self {
        Self::new(
            BinaryForest::new(),
            NodeMap::new(),
            NodeMap::new(),
            ProblemSpec::new(),
        )
    }
}

impl<L, S, A: Accumulator> ForestModel<L, S, A> {
    /// Assemble a model from pre-built parts and a configured accumulator.
    ///
    /// Like [`ForestModel::new`], but for accumulators without a sensible
    /// default.
    #[must_use]
    pub fn from_parts(
        graph: BinaryForest,
        split_tests: NodeMap<S>,
        leaf_responses: NodeMap<A::Input>,
        problem_spec: ProblemSpec<L>,
        accumulator: A,
    ) -> Self {
        Self {
            graph,
            split_tests,
            leaf_responses,
            problem_spec,
            accumulator,
        }
    }

    /// Replace the accumulator with a configured instance.
    #[must_use]
    pub fn with_accumulator(mut self, accumulator: A) -> Self {
        self.accumulator = accumulator;
        self
    }

    /// Return the number of nodes across all trees.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    /// Return the number of trees.
    #[must_use]
    pub fn num_trees(&self) -> usize {
        self.graph.num_roots()
    }

    /// Return the number of classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.problem_spec.num_classes()
    }

    /// Return the number of features every query row must have.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.problem_spec.num_features()
    }

    /// Borrow the problem spec.
    #[must_use]
    pub fn problem_spec(&self) -> &ProblemSpec<L> {
        &self.problem_spec
    }

    /// Borrow the tree structure.
    #[must_use]
    pub fn graph(&self) -> &BinaryForest {
        &self.graph
    }

    /// Borrow the split tests of the internal nodes.
    #[must_use]
    pub fn split_tests(&self) -> &NodeMap<S> {
        &self.split_tests
    }

    /// Borrow the responses of the leaves.
    #[must_use]
    pub fn leaf_responses(&self) -> &NodeMap<A::Input> {
        &self.leaf_responses
    }

    /// Borrow the accumulator.
    #[must_use]
    pub fn accumulator(&self) -> &A {
        &self.accumulator
    }

    /// Grow this forest by appending every tree of `other`.
    ///
    /// `other`'s node ids are shifted by this model's prior node count, its
    /// trees follow this model's trees in their original order, and its
    /// split tests and leaf responses move with their nodes. Afterwards both
    /// `num_nodes` and `num_trees` are the sums of the two operands.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                                         |
    /// |---------------------------------------|----------------------------------------------|
    /// | [`RfError::IncompatibleProblemSpec`]  | the problem specs differ                     |
    /// | [`RfError::Graph`]                    | this model already has an entry at a shifted id |
    ///
    /// On error the model is unchanged.
    #[instrument(skip_all, fields(n_nodes = self.num_nodes(), other_nodes = other.num_nodes()))]
    pub fn merge(&mut self, other: &Self) -> Result<(), RfError>
    where
        L: PartialEq,
        S: Clone,
        A::Input: Clone,
    {
        if self.problem_spec != other.problem_spec {
            return Err(RfError::IncompatibleProblemSpec);
        }

        let offset = self.num_nodes();
        check_free(&self.split_tests, &other.split_tests, offset)?;
        check_free(&self.leaf_responses, &other.leaf_responses, offset)?;

        self.graph.merge(&other.graph);
        for (node, test) in &other.split_tests {
            self.split_tests.insert(node.shifted(offset), test.clone())?;
        }
        for (node, response) in &other.leaf_responses {
            self.leaf_responses
                .insert(node.shifted(offset), response.clone())?;
        }

        info!(
            offset,
            n_nodes = self.num_nodes(),
            n_trees = self.num_trees(),
            "merged forest"
        );
        Ok(())
    }

    /// Check that the model is a well-formed forest.
    ///
    /// Every node must be a leaf (out-degree 0) holding exactly a response,
    /// or an internal node (out-degree 2) holding exactly a split test, and
    /// every map entry must belong to a node of the graph.
    ///
    /// # Errors
    ///
    /// | Variant                          | When                                          |
    /// |----------------------------------|-----------------------------------------------|
    /// | [`RfError::MalformedNode`]       | a node has exactly one child                  |
    /// | [`RfError::MissingSplitTest`]    | an internal node has no split test            |
    /// | [`RfError::MissingLeafResponse`] | a leaf has no response                        |
    /// | [`RfError::MisplacedEntry`]      | a leaf has a split test or vice versa         |
    /// | [`RfError::Graph`]               | a map entry names a node outside the graph    |
    pub fn validate(&self) -> Result<(), RfError> {
        for node in self.graph.nodes() {
            match self.graph.out_degree(node) {
                0 => {
                    if !self.leaf_responses.contains(node) {
                        return Err(RfError::MissingLeafResponse { node });
                    }
                    if self.split_tests.contains(node) {
                        return Err(RfError::MisplacedEntry {
                            node,
                            kind: "split test",
                        });
                    }
                }
                2 => {
                    if !self.split_tests.contains(node) {
                        return Err(RfError::MissingSplitTest { node });
                    }
                    if self.leaf_responses.contains(node) {
                        return Err(RfError::MisplacedEntry {
                            node,
                            kind: "leaf response",
                        });
                    }
                }
                out_degree => return Err(RfError::MalformedNode { node, out_degree }),
            }
        }

        let n_nodes = self.num_nodes();
        let stray = self
            .split_tests
            .iter()
            .map(|(node, _)| node)
            .chain(self.leaf_responses.iter().map(|(node, _)| node))
            .find(|node| node.index() >= n_nodes);
        if let Some(node) = stray {
            return Err(GraphError::NodeOutOfRange { node, n_nodes }.into());
        }
        Ok(())
    }
}

/// Fail if `target` already holds an entry at any of `incoming`'s ids
/// shifted by `offset`.
fn check_free<V>(
    target: &NodeMap<V>,
    incoming: &NodeMap<V>,
    offset: usize,
) -> Result<(), GraphError> {
    match incoming
        .iter()
        .map(|(node, _)| node.shifted(offset))
        .find(|&node| target.contains(node))
    {
        Some(node) => Err(GraphError::DuplicateEntry { node }),
        None => Ok(()),
    }
}

impl<L, S, A> Clone for ForestModel<L, S, A>
where
    L: Clone,
    S: Clone,
    A: Accumulator + Clone,
    A::Input: Clone,
{
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            split_tests: self.split_tests.clone(),
            leaf_responses: self.leaf_responses.clone(),
            problem_spec: self.problem_spec.clone(),
            accumulator: self.accumulator.clone(),
        }
    }
}

impl<L, S, A> fmt::Debug for ForestModel<L, S, A>
where
    L: fmt::Debug,
    A: Accumulator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForestModel")
            .field("num_nodes", &self.num_nodes())
            .field("num_trees", &self.num_trees())
            .field("split_tests", &self.split_tests.len())
            .field("leaf_responses", &self.leaf_responses.len())
            .field("problem_spec", &self.problem_spec)
            .finish()
    }
}
