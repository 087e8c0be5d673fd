use sylva_graph::{GraphError, NodeIndex};

/// Errors from forest queries and merges.
///
/// Every variant is returned before any caller-visible output is written.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when the feature matrix and an output disagree on the
    /// number of instances.
    #[error("{operation}: features have {features} instances but the output has {output}")]
    ShapeMismatch {
        /// The query that was called.
        operation: &'static str,
        /// Number of feature rows.
        features: usize,
        /// Number of output rows.
        output: usize,
    },

    /// Returned when the feature matrix width differs from the model's.
    #[error("{operation}: features have {got} columns, expected {expected}")]
    FeatureWidthMismatch {
        /// The query that was called.
        operation: &'static str,
        /// The model's number of features.
        expected: usize,
        /// The number of feature columns provided.
        got: usize,
    },

    /// Returned when a probability or leaf-id output has the wrong width.
    #[error("{operation}: output has {got} columns, expected {expected}")]
    OutputWidthMismatch {
        /// The query that was called.
        operation: &'static str,
        /// `num_classes` for probabilities, `num_trees` for leaf ids.
        expected: usize,
        /// The number of output columns provided.
        got: usize,
    },

    /// Returned when a requested tree index does not exist.
    #[error("tree index {index} is out of range for a forest with {n_trees} trees")]
    TreeIndexOutOfRange {
        /// The offending tree index.
        index: usize,
        /// Number of trees in the model.
        n_trees: usize,
    },

    /// Returned when merging models built for different problems.
    #[error("cannot merge forests with different problem specs")]
    IncompatibleProblemSpec,

    /// Returned when an internal node has no split test.
    #[error("internal node {node} has no split test")]
    MissingSplitTest {
        /// The internal node.
        node: NodeIndex,
    },

    /// Returned when a leaf has no response.
    #[error("leaf {node} has no response")]
    MissingLeafResponse {
        /// The leaf node.
        node: NodeIndex,
    },

    /// Returned when a node is neither a leaf nor a full binary split.
    #[error("node {node} has out-degree {out_degree}, expected 0 or 2")]
    MalformedNode {
        /// The malformed node.
        node: NodeIndex,
        /// Its number of children.
        out_degree: usize,
    },

    /// Returned when a node map entry is attached to the wrong node kind.
    #[error("node {node} carries a {kind} but is not a matching node")]
    MisplacedEntry {
        /// The node holding the entry.
        node: NodeIndex,
        /// `"split test"` or `"leaf response"`.
        kind: &'static str,
    },

    /// Returned when a class-index response exceeds the class count.
    #[error("leaf response names class {class}, but there are only {n_classes} classes")]
    ResponseOutOfRange {
        /// The class index found in the response.
        class: usize,
        /// Number of classes.
        n_classes: usize,
    },

    /// Returned when a distribution response has the wrong width.
    #[error("leaf response has {got} entries, expected {expected}")]
    ResponseWidthMismatch {
        /// Number of classes.
        expected: usize,
        /// Length of the response.
        got: usize,
    },

    /// Returned when labels are requested from a model without classes.
    #[error("cannot predict labels: the problem spec has no classes")]
    NoClasses,

    /// Wraps a forest or node map error.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Wraps a failure to start the worker pool.
    #[error("failed to build thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
