use crate::node::NodeIndex;

/// Errors from forest construction and node map updates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Returned when a node id does not belong to the forest.
    #[error("node {node} is out of range for a forest with {n_nodes} nodes")]
    NodeOutOfRange {
        /// The offending node.
        node: NodeIndex,
        /// Number of nodes in the forest.
        n_nodes: usize,
    },

    /// Returned when an arc would connect a node to itself.
    #[error("cannot add an arc from node {node} to itself")]
    SelfArc {
        /// The node on both ends of the arc.
        node: NodeIndex,
    },

    /// Returned when a parent already has both of its children.
    #[error("node {parent} already has two children")]
    TooManyChildren {
        /// The saturated parent node.
        parent: NodeIndex,
    },

    /// Returned when the child of a new arc is already attached elsewhere.
    #[error("node {child} already has parent {parent}")]
    AlreadyHasParent {
        /// The child node.
        child: NodeIndex,
        /// Its existing parent.
        parent: NodeIndex,
    },

    /// Returned when a node map already holds a value for the node.
    #[error("node {node} already has an entry")]
    DuplicateEntry {
        /// The node whose entry would be overwritten.
        node: NodeIndex,
    },
}
