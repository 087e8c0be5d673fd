//! Arena-backed multi-rooted binary forest.

use crate::error::GraphError;
use crate::node::NodeIndex;

/// Parent and child links of one arena slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Links {
    parent: Option<NodeIndex>,
    children: [Option<NodeIndex>; 2],
}

impl Links {
    fn shifted(&self, offset: usize) -> Self {
        Self {
            parent: self.parent.map(|p| p.shifted(offset)),
            children: self.children.map(|c| c.map(|c| c.shifted(offset))),
        }
    }
}

/// A directed forest of binary trees sharing one node-id space.
///
/// Nodes live in a `Vec` arena and are referenced by [`NodeIndex`]. Every
/// node without a parent is a root; roots are kept in creation order, so the
/// k-th root identifies tree k.
///
/// Each node has at most one parent and at most two children. The first arc
/// added from a node becomes child 0, the second becomes child 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryForest {
    nodes: Vec<Links>,
    roots: Vec<NodeIndex>,
}

impl BinaryForest {
    /// Create an empty forest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new parentless node and return its index.
    pub fn add_node(&mut self) -> NodeIndex {
        let node = NodeIndex::new(self.nodes.len());
        self.nodes.push(Links::default());
        self.roots.push(node);
        node
    }

    /// Connect `parent` to `child`.
    ///
    /// The child takes the parent's first free child slot and stops being a
    /// root. The remaining roots keep their relative order.
    ///
    /// # Errors
    ///
    /// | Variant                          | When                                   |
    /// |----------------------------------|----------------------------------------|
    /// | [`GraphError::NodeOutOfRange`]   | either node is not in the forest       |
    /// | [`GraphError::SelfArc`]          | `parent == child`                      |
    /// | [`GraphError::AlreadyHasParent`] | `child` is already attached            |
    /// | [`GraphError::TooManyChildren`]  | `parent` already has two children      |
    pub fn add_arc(&mut self, parent: NodeIndex, child: NodeIndex) -> Result<(), GraphError> {
        self.check_node(parent)?;
        self.check_node(child)?;
        if parent == child {
            return Err(GraphError::SelfArc { node: parent });
        }
        if let Some(existing) = self.nodes[child.index()].parent {
            return Err(GraphError::AlreadyHasParent {
                child,
                parent: existing,
            });
        }
        let slot = self.nodes[parent.index()]
            .children
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(GraphError::TooManyChildren { parent })?;
        *slot = Some(child);
        self.nodes[child.index()].parent = Some(parent);
        if let Some(pos) = self.roots.iter().position(|&r| r == child) {
            self.roots.remove(pos);
        }
        Ok(())
    }

    /// Return the number of nodes.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of roots, i.e. the number of trees.
    #[must_use]
    pub fn num_roots(&self) -> usize {
        self.roots.len()
    }

    /// Return the root of tree `k`.
    #[must_use]
    pub fn get_root(&self, k: usize) -> Option<NodeIndex> {
        self.roots.get(k).copied()
    }

    /// Iterate over the roots in tree order.
    pub fn roots(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.roots.iter().copied()
    }

    /// Iterate over every node id in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex::new)
    }

    /// Return the number of children of `node` (0 for unknown nodes).
    #[must_use]
    pub fn out_degree(&self, node: NodeIndex) -> usize {
        self.nodes
            .get(node.index())
            .map_or(0, |links| links.children.iter().flatten().count())
    }

    /// Return child `branch` (0 or 1) of `node`.
    #[must_use]
    pub fn get_child(&self, node: NodeIndex, branch: usize) -> Option<NodeIndex> {
        self.nodes
            .get(node.index())
            .and_then(|links| links.children.get(branch).copied().flatten())
    }

    /// Return the parent of `node`, or `None` for roots and unknown nodes.
    #[must_use]
    pub fn get_parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.nodes.get(node.index()).and_then(|links| links.parent)
    }

    /// Append all nodes of `other`, shifting their ids by this forest's prior
    /// node count.
    ///
    /// The roots of `other` become this forest's subsequent roots in their
    /// original order.
    pub fn merge(&mut self, other: &BinaryForest) {
        let offset = self.nodes.len();
        self.nodes
            .extend(other.nodes.iter().map(|links| links.shifted(offset)));
        self.roots
            .extend(other.roots.iter().map(|root| root.shifted(offset)));
    }

    fn check_node(&self, node: NodeIndex) -> Result<(), GraphError> {
        if node.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::NodeOutOfRange {
                node,
                n_nodes: self.nodes.len(),
            })
        }
    }
}
