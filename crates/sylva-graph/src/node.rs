use std::fmt;

/// Index into the node arena of a [`BinaryForest`](crate::BinaryForest).
///
/// Ids are dense and start at zero. They stay stable for the lifetime of a
/// forest, except that merging shifts the appended forest's ids by the
/// receiver's prior node count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a node index from a zero-based arena position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }

    /// Return this index moved up by `offset` arena slots.
    #[must_use]
    pub fn shifted(self, offset: usize) -> Self {
        Self(self.0 + offset)
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which child of an internal node to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    /// Child 0, the first arc added from the parent.
    Left,
    /// Child 1, the second arc added from the parent.
    Right,
}

impl Branch {
    /// Return the child slot this branch selects (0 or 1).
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Branch::Left => 0,
            Branch::Right => 1,
        }
    }
}
