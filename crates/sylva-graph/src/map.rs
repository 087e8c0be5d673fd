//! Node-keyed property maps.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::iter::Enumerate;
use std::slice;

use tracing::warn;

use crate::error::GraphError;
use crate::node::NodeIndex;

/// Backing store of a [`NodeMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// A vector indexed by node id. Best when most nodes carry a value.
    Dense,
    /// An ordered map keyed by node id. Best when few nodes carry a value.
    Sparse,
}

#[derive(Debug, Clone, PartialEq)]
enum Repr<V> {
    Dense(Vec<Option<V>>),
    Sparse(BTreeMap<NodeIndex, V>),
}

/// A map from [`NodeIndex`] to `V`.
///
/// Both backings expose the same API, and both iterate in ascending node
/// order. Each node holds at most one value: [`NodeMap::insert`] rejects a
/// second value, [`NodeMap::replace`] overwrites explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMap<V> {
    repr: Repr<V>,
    len: usize,
}

impl<V> NodeMap<V> {
    /// Create an empty sparse map.
    #[must_use]
    pub fn new() -> Self {
        Self::with_storage(Storage::Sparse)
    }

    /// Create an empty map with a vector backing.
    #[must_use]
    pub fn dense() -> Self {
        Self::with_storage(Storage::Dense)
    }

    /// Create an empty map with an ordered-map backing.
    #[must_use]
    pub fn sparse() -> Self {
        Self::with_storage(Storage::Sparse)
    }

    /// Create an empty map with the given backing.
    #[must_use]
    pub fn with_storage(storage: Storage) -> Self {
        let repr = match storage {
            Storage::Dense => Repr::Dense(Vec::new()),
            Storage::Sparse => Repr::Sparse(BTreeMap::new()),
        };
        Self { repr, len: 0 }
    }

    /// Return the backing kind.
    #[must_use]
    pub fn storage(&self) -> Storage {
        match self.repr {
            Repr::Dense(_) => Storage::Dense,
            Repr::Sparse(_) => Storage::Sparse,
        }
    }

    /// Store `value` for `node`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateEntry`] if `node` already has a value;
    /// the map is left unchanged.
    pub fn insert(&mut self, node: NodeIndex, value: V) -> Result<(), GraphError> {
        if self.contains(node) {
            return Err(GraphError::DuplicateEntry { node });
        }
        self.store(node, value);
        Ok(())
    }

    /// Store `value` for `node`, returning the value it replaced.
    pub fn replace(&mut self, node: NodeIndex, value: V) -> Option<V> {
        let previous = self.store(node, value);
        if previous.is_some() {
            warn!(node = node.index(), "overwriting existing node map entry");
        }
        previous
    }

    /// Return the value stored for `node`.
    #[must_use]
    pub fn get(&self, node: NodeIndex) -> Option<&V> {
        match &self.repr {
            Repr::Dense(values) => values.get(node.index()).and_then(Option::as_ref),
            Repr::Sparse(values) => values.get(&node),
        }
    }

    /// Return `true` if `node` has a value.
    #[must_use]
    pub fn contains(&self, node: NodeIndex) -> bool {
        self.get(node).is_some()
    }

    /// Return the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Return `true` if no value is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over `(node, value)` pairs in ascending node order.
    pub fn iter(&self) -> Iter<'_, V> {
        let inner = match &self.repr {
            Repr::Dense(values) => IterRepr::Dense(values.iter().enumerate()),
            Repr::Sparse(values) => IterRepr::Sparse(values.iter()),
        };
        Iter { inner }
    }

    fn store(&mut self, node: NodeIndex, value: V) -> Option<V> {
        let previous = match &mut self.repr {
            Repr::Dense(values) => {
                if node.index() >= values.len() {
                    values.resize_with(node.index() + 1, || None);
                }
                values[node.index()].replace(value)
            }
            Repr::Sparse(values) => values.insert(node, value),
        };
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }
}

impl<V> Default for NodeMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, V> IntoIterator for &'a NodeMap<V> {
    type Item = (NodeIndex, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a [`NodeMap`].
pub struct Iter<'a, V> {
    inner: IterRepr<'a, V>,
}

enum IterRepr<'a, V> {
    Dense(Enumerate<slice::Iter<'a, Option<V>>>),
    Sparse(btree_map::Iter<'a, NodeIndex, V>),
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (NodeIndex, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IterRepr::Dense(values) => values
                .find_map(|(index, value)| value.as_ref().map(|v| (NodeIndex::new(index), v))),
            IterRepr::Sparse(values) => values.next().map(|(node, value)| (*node, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(index: usize) -> NodeIndex {
        NodeIndex::new(index)
    }

    fn both() -> [NodeMap<&'static str>; 2] {
        [NodeMap::dense(), NodeMap::sparse()]
    }

    #[test]
    fn default_is_sparse() {
        assert_eq!(NodeMap::<u8>::default().storage(), Storage::Sparse);
        assert_eq!(NodeMap::<u8>::dense().storage(), Storage::Dense);
    }

    #[test]
    fn insert_and_get() {
        for mut map in both() {
            map.insert(n(4), "four").unwrap();
            map.insert(n(1), "one").unwrap();
            assert_eq!(map.get(n(4)), Some(&"four"));
            assert_eq!(map.get(n(1)), Some(&"one"));
            assert_eq!(map.get(n(2)), None);
            assert_eq!(map.get(n(100)), None);
            assert_eq!(map.len(), 2);
            assert!(!map.is_empty());
        }
    }

    #[test]
    fn duplicate_insert_rejected_and_value_kept() {
        for mut map in both() {
            map.insert(n(3), "first").unwrap();
            assert_eq!(
                map.insert(n(3), "second"),
                Err(GraphError::DuplicateEntry { node: n(3) })
            );
            assert_eq!(map.get(n(3)), Some(&"first"));
            assert_eq!(map.len(), 1);
        }
    }

    #[test]
    fn replace_overwrites() {
        for mut map in both() {
            assert_eq!(map.replace(n(2), "a"), None);
            assert_eq!(map.replace(n(2), "b"), Some("a"));
            assert_eq!(map.get(n(2)), Some(&"b"));
            assert_eq!(map.len(), 1);
        }
    }

    #[test]
    fn iteration_is_ascending_for_both_backings() {
        for mut map in both() {
            map.insert(n(5), "five").unwrap();
            map.insert(n(0), "zero").unwrap();
            map.insert(n(2), "two").unwrap();
            let entries: Vec<_> = map.iter().map(|(node, v)| (node.index(), *v)).collect();
            assert_eq!(entries, vec![(0, "zero"), (2, "two"), (5, "five")]);
        }
    }

    #[test]
    fn empty_map_iterates_nothing() {
        for map in both() {
            assert!(map.is_empty());
            assert_eq!(map.iter().count(), 0);
        }
    }
}
