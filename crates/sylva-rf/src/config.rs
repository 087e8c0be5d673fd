//! Per-query options for forest predictions.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::thread;

use crate::error::RfError;

/// Thread-count sentinel meaning "use the available hardware parallelism".
pub const AUTO_THREADS: i32 = -1;

/// Options shared by [`ForestModel::leaf_ids`](crate::ForestModel::leaf_ids),
/// [`ForestModel::predict_proba`](crate::ForestModel::predict_proba) and
/// [`ForestModel::predict`](crate::ForestModel::predict).
///
/// Construct via [`PredictOptions::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter      | Default                      |
/// |----------------|------------------------------|
/// | `n_threads`    | [`AUTO_THREADS`] (`-1`)      |
/// | `tree_indices` | empty (every tree is used)   |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictOptions {
    pub(crate) n_threads: i32,
    pub(crate) tree_indices: Vec<usize>,
}

impl PredictOptions {
    /// Create options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_threads: AUTO_THREADS,
            tree_indices: Vec::new(),
        }
    }

    /// Set the worker thread count.
    ///
    /// `-1` auto-detects; any other value below 1 runs on one thread.
    #[must_use]
    pub fn with_n_threads(mut self, n_threads: i32) -> Self {
        self.n_threads = n_threads;
        self
    }

    /// Restrict the query to the given trees.
    ///
    /// Order and duplicates do not matter. An empty set selects every tree.
    #[must_use]
    pub fn with_tree_indices(mut self, tree_indices: impl IntoIterator<Item = usize>) -> Self {
        self.tree_indices = tree_indices.into_iter().collect();
        self
    }

    /// Return the requested thread count, before resolution.
    #[must_use]
    pub fn n_threads(&self) -> i32 {
        self.n_threads
    }

    /// Return the requested tree indices, as supplied.
    #[must_use]
    pub fn tree_indices(&self) -> &[usize] {
        &self.tree_indices
    }
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a thread-count request to a concrete worker count (at least 1).
#[must_use]
pub fn resolve_n_threads(n_threads: i32) -> usize {
    let resolved = if n_threads == AUTO_THREADS {
        thread::available_parallelism().map_or(1, NonZeroUsize::get)
    } else {
        usize::try_from(n_threads).unwrap_or(0)
    };
    resolved.max(1)
}

/// Resolve requested tree indices to the ascending, de-duplicated active set.
///
/// Every index is checked before the empty request is expanded to all trees.
pub(crate) fn resolve_tree_indices(
    requested: &[usize],
    n_trees: usize,
) -> Result<Vec<usize>, RfError> {
    let unique: BTreeSet<usize> = requested.iter().copied().collect();
    if let Some(&index) = unique.iter().find(|&&index| index >= n_trees) {
        return Err(RfError::TreeIndexOutOfRange { index, n_trees });
    }
    if unique.is_empty() {
        return Ok((0..n_trees).collect());
    }
    Ok(unique.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = PredictOptions::default();
        assert_eq!(options.n_threads(), AUTO_THREADS);
        assert!(options.tree_indices().is_empty());
    }

    #[test]
    fn builder_sets_fields() {
        let options = PredictOptions::new()
            .with_n_threads(4)
            .with_tree_indices([2, 0]);
        assert_eq!(options.n_threads(), 4);
        assert_eq!(options.tree_indices(), &[2, 0]);
    }

    #[test]
    fn auto_threads_resolves_to_at_least_one() {
        assert!(resolve_n_threads(AUTO_THREADS) >= 1);
    }

    #[test]
    fn small_thread_counts_clamp_to_one() {
        assert_eq!(resolve_n_threads(0), 1);
        assert_eq!(resolve_n_threads(-5), 1);
        assert_eq!(resolve_n_threads(1), 1);
        assert_eq!(resolve_n_threads(6), 6);
    }

    #[test]
    fn empty_request_selects_all_trees() {
        assert_eq!(resolve_tree_indices(&[], 3).unwrap(), vec![0, 1, 2]);
        assert!(resolve_tree_indices(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn request_is_sorted_and_deduplicated() {
        assert_eq!(resolve_tree_indices(&[2, 0, 2], 3).unwrap(), vec![0, 2]);
    }

    #[test]
    fn out_of_range_index_rejected() {
        let err = resolve_tree_indices(&[1, 5], 3).unwrap_err();
        assert!(matches!(
            err,
            RfError::TreeIndexOutOfRange {
                index: 5,
                n_trees: 3
            }
        ));
    }
}
