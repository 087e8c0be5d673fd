//! Split tests attached to internal nodes.

use ndarray::ArrayView1;
use sylva_graph::Branch;

/// Decides which child of an internal node a feature row follows.
///
/// Implementations must be deterministic and free of side effects: the same
/// row always yields the same branch, and tests are evaluated concurrently
/// from many worker threads.
pub trait SplitTest: Send + Sync {
    /// Element type of the feature rows this test reads.
    type Feature;

    /// Return the branch `row` follows.
    fn branch(&self, row: ArrayView1<'_, Self::Feature>) -> Branch;
}

/// Threshold test: rows with `row[feature] <= threshold` go left.
///
/// Incomparable values (such as `NaN`) go right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LessEqualSplitTest<T> {
    feature: usize,
    threshold: T,
}

impl<T> LessEqualSplitTest<T> {
    /// Create a test on column `feature` with the given threshold.
    #[must_use]
    pub fn new(feature: usize, threshold: T) -> Self {
        Self { feature, threshold }
    }

    /// Return the tested feature column.
    #[must_use]
    pub fn feature(&self) -> usize {
        self.feature
    }

    /// Return the threshold.
    #[must_use]
    pub fn threshold(&self) -> &T {
        &self.threshold
    }
}

impl<T> SplitTest for LessEqualSplitTest<T>
where
    T: PartialOrd + Send + Sync,
{
    type Feature = T;

    /// # Panics
    ///
    /// Panics if `feature` is not a column of `row`. Callers validate row
    /// width against the problem spec, so this only fires for a test built
    /// with a feature index beyond `num_features`.
    fn branch(&self, row: ArrayView1<'_, T>) -> Branch {
        if row[self.feature] <= self.threshold {
            Branch::Left
        } else {
            Branch::Right
        }
    }
}
