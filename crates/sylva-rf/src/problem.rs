//! Problem description shared by every tree of a forest.

/// Feature count, class count and the class-index → label mapping.
///
/// Construct via [`ProblemSpec::new`], then chain `with_*` methods. Two
/// forests can only be merged when their specs compare equal.
///
/// # Defaults
///
/// | Parameter          | Default |
/// |--------------------|---------|
/// | `num_features`     | 0       |
/// | `distinct_classes` | empty   |
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProblemSpec<L> {
    num_features: usize,
    num_classes: usize,
    distinct_classes: Vec<L>,
}

impl<L> ProblemSpec<L> {
    /// Create an empty spec with no features and no classes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            num_features: 0,
            num_classes: 0,
            distinct_classes: Vec::new(),
        }
    }

    /// Set the width of every feature row.
    #[must_use]
    pub fn with_num_features(mut self, num_features: usize) -> Self {
        self.num_features = num_features;
        self
    }

    /// Set the ordered class labels; `num_classes` becomes their count.
    #[must_use]
    pub fn with_distinct_classes(mut self, distinct_classes: Vec<L>) -> Self {
        self.num_classes = distinct_classes.len();
        self.distinct_classes = distinct_classes;
        self
    }

    /// Return the number of features.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Return the class labels in class-index order.
    #[must_use]
    pub fn distinct_classes(&self) -> &[L] {
        &self.distinct_classes
    }

    /// Return the label of class `index`.
    #[must_use]
    pub fn class_label(&self, index: usize) -> Option<&L> {
        self.distinct_classes.get(index)
    }
}

impl<L> Default for ProblemSpec<L> {
    fn default() -> Self {
        Self::new()
    }
}
