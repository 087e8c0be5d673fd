//! Policies that combine per-tree leaf responses into class probabilities.

use ndarray::ArrayViewMut1;

use crate::error::RfError;

/// Turns the leaf responses one instance collected across the active trees
/// into a probability row.
///
/// `out` has exactly `num_classes` cells, and every one of them must be
/// written. An implementation only sees the responses of a single instance.
pub trait Accumulator: Send + Sync {
    /// Response type stored at each leaf.
    type Input: Send + Sync;

    /// Write the probability row for one instance.
    ///
    /// `responses` is ordered by ascending tree index.
    ///
    /// # Errors
    ///
    /// Returns an error if a response is inconsistent with `out.len()`.
    fn accumulate(
        &self,
        responses: &[&Self::Input],
        out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), RfError>;
}

/// Each leaf votes for one class index; the output is the vote share.
///
/// With no responses every class gets probability zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MajorityVote;

impl Accumulator for MajorityVote {
    type Input = usize;

    fn accumulate(
        &self,
        responses: &[&usize],
        mut out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), RfError> {
        let n_classes = out.len();
        if let Some(&&class) = responses.iter().find(|&&&class| class >= n_classes) {
            return Err(RfError::ResponseOutOfRange { class, n_classes });
        }
        out.fill(0.0);
        for &&class in responses {
            out[class] += 1.0;
        }
        if !responses.is_empty() {
            let n_votes = responses.len() as f64;
            out.mapv_inplace(|count| count / n_votes);
        }
        Ok(())
    }
}

/// Each leaf stores a class distribution; the output is their mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeanDistribution;

impl Accumulator for MeanDistribution {
    type Input = Vec<f64>;

    fn accumulate(
        &self,
        responses: &[&Vec<f64>],
        mut out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), RfError> {
        let n_classes = out.len();
        if let Some(bad) = responses.iter().find(|dist| dist.len() != n_classes) {
            return Err(RfError::ResponseWidthMismatch {
                expected: n_classes,
                got: bad.len(),
            });
        }
        out.fill(0.0);
        for dist in responses {
            for (cell, &p) in out.iter_mut().zip(dist.iter()) {
                *cell += p;
            }
        }
        if !responses.is_empty() {
            let n = responses.len() as f64;
            out.mapv_inplace(|sum| sum / n);
        }
        Ok(())
    }
}
