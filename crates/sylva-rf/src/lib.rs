//! Random forest inference: leaf ids, class probabilities, labels.
//!
//! A [`ForestModel`] couples a [`BinaryForest`](sylva_graph::BinaryForest)
//! with per-node split tests and leaf responses. Queries traverse every
//! requested tree for every instance in parallel, hand the reached leaves'
//! responses to an [`Accumulator`], and turn the resulting probability rows
//! into labels through the model's [`ProblemSpec`]. Two models with the same
//! problem spec can be merged into one larger ensemble.

mod accumulator;
mod config;
mod error;
mod model;
mod pool;
mod predict;
mod problem;
mod split;
mod traverse;

pub use accumulator::{Accumulator, MajorityVote, MeanDistribution};
pub use config::{AUTO_THREADS, PredictOptions, resolve_n_threads};
pub use error::RfError;
pub use model::ForestModel;
pub use predict::argmax;
pub use problem::ProblemSpec;
pub use split::{LessEqualSplitTest, SplitTest};
