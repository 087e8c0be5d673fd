//! Multi-rooted binary forest storage.
//!
//! Provides an arena-backed [`BinaryForest`] whose nodes are addressed by
//! [`NodeIndex`], and a [`NodeMap`] that attaches per-node properties
//! (split tests, leaf responses) with either a dense or a sparse backing.

mod error;
mod forest;
mod map;
mod node;

pub use error::GraphError;
pub use forest::BinaryForest;
pub use map::{NodeMap, Storage};
pub use node::{Branch, NodeIndex};
