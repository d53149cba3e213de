//! Spatial acceleration structures
//!
//! Provides the K-d tree index used to prune segment-vs-mesh queries to the
//! faces registered in the leaf regions a segment actually crosses.

pub mod kdtree;

pub use kdtree::{KdNode, KdTree, SpatialError};
