//! # Collision Engine
//!
//! Spatial collision-geometry engine for agent-based simulations.
//!
//! ## Features
//!
//! - **Face-Vertex Meshes**: indexed vertex/triangle storage with normals,
//!   affine transforms and a subdivided-icosahedron sphere generator
//! - **Geometry Predicates**: closest-point, sphere, segment and box
//!   intersection tests with explicit degenerate-case handling
//! - **Collision Response**: penetration repulsion and specular reflection
//!   off arbitrary meshes
//! - **K-d Tree Index**: accelerated segment-vs-mesh queries with stale
//!   snapshot detection
//!
//! ## Quick Start
//!
//! ```rust
//! use collision_engine::prelude::*;
//!
//! // A spherical boundary and an index over it
//! let boundary = icosphere(10.0, Vec3::zeros(), 2);
//! let tree = KdTree::from_mesh(&boundary)?;
//!
//! // Prune a segment query to the faces near its path
//! let candidates = tree.query_candidates(&boundary, Vec3::new(0.0, 0.0, -20.0), Vec3::zeros())?;
//! assert!(!candidates.is_empty());
//!
//! // Push a penetrating agent back toward the interior
//! let mut agent = SphereAgent::new(Vec3::new(0.0, 0.0, -9.4), 1.0);
//! repel(&mut agent, &boundary);
//! # Ok::<(), collision_engine::spatial::SpatialError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod geometry;
pub mod mesh;
pub mod response;
pub mod spatial;

#[cfg(test)]
mod tests;

/// Common imports for engine users
pub mod prelude {
    pub use crate::foundation::math::{Aabb, Vec3};
    pub use crate::geometry::{
        closest_point_on_triangle, segment_vs_plane, segment_vs_triangle, sphere_vs_plane,
        sphere_vs_triangle, triangle_vs_aabb, CollisionRecord,
    };
    pub use crate::mesh::{icosphere, Mesh, MeshError, Triangle, Vertex};
    pub use crate::response::{first_hit, reflect, repel, ReflectStrategy, SphereAgent};
    pub use crate::spatial::{KdTree, SpatialError};
}
