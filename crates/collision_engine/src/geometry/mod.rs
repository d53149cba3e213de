//! Geometric intersection predicates and the collision record
//!
//! All predicates are pure functions over the current geometry; there is no
//! hidden state. Degenerate input (zero-area triangles, zero-length
//! segments, parallel configurations) reports a definite "no intersection"
//! instead of letting NaN propagate.

pub mod predicates;

pub use predicates::{
    closest_point_on_triangle, segment_vs_plane, segment_vs_triangle, sphere_vs_plane,
    sphere_vs_triangle, triangle_vs_aabb,
};

use crate::foundation::math::Vec3;

/// Result of a successful segment intersection test
///
/// Stack-local and short-lived: produced per query, consumed by collision
/// response, never retained. A missed test is expressed as `Option::None`
/// rather than a NaN sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionRecord {
    /// Hit parameter along the query segment, in `[0, 1]`
    pub t: f64,
    /// Hit location in world space
    pub location: Vec3,
}
