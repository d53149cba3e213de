//! The intersection predicate library
//!
//! Closest-point, sphere, segment and box tests used by the collision
//! response layer and the spatial index builder.

use crate::foundation::math::{Aabb, Vec3};

use super::CollisionRecord;

/// Tolerance below which determinants and axis lengths count as degenerate
const EPSILON: f64 = 1e-12;

/// Closest point on a triangle to a query point
///
/// Seven-region barycentric walk: the three vertex regions are checked via
/// the signs of the edge dot products, the three edge regions via scalar
/// projections clamped to `[0, 1]`, and the remaining case is the interior
/// barycentric combination. A degenerate (zero-area) triangle resolves to
/// its nearest vertex.
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;

    // Vertex region outside a
    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    // Vertex region outside b
    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    // Edge region ab
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    // Vertex region outside c
    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    // Edge region ac
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    // Edge region bc
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    // Interior
    let denom = va + vb + vc;
    if denom.abs() < EPSILON {
        return nearest_vertex(p, a, b, c);
    }
    let v = vb / denom;
    let w = vc / denom;
    a + ab * v + ac * w
}

/// Test a sphere against a triangle
///
/// Returns the closest point on the triangle when it lies within the sphere.
pub fn sphere_vs_triangle(center: Vec3, radius: f64, a: Vec3, b: Vec3, c: Vec3) -> Option<Vec3> {
    let closest = closest_point_on_triangle(center, a, b, c);
    if (closest - center).norm_squared() <= radius * radius {
        Some(closest)
    } else {
        None
    }
}

/// Test a sphere against the plane through `point_on_plane` with unit `normal`
///
/// Cheap pre-filter run before [`sphere_vs_triangle`]: culling against the
/// face plane first skips most of the expensive closest-point tests.
pub fn sphere_vs_plane(center: Vec3, radius: f64, normal: Vec3, point_on_plane: Vec3) -> bool {
    (center.dot(&normal) - point_on_plane.dot(&normal)).abs() <= radius
}

/// Test the segment `p1 -> p2` against the triangle `(a, b, c)`
///
/// Signed-volume formulation over the scalar triple products. The face
/// normal is recomputed from the vertex positions, never read from a cache,
/// so the test stays correct when cached normals are stale. `t` is measured
/// from `p1` toward `p2` and accepted only within `[0, 1]`; the hit location
/// is `p1 - t * (p1 - p2)`. Parallel segments and degenerate triangles
/// report no intersection. Swapping the endpoints changes `t` but never the
/// hit/miss outcome.
pub fn segment_vs_triangle(
    p1: Vec3,
    p2: Vec3,
    a: Vec3,
    b: Vec3,
    c: Vec3,
) -> Option<CollisionRecord> {
    let ab = b - a;
    let ac = c - a;
    let qp = p1 - p2;

    // Unnormalized face normal from the current geometry
    let n = ab.cross(&ac);

    let d = qp.dot(&n);
    if d.abs() < EPSILON {
        // Segment parallel to the face plane, or zero-area triangle
        return None;
    }

    let ap = p1 - a;
    let t = ap.dot(&n) / d;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }

    // Barycentric coordinates from the signed areas
    let e = qp.cross(&ap);
    let v = ac.dot(&e) / d;
    if !(0.0..=1.0).contains(&v) {
        return None;
    }
    let w = -ab.dot(&e) / d;
    if w < 0.0 || v + w > 1.0 {
        return None;
    }

    Some(CollisionRecord {
        t,
        location: p1 - qp * t,
    })
}

/// Test the segment `p1 -> p1 + direction` against the plane `dot(n, x) = plane_d`
///
/// Solves `t = (plane_d - dot(n, p1)) / dot(n, direction)`; the crossing is
/// valid only for `t` in `[0, 1]`. A direction parallel to the plane yields
/// no crossing.
pub fn segment_vs_plane(
    p1: Vec3,
    direction: Vec3,
    plane_normal: Vec3,
    plane_d: f64,
) -> Option<CollisionRecord> {
    let denom = plane_normal.dot(&direction);
    if denom.abs() < EPSILON {
        return None;
    }
    let t = (plane_d - plane_normal.dot(&p1)) / denom;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    Some(CollisionRecord {
        t,
        location: p1 + direction * t,
    })
}

/// Test a triangle against an axis-aligned box with the Separating Axis Theorem
///
/// Thirteen candidate axes: the nine cross products of the triangle edges
/// with the box axes, the three box face axes, and the triangle normal.
/// Returns false as soon as any axis separates the projections, true only
/// when all thirteen overlap.
pub fn triangle_vs_aabb(a: Vec3, b: Vec3, c: Vec3, aabb: &Aabb) -> bool {
    let h = aabb.extents();

    // Work in the box's local frame
    let center = aabb.center();
    let v0 = a - center;
    let v1 = b - center;
    let v2 = c - center;

    let e0 = v1 - v0;
    let e1 = v2 - v1;
    let e2 = v0 - v2;

    // Projection interval of the triangle vs the box's projection radius;
    // a near-zero axis carries no separation information.
    let separated = |axis: Vec3| -> bool {
        if axis.norm_squared() < EPSILON {
            return false;
        }
        let p0 = v0.dot(&axis);
        let p1 = v1.dot(&axis);
        let p2 = v2.dot(&axis);
        let min = p0.min(p1).min(p2);
        let max = p0.max(p1).max(p2);
        let r = h.x * axis.x.abs() + h.y * axis.y.abs() + h.z * axis.z.abs();
        min > r || max < -r
    };

    // Nine edge cross products with the box axes
    let box_axes = [Vec3::x(), Vec3::y(), Vec3::z()];
    for edge in [e0, e1, e2] {
        for axis in box_axes {
            if separated(edge.cross(&axis)) {
                return false;
            }
        }
    }

    // The three box face axes
    for axis in box_axes {
        if separated(axis) {
            return false;
        }
    }

    // The triangle normal axis
    !separated(e0.cross(&e1))
}

/// Nearest triangle vertex to `p`, the degenerate-triangle fallback
fn nearest_vertex(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let da = (p - a).norm_squared();
    let db = (p - b).norm_squared();
    let dc = (p - c).norm_squared();
    if da <= db && da <= dc {
        a
    } else if db <= dc {
        b
    } else {
        c
    }
}
