//! Collision response: penetration repulsion and specular reflection
//!
//! Both algorithms are stateless queries over the current mesh and the
//! moving point or sphere handed in by the simulation loop. Finding no
//! intersection is a valid, common outcome and leaves the inputs untouched.

use crate::foundation::math::Vec3;
use crate::geometry::{self, CollisionRecord};
use crate::mesh::Mesh;

/// Maximum number of bounces followed by a recursive [`reflect`]
///
/// Recursive reflection would otherwise only terminate through the
/// shrinking `(1 - t)` travel budget; the explicit cap makes termination
/// unconditional.
pub const MAX_REFLECT_DEPTH: usize = 8;

/// Minimum hit parameter accepted when continuing a recursive reflection
///
/// A continuation starts on the surface it just bounced off; without a
/// minimum advance, a face sharing that vertex or edge reports the same
/// contact again at `t = 0` and the bounce loop spins in place.
const MIN_RECURSIVE_ADVANCE: f64 = 1e-12;

/// A moving spherical agent as seen by the collision layer
///
/// The simulation loop owns its agents; this is the boundary shape it hands
/// in. [`repel`] accumulates into `force` and never touches `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereAgent {
    /// Center position in world space
    pub position: Vec3,
    /// Sphere radius
    pub radius: f64,
    /// Accumulated force for the current step
    pub force: Vec3,
}

impl SphereAgent {
    /// Create an agent at a position with the given radius and zero force
    pub fn new(position: Vec3, radius: f64) -> Self {
        Self {
            position,
            radius,
            force: Vec3::zeros(),
        }
    }
}

/// Which of several intersected faces a reflection query reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReflectStrategy {
    /// First face in storage order whose test succeeds
    ///
    /// Cheapest to evaluate, but not necessarily the physically first
    /// impact along the segment.
    #[default]
    StorageOrder,
    /// Face with the smallest hit parameter along the segment
    NearestHit,
}

/// Push a penetrating sphere agent away from a mesh surface
///
/// Every face is culled with the cheap plane test before the exact
/// closest-point test runs. On penetration the force accumulator receives a
/// log-barrier push `-ln(d / r)` along the face normal, oriented toward the
/// side of the plane the agent center is on: the push grows without bound
/// as the center approaches the plane and fades to zero at grazing contact
/// (`d == r`). The agent's position is never mutated.
pub fn repel(agent: &mut SphereAgent, mesh: &Mesh) {
    for face in 0..mesh.faces().len() {
        let normal = mesh.faces()[face].normal;
        if normal == Vec3::zeros() {
            continue; // degenerate face
        }
        let (a, b, c) = mesh.triangle_points(face);
        if !geometry::sphere_vs_plane(agent.position, agent.radius, normal, a) {
            continue;
        }
        if geometry::sphere_vs_triangle(agent.position, agent.radius, a, b, c).is_none() {
            continue;
        }

        let signed_distance = normal.dot(&(agent.position - a));
        let distance = signed_distance.abs();
        if distance < f64::EPSILON {
            continue; // center on the plane: no defined side to push toward
        }
        let magnitude = -(distance / agent.radius).ln();
        let direction = if signed_distance >= 0.0 { normal } else { -normal };
        agent.force += direction * magnitude;

        log::trace!(
            "repelling from face {face}: plane distance {distance:.4}, push {magnitude:.4}"
        );
    }
}

/// Find the face hit by the segment `p1 -> p2`, if any
///
/// Brute-force loop over all faces; the strategy decides which of several
/// hits is reported. This is the exact query the spatial index candidates
/// must be re-verified with.
pub fn first_hit(
    p1: Vec3,
    p2: Vec3,
    mesh: &Mesh,
    strategy: ReflectStrategy,
) -> Option<(usize, CollisionRecord)> {
    search_hit(p1, p2, mesh, strategy, None, 0.0)
}

/// Specularly reflect the travel `p1 -> p2` off the mesh, relocating `p2`
///
/// When the segment crosses a face, the direction of travel is mirrored
/// about the face normal (`d' = d - 2 (d . n) n`) and `p2` moves to where
/// the remaining `(1 - t)` fraction of the travel distance ends up. With
/// `recursive` set the test repeats from each hit point, handling reflected
/// paths that immediately exit through a neighboring face at a grazing
/// angle; the bounce count is capped by [`MAX_REFLECT_DEPTH`] and each
/// bounce skips the face it just left. No crossing leaves `p2` untouched.
pub fn reflect(
    p1: Vec3,
    p2: &mut Vec3,
    mesh: &Mesh,
    recursive: bool,
    strategy: ReflectStrategy,
) {
    let mut start = p1;
    let mut last_face = None;

    for bounce in 0..MAX_REFLECT_DEPTH {
        let min_t = if last_face.is_none() { 0.0 } else { MIN_RECURSIVE_ADVANCE };
        let Some((face, record)) = search_hit(start, *p2, mesh, strategy, last_face, min_t) else {
            return;
        };

        let travel = *p2 - start;
        let distance = travel.norm();
        if distance < f64::EPSILON {
            return;
        }
        let direction = travel / distance;

        // Face normal from the current vertex positions, not the cache
        let (a, b, c) = mesh.triangle_points(face);
        let normal = (b - a).cross(&(c - a)).normalize();

        let reflected = direction - normal * (2.0 * direction.dot(&normal));
        let remaining = distance * (1.0 - record.t);
        *p2 = record.location + reflected * remaining;

        log::trace!(
            "reflection bounce {bounce}: face {face} at t = {:.4}, {remaining:.4} travel left",
            record.t
        );

        if !recursive {
            return;
        }
        start = record.location;
        last_face = Some(face);
    }
    log::debug!("reflection stopped after {MAX_REFLECT_DEPTH} bounces");
}

/// Shared hit search for [`first_hit`] and [`reflect`]
///
/// `skip` excludes one face index and `min_t` discards hits that have not
/// advanced past the current contact, so a recursive reflection cannot
/// re-hit the surface it is standing on.
fn search_hit(
    p1: Vec3,
    p2: Vec3,
    mesh: &Mesh,
    strategy: ReflectStrategy,
    skip: Option<usize>,
    min_t: f64,
) -> Option<(usize, CollisionRecord)> {
    let mut best: Option<(usize, CollisionRecord)> = None;
    for face in 0..mesh.faces().len() {
        if Some(face) == skip {
            continue;
        }
        let (a, b, c) = mesh.triangle_points(face);
        if let Some(record) = geometry::segment_vs_triangle(p1, p2, a, b, c) {
            if record.t < min_t {
                continue;
            }
            match strategy {
                ReflectStrategy::StorageOrder => return Some((face, record)),
                ReflectStrategy::NearestHit => {
                    if best.map_or(true, |(_, b)| record.t < b.t) {
                        best = Some((face, record));
                    }
                }
            }
        }
    }
    best
}
