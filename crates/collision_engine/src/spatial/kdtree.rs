//! K-d tree spatial index over mesh vertices
//!
//! Built once from a mesh snapshot: the tree partitions space along the
//! median vertex of the cycling axis at each level, and leaf regions carry
//! buckets of candidate face indices. A segment query walks only the leaf
//! regions the segment passes through and returns the union of their
//! buckets; callers re-verify the candidates with the exact predicates,
//! since buckets over-approximate.
//!
//! The tree never observes later mesh mutation. Every query checks the mesh
//! generation recorded at build time and fails loudly on a stale snapshot.

use std::collections::HashSet;

use thiserror::Error;

use crate::foundation::math::{Aabb, Vec3};
use crate::geometry;
use crate::mesh::Mesh;

/// Errors produced by spatial index construction and queries
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialError {
    /// The queried mesh has been mutated since the tree was built
    #[error("spatial index is stale: built at mesh generation {tree}, mesh is now at {mesh}")]
    StaleIndex {
        /// Mesh generation the tree was built from
        tree: u64,
        /// Current mesh generation
        mesh: u64,
    },
    /// A tree cannot be built over a mesh with no vertices
    #[error("cannot build a spatial index over an empty mesh")]
    EmptyMesh,
}

/// A node of the K-d tree
///
/// The split vertex defines the partitioning plane on this node's axis. A
/// side without a child is a leaf region; its bucket holds the candidate
/// face indices for that region.
#[derive(Debug, Clone)]
pub struct KdNode {
    /// Index of the mesh vertex defining the splitting plane
    pub split_vertex: usize,
    /// Splitting axis, cycling x, y, z with tree depth
    pub axis: usize,
    /// Subtree on the low side of the plane
    pub left: Option<Box<KdNode>>,
    /// Subtree on the high side of the plane
    pub right: Option<Box<KdNode>>,
    /// Candidate faces for the low leaf region (used when `left` is absent)
    pub left_bucket: HashSet<usize>,
    /// Candidate faces for the high leaf region (used when `right` is absent)
    pub right_bucket: HashSet<usize>,
}

impl KdNode {
    /// Depth of the subtree rooted at this node
    pub fn depth(&self) -> usize {
        let left = self.left.as_ref().map_or(0, |node| node.depth());
        let right = self.right.as_ref().map_or(0, |node| node.depth());
        1 + left.max(right)
    }
}

/// K-d tree spatial index over a mesh's vertex set
///
/// Caches geometry derived from a mesh snapshot. All query methods take
/// shared references only, so a mesh/tree pair is safe to share across
/// reader threads once built.
#[derive(Debug, Clone)]
pub struct KdTree {
    root: KdNode,
    generation: u64,
}

impl KdTree {
    /// Build a tree over the mesh's current vertex set and assign faces to
    /// the leaf buckets
    ///
    /// Construction runs the median-split recursion over `(position,
    /// original index)` pairs, then two assignment passes: every face edge
    /// is walked through the tree into the leaf buckets it reaches, and a
    /// coverage sweep adds each face to every leaf region its triangle
    /// overlaps, so a bucket always contains every face that intersects its
    /// region.
    pub fn from_mesh(mesh: &Mesh) -> Result<Self, SpatialError> {
        let mut points: Vec<(Vec3, usize)> = mesh
            .vertices()
            .iter()
            .enumerate()
            .map(|(index, vertex)| (vertex.location, index))
            .collect();
        if points.is_empty() {
            return Err(SpatialError::EmptyMesh);
        }

        let mut root = build_node(&mut points, 0);

        for face in 0..mesh.faces().len() {
            let (a, b, c) = mesh.triangle_points(face);
            for (start, end) in [(a, b), (b, c), (c, a)] {
                assign_edge(&mut root, mesh, start, end, face);
            }
        }
        let all_faces: Vec<usize> = (0..mesh.faces().len()).collect();
        assign_coverage(&mut root, mesh, mesh_bounds(mesh), &all_faces);

        let tree = Self {
            root,
            generation: mesh.generation(),
        };
        log::debug!(
            "built k-d tree over {} vertices ({} faces), depth {}, mesh generation {}",
            mesh.vertices().len(),
            mesh.faces().len(),
            tree.root.depth(),
            tree.generation
        );
        Ok(tree)
    }

    /// Collect the candidate face set for the segment `p1 -> p2`
    ///
    /// The union of the leaf buckets the segment passes through. Candidates
    /// must be re-verified with the exact predicates: a bucket may contain
    /// faces the segment misses, never the other way around.
    pub fn query_candidates(
        &self,
        mesh: &Mesh,
        p1: Vec3,
        p2: Vec3,
    ) -> Result<HashSet<usize>, SpatialError> {
        if mesh.generation() != self.generation {
            return Err(SpatialError::StaleIndex {
                tree: self.generation,
                mesh: mesh.generation(),
            });
        }
        let mut candidates = HashSet::new();
        collect_segment(&self.root, mesh, p1, p2, &mut candidates);
        Ok(candidates)
    }

    /// Mesh generation this tree was built from
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The root node of the tree
    pub fn root(&self) -> &KdNode {
        &self.root
    }
}

/// Recursive median-split construction
///
/// The median by the cycling axis becomes the node's split vertex; both
/// partitions, excluding the median itself, become the children. An empty
/// partition yields no child, which makes that side a leaf region.
fn build_node(points: &mut [(Vec3, usize)], depth: usize) -> KdNode {
    let axis = depth % 3;
    let median = points.len() / 2;
    find_median(points, median, axis);
    let split_vertex = points[median].1;

    let (low, rest) = points.split_at_mut(median);
    let high = &mut rest[1..];

    KdNode {
        split_vertex,
        axis,
        left: (!low.is_empty()).then(|| Box::new(build_node(low, depth + 1))),
        right: (!high.is_empty()).then(|| Box::new(build_node(high, depth + 1))),
        left_bucket: HashSet::new(),
        right_bucket: HashSet::new(),
    }
}

/// Quickselect: place the element of the given rank on `axis` in its sorted
/// position, smaller elements before it and larger after
///
/// Recurses only into the half containing the target rank, expected linear
/// time per call.
fn find_median(points: &mut [(Vec3, usize)], rank: usize, axis: usize) {
    if points.len() <= 1 {
        return;
    }
    let pivot = partition(points, axis);
    match rank.cmp(&pivot) {
        std::cmp::Ordering::Equal => {}
        std::cmp::Ordering::Less => find_median(&mut points[..pivot], rank, axis),
        std::cmp::Ordering::Greater => {
            find_median(&mut points[pivot + 1..], rank - pivot - 1, axis);
        }
    }
}

/// Lomuto partition on `axis` with the last element as the pivot; returns
/// the pivot's final index
fn partition(points: &mut [(Vec3, usize)], axis: usize) -> usize {
    let last = points.len() - 1;
    let pivot_value = points[last].0[axis];
    let mut store = 0;
    for index in 0..last {
        if points[index].0[axis] < pivot_value {
            points.swap(index, store);
            store += 1;
        }
    }
    points.swap(store, last);
    store
}

/// Position of a node's splitting plane along its axis
fn split_value(node: &KdNode, mesh: &Mesh) -> f64 {
    mesh.vertices()[node.split_vertex].location[node.axis]
}

/// Walk an edge segment down the tree, inserting `face` into every leaf
/// bucket the edge reaches
fn assign_edge(node: &mut KdNode, mesh: &Mesh, p1: Vec3, p2: Vec3, face: usize) {
    let split = split_value(node, mesh);
    let a1 = p1[node.axis];
    let a2 = p2[node.axis];

    if a1 <= split && a2 <= split {
        match node.left.as_deref_mut() {
            Some(child) => assign_edge(child, mesh, p1, p2, face),
            None => {
                node.left_bucket.insert(face);
            }
        }
    } else if a1 > split && a2 > split {
        match node.right.as_deref_mut() {
            Some(child) => assign_edge(child, mesh, p1, p2, face),
            None => {
                node.right_bucket.insert(face);
            }
        }
    } else {
        let crossing = plane_crossing(p1, p2, node.axis, split);
        let (low, high) = if a1 <= split {
            ((p1, crossing), (crossing, p2))
        } else {
            ((crossing, p2), (p1, crossing))
        };
        match node.left.as_deref_mut() {
            Some(child) => assign_edge(child, mesh, low.0, low.1, face),
            None => {
                node.left_bucket.insert(face);
            }
        }
        match node.right.as_deref_mut() {
            Some(child) => assign_edge(child, mesh, high.0, high.1, face),
            None => {
                node.right_bucket.insert(face);
            }
        }
    }
}

/// Coverage sweep: insert every face into the buckets of all leaf regions
/// its triangle overlaps
///
/// The edge walk alone can miss a face whose interior spans a leaf region
/// none of its edges enters; sweeping with the triangle/box test restores
/// the bucket soundness invariant. Regions are clipped to the mesh bounds,
/// which contain every face by construction.
fn assign_coverage(node: &mut KdNode, mesh: &Mesh, bounds: Aabb, faces: &[usize]) {
    let split = split_value(node, mesh);

    let mut low_bounds = bounds;
    low_bounds.max[node.axis] = split;
    let mut high_bounds = bounds;
    high_bounds.min[node.axis] = split;

    let overlapping = |region: &Aabb| -> Vec<usize> {
        faces
            .iter()
            .copied()
            .filter(|&face| {
                let (a, b, c) = mesh.triangle_points(face);
                geometry::triangle_vs_aabb(a, b, c, region)
            })
            .collect()
    };

    let low_faces = overlapping(&low_bounds);
    match node.left.as_deref_mut() {
        Some(child) => assign_coverage(child, mesh, low_bounds, &low_faces),
        None => node.left_bucket.extend(low_faces),
    }

    let high_faces = overlapping(&high_bounds);
    match node.right.as_deref_mut() {
        Some(child) => assign_coverage(child, mesh, high_bounds, &high_faces),
        None => node.right_bucket.extend(high_faces),
    }
}

/// Segment traversal shared by queries
///
/// Both endpoints on one side of the splitting plane descend that side
/// only; a crossing segment is split at the exact crossing point and both
/// sub-segments descend. Childless sides contribute their buckets.
fn collect_segment(node: &KdNode, mesh: &Mesh, p1: Vec3, p2: Vec3, out: &mut HashSet<usize>) {
    let split = split_value(node, mesh);
    let a1 = p1[node.axis];
    let a2 = p2[node.axis];

    if a1 <= split && a2 <= split {
        match node.left.as_deref() {
            Some(child) => collect_segment(child, mesh, p1, p2, out),
            None => out.extend(node.left_bucket.iter().copied()),
        }
    } else if a1 > split && a2 > split {
        match node.right.as_deref() {
            Some(child) => collect_segment(child, mesh, p1, p2, out),
            None => out.extend(node.right_bucket.iter().copied()),
        }
    } else {
        let crossing = plane_crossing(p1, p2, node.axis, split);
        let (low, high) = if a1 <= split {
            ((p1, crossing), (crossing, p2))
        } else {
            ((crossing, p2), (p1, crossing))
        };
        match node.left.as_deref() {
            Some(child) => collect_segment(child, mesh, low.0, low.1, out),
            None => out.extend(node.left_bucket.iter().copied()),
        }
        match node.right.as_deref() {
            Some(child) => collect_segment(child, mesh, high.0, high.1, out),
            None => out.extend(node.right_bucket.iter().copied()),
        }
    }
}

/// Exact crossing point of a segment with an axis plane
///
/// Callers only ask for endpoints on opposite sides, so a crossing exists;
/// the midpoint fallback covers the floating-point edge case where the
/// plane solve rejects, and stays sound because both sides are descended
/// regardless.
fn plane_crossing(p1: Vec3, p2: Vec3, axis: usize, split: f64) -> Vec3 {
    let mut normal = Vec3::zeros();
    normal[axis] = 1.0;
    geometry::segment_vs_plane(p1, p2 - p1, normal, split)
        .map_or_else(|| (p1 + p2) * 0.5, |record| record.location)
}

/// Bounding box of all mesh vertices, slightly padded
fn mesh_bounds(mesh: &Mesh) -> Aabb {
    let mut min = Vec3::repeat(f64::INFINITY);
    let mut max = Vec3::repeat(f64::NEG_INFINITY);
    for vertex in mesh.vertices() {
        min = min.inf(&vertex.location);
        max = max.sup(&vertex.location);
    }
    let padding = Vec3::repeat(1e-9) + (max - min) * 1e-6;
    Aabb::new(min - padding, max + padding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::icosphere;
    use crate::response::{first_hit, ReflectStrategy};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn collect_split_vertices(node: &KdNode, out: &mut Vec<usize>) {
        out.push(node.split_vertex);
        if let Some(child) = node.left.as_deref() {
            collect_split_vertices(child, out);
        }
        if let Some(child) = node.right.as_deref() {
            collect_split_vertices(child, out);
        }
    }

    #[test]
    fn test_find_median_selects_the_rank() {
        let mut points: Vec<(Vec3, usize)> = [5.0, 1.0, 4.0, 2.0, 3.0]
            .iter()
            .enumerate()
            .map(|(index, &x)| (Vec3::new(x, 0.0, 0.0), index))
            .collect();
        find_median(&mut points, 2, 0);
        assert_eq!(points[2].0.x, 3.0);
        for low in &points[..2] {
            assert!(low.0.x < 3.0);
        }
        for high in &points[3..] {
            assert!(high.0.x > 3.0);
        }
    }

    #[test]
    fn test_tree_contains_every_vertex_once() {
        let mesh = icosphere(5.0, Vec3::zeros(), 1);
        let tree = KdTree::from_mesh(&mesh).unwrap();
        let mut split_vertices = Vec::new();
        collect_split_vertices(tree.root(), &mut split_vertices);
        split_vertices.sort_unstable();
        let expected: Vec<usize> = (0..mesh.vertices().len()).collect();
        assert_eq!(split_vertices, expected);
        assert_eq!(tree.root().axis, 0);
    }

    #[test]
    fn test_empty_mesh_cannot_be_indexed() {
        let mesh = Mesh::new();
        assert_eq!(KdTree::from_mesh(&mesh).unwrap_err(), SpatialError::EmptyMesh);
    }

    #[test]
    fn test_stale_queries_fail_loudly() {
        let mut mesh = icosphere(5.0, Vec3::zeros(), 0);
        let tree = KdTree::from_mesh(&mesh).unwrap();
        let built_at = tree.generation();

        mesh.translate(Vec3::new(1.0, 0.0, 0.0));
        let err = tree
            .query_candidates(&mesh, Vec3::zeros(), Vec3::new(0.0, 0.0, 10.0))
            .unwrap_err();
        assert_eq!(
            err,
            SpatialError::StaleIndex {
                tree: built_at,
                mesh: mesh.generation()
            }
        );
    }

    #[test]
    fn test_radial_query_finds_the_boundary_face() {
        let mesh = icosphere(10.0, Vec3::zeros(), 2);
        let tree = KdTree::from_mesh(&mesh).unwrap();

        let p1 = Vec3::new(0.0, 0.0, -20.0);
        let p2 = Vec3::zeros();
        let candidates = tree.query_candidates(&mesh, p1, p2).unwrap();
        assert!(!candidates.is_empty());
        assert!(candidates.len() < mesh.faces().len());

        let exact = first_hit(p1, p2, &mesh, ReflectStrategy::NearestHit).unwrap();
        assert!(candidates.contains(&exact.0));
    }

    #[test]
    fn test_candidate_sets_are_sound() {
        // Exact brute-force hits must all be recoverable from the candidate
        // buckets; candidates may over-approximate, never the reverse.
        let mesh = icosphere(5.0, Vec3::new(0.5, -0.25, 0.75), 2);
        let tree = KdTree::from_mesh(&mesh).unwrap();
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..10_000 {
            let endpoint = |rng: &mut StdRng| {
                Vec3::new(
                    rng.gen_range(-8.0..8.0),
                    rng.gen_range(-8.0..8.0),
                    rng.gen_range(-8.0..8.0),
                )
            };
            let p1 = endpoint(&mut rng);
            let p2 = endpoint(&mut rng);

            let candidates = tree.query_candidates(&mesh, p1, p2).unwrap();
            for face in 0..mesh.faces().len() {
                let (a, b, c) = mesh.triangle_points(face);
                if crate::geometry::segment_vs_triangle(p1, p2, a, b, c).is_some() {
                    assert!(
                        candidates.contains(&face),
                        "face {face} hit by the segment but missing from the candidates"
                    );
                }
            }
        }
    }

    #[test]
    fn test_candidate_sets_are_sound_on_a_random_soup() {
        let mut rng = StdRng::seed_from_u64(4242);
        let mut mesh = Mesh::new();
        for _ in 0..60 {
            mesh.add_vertex(Vec3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            ));
        }
        for _ in 0..80 {
            let v0 = rng.gen_range(0..60);
            let v1 = rng.gen_range(0..60);
            let v2 = rng.gen_range(0..60);
            mesh.add_triangle(v0, v1, v2).unwrap();
        }
        let tree = KdTree::from_mesh(&mesh).unwrap();

        for _ in 0..2_000 {
            let endpoint = |rng: &mut StdRng| {
                Vec3::new(
                    rng.gen_range(-12.0..12.0),
                    rng.gen_range(-12.0..12.0),
                    rng.gen_range(-12.0..12.0),
                )
            };
            let p1 = endpoint(&mut rng);
            let p2 = endpoint(&mut rng);

            let candidates = tree.query_candidates(&mesh, p1, p2).unwrap();
            for face in 0..mesh.faces().len() {
                let (a, b, c) = mesh.triangle_points(face);
                if crate::geometry::segment_vs_triangle(p1, p2, a, b, c).is_some() {
                    assert!(candidates.contains(&face));
                }
            }
        }
    }
}
