//! Subdivided-icosahedron sphere mesh generation
//!
//! Starts from a regular icosahedron with every vertex projected onto the
//! unit sphere and refines it by splitting each face into four, reusing edge
//! midpoints between neighboring faces so the result stays watertight.

use std::collections::HashMap;

use crate::foundation::math::Vec3;

use super::Mesh;

/// Face table of the regular icosahedron, wound counter-clockwise seen from
/// outside so the computed normals point outward
const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Build a sphere mesh by iteratively subdividing a regular icosahedron
///
/// Each subdivision pass splits every face into four by inserting the
/// normalized midpoints of its edges; midpoints are shared between the two
/// faces of an edge, keeping the mesh watertight. After `subdivisions`
/// passes the unit sphere is scaled to `radius` and moved to `center`, with
/// normals recomputed beforehand.
///
/// The result has `20 * 4^n` faces and `10 * 4^n + 2` vertices, all at
/// distance `radius` from `center`.
pub fn icosphere(radius: f64, center: Vec3, subdivisions: u32) -> Mesh {
    let mut mesh = Mesh::new();

    // Regular icosahedron: three orthogonal golden-ratio rectangles.
    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let corners = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ];
    for (x, y, z) in corners {
        mesh.add_vertex(Vec3::new(x, y, z).normalize());
    }
    for [v0, v1, v2] in ICOSAHEDRON_FACES {
        mesh.add_triangle(v0, v1, v2)
            .expect("icosahedron face table indices are in range");
    }

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<u64, usize> = HashMap::new();
        let mut next = Mesh::new();
        for vertex in mesh.vertices() {
            next.add_vertex(vertex.location);
        }
        for face in mesh.faces() {
            let [v0, v1, v2] = face.vertices;
            let m01 = midpoint(&mut next, &mut midpoints, v0, v1);
            let m12 = midpoint(&mut next, &mut midpoints, v1, v2);
            let m20 = midpoint(&mut next, &mut midpoints, v2, v0);
            for [a, b, c] in [
                [v0, m01, m20],
                [v1, m12, m01],
                [v2, m20, m12],
                [m01, m12, m20],
            ] {
                next.add_triangle(a, b, c)
                    .expect("subdivided face indices are in range");
            }
        }
        mesh = next;
    }

    mesh.compute_normals();
    mesh.scale(radius);
    mesh.translate(center);

    log::debug!(
        "icosphere: {} subdivision passes, {} vertices, {} faces, radius {}",
        subdivisions,
        mesh.vertices().len(),
        mesh.faces().len(),
        radius
    );

    mesh
}

/// Normalized midpoint of the edge `(i, j)`, deduplicated per pass
///
/// Keyed on the unordered index pair so the two faces sharing an edge also
/// share its midpoint vertex.
fn midpoint(mesh: &mut Mesh, cache: &mut HashMap<u64, usize>, i: usize, j: usize) -> usize {
    let key = ((i.min(j) as u64) << 32) | i.max(j) as u64;
    if let Some(&index) = cache.get(&key) {
        return index;
    }
    let a = mesh.vertices()[i].location;
    let b = mesh.vertices()[j].location;
    let index = mesh.add_vertex(((a + b) * 0.5).normalize());
    cache.insert(key, index);
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    #[test]
    fn test_icosphere_vertex_and_face_counts() {
        for subdivisions in 0..3u32 {
            let mesh = icosphere(1.0, Vec3::zeros(), subdivisions);
            let n = 4usize.pow(subdivisions);
            assert_eq!(mesh.faces().len(), 20 * n);
            assert_eq!(mesh.vertices().len(), 10 * n + 2);
        }
    }

    #[test]
    fn test_icosphere_vertices_lie_on_the_sphere() {
        let center = Vec3::new(1.0, -2.0, 3.0);
        let mesh = icosphere(10.0, center, 2);
        for vertex in mesh.vertices() {
            assert_relative_eq!((vertex.location - center).norm(), 10.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_icosphere_normals_point_outward() {
        let mesh = icosphere(5.0, Vec3::zeros(), 1);
        for face in 0..mesh.faces().len() {
            let (a, b, c) = mesh.triangle_points(face);
            let centroid = (a + b + c) / 3.0;
            assert!(
                mesh.faces()[face].normal.dot(&centroid) > 0.0,
                "face {face} normal points inward"
            );
        }
    }

    #[test]
    fn test_icosphere_is_watertight() {
        // Every edge of a closed manifold mesh belongs to exactly two faces.
        let mesh = icosphere(1.0, Vec3::zeros(), 2);
        let mut edge_uses: HashMap<(usize, usize), usize> = HashMap::new();
        for face in mesh.faces() {
            let [v0, v1, v2] = face.vertices;
            for (i, j) in [(v0, v1), (v1, v2), (v2, v0)] {
                *edge_uses.entry((i.min(j), i.max(j))).or_insert(0) += 1;
            }
        }
        assert!(edge_uses.values().all(|&uses| uses == 2));
    }
}
