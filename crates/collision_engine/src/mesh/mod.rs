//! Face-vertex collision mesh representation
//!
//! A [`Mesh`] owns an ordered vertex list and an ordered face list; faces
//! reference vertices by index, never by pointer. Meshes are built once
//! through a sequence of insertions (optionally via the
//! [`icosphere`] generator) and then used read-mostly, mutated only by the
//! explicit transform calls.
//!
//! Every geometric mutation bumps the mesh's generation counter, which the
//! spatial index uses to detect stale snapshots.

use crate::foundation::math::Vec3;
use thiserror::Error;

pub mod icosphere;

pub use icosphere::icosphere;

/// Cross products shorter than this are treated as zero-area faces
const DEGENERATE_AREA_EPSILON: f64 = 1e-12;

/// Errors produced by mesh construction
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshError {
    /// A face referenced a vertex index outside the mesh's vertex list
    #[error("vertex index {index} out of range for mesh with {len} vertices")]
    VertexIndexOutOfRange {
        /// The offending vertex index
        index: usize,
        /// Number of vertices in the mesh
        len: usize,
    },
}

/// A mesh vertex: a position plus back-references to the faces that use it
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Position in 3D space
    pub location: Vec3,
    /// Indices of the faces that reference this vertex
    ///
    /// Populated by [`Mesh::calc_vertex_faces`]; purely informational and
    /// never used to infer ownership.
    pub face_refs: Vec<usize>,
}

impl Vertex {
    /// Create a vertex at the given location with no face references
    pub fn new(location: Vec3) -> Self {
        Self {
            location,
            face_refs: Vec::new(),
        }
    }
}

/// A mesh face: three vertex indices plus a cached face normal
///
/// The index order defines the winding, and the winding defines the normal
/// sign by the right-hand rule. Indices must stay valid for the owning mesh;
/// the mesh enforces this at insertion time.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Vertex indices into the owning mesh, in winding order
    pub vertices: [usize; 3],
    /// Cached unit face normal
    ///
    /// Computed when the face is added and by [`Mesh::compute_normals`];
    /// zero for degenerate faces.
    pub normal: Vec3,
}

impl Triangle {
    /// Create a face from three vertex indices
    ///
    /// The normal is computed when the face is added to a mesh.
    pub fn new(v0: usize, v1: usize, v2: usize) -> Self {
        Self {
            vertices: [v0, v1, v2],
            normal: Vec3::zeros(),
        }
    }
}

/// A face-vertex triangle mesh
///
/// Owns its vertices and faces. Transform calls rewrite vertex positions in
/// place; normals cached on the faces stay valid under translation and
/// uniform positive scaling, and are recomputed automatically when a
/// transform could change their direction.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    faces: Vec<Triangle>,
    generation: u64,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vertex, returning its index
    ///
    /// No deduplication is performed.
    pub fn add_vertex(&mut self, location: Vec3) -> usize {
        self.vertices.push(Vertex::new(location));
        self.generation += 1;
        self.vertices.len() - 1
    }

    /// Append a face referencing three existing vertices, returning its index
    ///
    /// The face normal is computed and cached immediately. Fails if any index
    /// is out of range for the current vertex list.
    pub fn add_triangle(&mut self, v0: usize, v1: usize, v2: usize) -> Result<usize, MeshError> {
        let len = self.vertices.len();
        for index in [v0, v1, v2] {
            if index >= len {
                return Err(MeshError::VertexIndexOutOfRange { index, len });
            }
        }
        let normal = self.face_normal([v0, v1, v2]);
        self.faces.push(Triangle {
            vertices: [v0, v1, v2],
            normal,
        });
        self.generation += 1;
        Ok(self.faces.len() - 1)
    }

    /// Append a face reusing an existing [`Triangle`] value
    ///
    /// Only the vertex indices are taken over; the normal is recomputed from
    /// the current vertex positions.
    pub fn add_face(&mut self, face: Triangle) -> Result<usize, MeshError> {
        let [v0, v1, v2] = face.vertices;
        self.add_triangle(v0, v1, v2)
    }

    /// Recompute the cached normal of one face from current vertex positions
    ///
    /// # Panics
    /// Panics if `face` is out of range.
    pub fn compute_normal(&mut self, face: usize) {
        let normal = self.face_normal(self.faces[face].vertices);
        self.faces[face].normal = normal;
    }

    /// Recompute all cached face normals from current vertex positions
    pub fn compute_normals(&mut self) {
        for face in 0..self.faces.len() {
            self.compute_normal(face);
        }
    }

    /// Scale every vertex position about the origin
    ///
    /// A negative factor is orientation-reversing, so normals are recomputed
    /// before returning; a positive factor preserves them.
    pub fn scale(&mut self, factor: f64) {
        for vertex in &mut self.vertices {
            vertex.location *= factor;
        }
        if factor < 0.0 {
            self.compute_normals();
        }
        self.generation += 1;
    }

    /// Scale every vertex position about an arbitrary pivot
    pub fn scale_about(&mut self, factor: f64, pivot: Vec3) {
        for vertex in &mut self.vertices {
            vertex.location = pivot + (vertex.location - pivot) * factor;
        }
        if factor < 0.0 {
            self.compute_normals();
        }
        self.generation += 1;
    }

    /// Translate every vertex position
    ///
    /// Translation never changes normal directions.
    pub fn translate(&mut self, delta: Vec3) {
        for vertex in &mut self.vertices {
            vertex.location += delta;
        }
        self.generation += 1;
    }

    /// Register every face index into its three vertices' `face_refs`
    ///
    /// Idempotent: a face already registered on a vertex is not added twice.
    pub fn calc_vertex_faces(&mut self) {
        for face in 0..self.faces.len() {
            for corner in self.faces[face].vertices {
                let refs = &mut self.vertices[corner].face_refs;
                if !refs.contains(&face) {
                    refs.push(face);
                }
            }
        }
    }

    /// Unweighted mean of all vertex positions
    ///
    /// Returns the origin for an empty mesh.
    pub fn averaged_center(&self) -> Vec3 {
        if self.vertices.is_empty() {
            return Vec3::zeros();
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vec3::zeros(), |acc, v| acc + v.location);
        sum / self.vertices.len() as f64
    }

    /// The vertices owned by this mesh
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// The faces owned by this mesh
    pub fn faces(&self) -> &[Triangle] {
        &self.faces
    }

    /// The three corner positions of a face
    ///
    /// # Panics
    /// Panics if `face` is out of range.
    pub fn triangle_points(&self, face: usize) -> (Vec3, Vec3, Vec3) {
        let corners = self.faces[face].vertices;
        (
            self.vertices[corners[0]].location,
            self.vertices[corners[1]].location,
            self.vertices[corners[2]].location,
        )
    }

    /// Generation counter, bumped by every geometric mutation
    ///
    /// Normal recomputation does not count: it derives from vertex positions
    /// and changes nothing a spatial snapshot depends on.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Unit normal of a corner triple, zero if degenerate
    fn face_normal(&self, corners: [usize; 3]) -> Vec3 {
        let a = self.vertices[corners[0]].location;
        let b = self.vertices[corners[1]].location;
        let c = self.vertices[corners[2]].location;
        let normal = (b - a).cross(&(c - a));
        let len = normal.norm();
        if len < DEGENERATE_AREA_EPSILON {
            Vec3::zeros()
        } else {
            normal / len
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_triangle_mesh() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vec3::zeros());
        mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Vec3::new(0.0, 1.0, 0.0));
        mesh.add_triangle(0, 1, 2).unwrap();
        mesh
    }

    #[test]
    fn test_add_triangle_checks_indices() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vec3::zeros());
        mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        let err = mesh.add_triangle(0, 1, 2).unwrap_err();
        assert_eq!(err, MeshError::VertexIndexOutOfRange { index: 2, len: 2 });
        assert!(mesh.faces().is_empty());
    }

    #[test]
    fn test_winding_defines_normal_sign() {
        let mesh = unit_triangle_mesh();
        assert_relative_eq!(mesh.faces()[0].normal, Vec3::new(0.0, 0.0, 1.0));

        let mut flipped = Mesh::new();
        flipped.add_vertex(Vec3::zeros());
        flipped.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        flipped.add_vertex(Vec3::new(0.0, 1.0, 0.0));
        flipped.add_triangle(0, 2, 1).unwrap();
        assert_relative_eq!(flipped.faces()[0].normal, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_degenerate_face_gets_zero_normal() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vec3::zeros());
        mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Vec3::new(2.0, 0.0, 0.0)); // collinear
        mesh.add_triangle(0, 1, 2).unwrap();
        assert_eq!(mesh.faces()[0].normal, Vec3::zeros());
    }

    #[test]
    fn test_transforms_move_vertices_and_bump_generation() {
        let mut mesh = unit_triangle_mesh();
        let before = mesh.generation();

        mesh.translate(Vec3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(mesh.vertices()[0].location, Vec3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(mesh.faces()[0].normal, Vec3::new(0.0, 0.0, 1.0));

        mesh.scale(2.0);
        assert_relative_eq!(mesh.vertices()[1].location, Vec3::new(2.0, 0.0, 10.0));

        mesh.scale_about(0.5, Vec3::new(0.0, 0.0, 10.0));
        assert_relative_eq!(mesh.vertices()[0].location, Vec3::new(0.0, 0.0, 10.0));

        assert_eq!(mesh.generation(), before + 3);
    }

    #[test]
    fn test_calc_vertex_faces_is_idempotent() {
        let mut mesh = unit_triangle_mesh();
        mesh.calc_vertex_faces();
        mesh.calc_vertex_faces();
        for vertex in mesh.vertices() {
            assert_eq!(vertex.face_refs, vec![0]);
        }
    }

    #[test]
    fn test_averaged_center() {
        let mut mesh = Mesh::new();
        assert_eq!(mesh.averaged_center(), Vec3::zeros());
        mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Vec3::new(3.0, 2.0, -4.0));
        assert_relative_eq!(mesh.averaged_center(), Vec3::new(2.0, 1.0, -2.0));
    }

    #[test]
    fn test_add_face_recomputes_normal() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vec3::zeros());
        mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Vec3::new(0.0, 1.0, 0.0));
        let face = Triangle::new(0, 1, 2);
        let index = mesh.add_face(face).unwrap();
        assert_relative_eq!(mesh.faces()[index].normal, Vec3::new(0.0, 0.0, 1.0));
    }
}
