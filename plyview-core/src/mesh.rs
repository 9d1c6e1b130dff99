//! Mesh data structures and functionality

use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices and faces
///
/// A mesh without faces is a point cloud: every vertex is drawn on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    pub colors: Option<Vec<Color3>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
            colors: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            colors: None,
        }
    }

    /// Create a face-less mesh (a point cloud)
    pub fn from_points(vertices: Vec<Point3f>) -> Self {
        Self::from_vertices_and_faces(vertices, Vec::new())
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh has no vertices
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Check if the mesh carries a triangle index list
    pub fn has_faces(&self) -> bool {
        !self.faces.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Axis-aligned bounds of all vertex positions
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }

    /// Calculate face normals
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.faces
            .iter()
            .map(|face| {
                let v0 = self.vertices[face[0]];
                let v1 = self.vertices[face[1]];
                let v2 = self.vertices[face[2]];

                let edge1 = v1 - v0;
                let edge2 = v2 - v0;

                edge1.cross(&edge2).normalize()
            })
            .collect()
    }

    /// Recompute per-vertex normals as the area-weighted average of the
    /// normals of adjacent faces.
    ///
    /// Point clouds keep whatever normals they were loaded with. Vertices
    /// not referenced by any face get `+Z`.
    pub fn compute_vertex_normals(&mut self) {
        if self.faces.is_empty() {
            return;
        }

        let mut accum = vec![Vector3f::zeros(); self.vertices.len()];
        for face in &self.faces {
            let v0 = self.vertices[face[0]];
            let v1 = self.vertices[face[1]];
            let v2 = self.vertices[face[2]];
            // Unnormalized cross product weights by twice the triangle area
            let n = (v1 - v0).cross(&(v2 - v0));
            for &vi in face {
                accum[vi] += n;
            }
        }

        let normals = accum
            .into_iter()
            .map(|n| {
                let len = n.norm();
                if len > f32::EPSILON && len.is_finite() {
                    n / len
                } else {
                    Vector3f::z()
                }
            })
            .collect();
        self.normals = Some(normals);
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Set vertex colors
    pub fn set_colors(&mut self, colors: Vec<Color3>) {
        if colors.len() == self.vertices.len() {
            self.colors = Some(colors);
        }
    }

    /// Check the index and attribute invariants
    pub fn validate(&self) -> Result<()> {
        let count = self.vertices.len();
        if let Some((fi, face)) = self
            .faces
            .iter()
            .enumerate()
            .find(|(_, face)| face.iter().any(|&i| i >= count))
        {
            return Err(Error::InvalidData(format!(
                "Face {} references vertex {:?} but the mesh has {} vertices",
                fi, face, count
            )));
        }
        if self.normals.as_ref().is_some_and(|n| n.len() != count) {
            return Err(Error::InvalidData(
                "Normal count does not match vertex count".to_string(),
            ));
        }
        if self.colors.as_ref().is_some_and(|c| c.len() != count) {
            return Err(Error::InvalidData(
                "Color count does not match vertex count".to_string(),
            ));
        }
        Ok(())
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.normals = None;
        self.colors = None;
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
