//! Quadric error metric helpers shared by the simplifiers

use nalgebra::{Matrix4, Vector4};
use plyview_core::{Point3f, TriangleMesh};

/// Plane `(a, b, c, d)` with `ax + by + cz + d = 0` through a triangle.
/// Degenerate triangles yield the z = 0 plane.
pub(crate) fn compute_plane(v0: &Point3f, v1: &Point3f, v2: &Point3f) -> Vector4<f64> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let n = e1.cross(&e2).normalize();
    if !n.iter().all(|x| x.is_finite()) {
        return Vector4::new(0.0, 0.0, 1.0, 0.0);
    }
    let d = -n.dot(&v0.coords);
    Vector4::new(n.x as f64, n.y as f64, n.z as f64, d as f64)
}

pub(crate) fn plane_to_quadric(p: &Vector4<f64>) -> Matrix4<f64> {
    p * p.transpose()
}

/// Per-vertex quadrics accumulated from every adjacent face plane
pub(crate) fn compute_quadrics(mesh: &TriangleMesh) -> Vec<Matrix4<f64>> {
    let mut quadrics = vec![Matrix4::zeros(); mesh.vertices.len()];
    for face in &mesh.faces {
        let plane = compute_plane(
            &mesh.vertices[face[0]],
            &mesh.vertices[face[1]],
            &mesh.vertices[face[2]],
        );
        let q = plane_to_quadric(&plane);
        for &vi in face {
            quadrics[vi] += q;
        }
    }
    quadrics
}

pub(crate) fn quadric_error_at(pos: &Point3f, q: &Matrix4<f64>) -> f64 {
    let v = Vector4::new(pos.x as f64, pos.y as f64, pos.z as f64, 1.0);
    (v.transpose() * q * v)[0].max(0.0)
}

/// Position minimizing `q`, or `None` when the 3x3 block is singular
pub(crate) fn optimal_position(q: &Matrix4<f64>) -> Option<Point3f> {
    let q3 = q.fixed_view::<3, 3>(0, 0);
    let q1 = q.fixed_view::<3, 1>(0, 3);
    let inv = q3.try_inverse()?;
    let p = -inv * q1;
    let candidate = Point3f::new(p[0] as f32, p[1] as f32, p[2] as f32);
    candidate.coords.iter().all(|c| c.is_finite()).then_some(candidate)
}
