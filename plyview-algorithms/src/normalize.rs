//! Mesh normalization
//!
//! Centers a mesh on its bounding-box center and scales it uniformly so the
//! longest axis of the box matches a target size. The viewer relies on this
//! so that every asset, whatever its native units, fits the same camera
//! presets.

use plyview_core::{Drawable, Error, Point3f, Result, Transform3D, TriangleMesh, Vector3f};

/// Longest-axis size used by the viewer when settings do not override it
pub const DEFAULT_TARGET_SIZE: f32 = 2.0;

/// A centered, uniformly scaled copy of a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMesh {
    pub mesh: TriangleMesh,
    /// Bounding-box center of the input, in input coordinates
    pub centroid: Point3f,
    /// Uniform factor applied after centering
    pub scale: f32,
}

impl NormalizedMesh {
    /// The transform mapping input coordinates to normalized ones
    pub fn transform(&self) -> Transform3D {
        Transform3D::uniform_scaling(self.scale) * Transform3D::translation(-self.centroid.coords)
    }
}

/// Center `mesh` on its bounding-box center, then scale it so the longest
/// box dimension equals `target_size`.
///
/// Normals are copied as-is since a uniform positive scale does not change
/// their direction. Fails with [`Error::DegenerateGeometry`] when the mesh is
/// empty, when any vertex position is NaN or infinite, or when its bounding
/// box has no non-zero extent.
pub fn normalize(mesh: &TriangleMesh, target_size: f32) -> Result<NormalizedMesh> {
    if !target_size.is_finite() || target_size <= 0.0 {
        return Err(Error::InvalidData(format!(
            "Target size must be finite and positive, got {}",
            target_size
        )));
    }

    if let Some(index) = mesh.vertices.iter().position(|v| !v.coords.iter().all(|c| c.is_finite())) {
        return Err(Error::DegenerateGeometry(format!(
            "Vertex {} has a non-finite position {:?}",
            index, mesh.vertices[index]
        )));
    }

    let bounds = mesh
        .bounding_box()
        .ok_or_else(|| Error::DegenerateGeometry("Mesh has no vertices".to_string()))?;

    let max_extent = bounds.max_extent();
    if !max_extent.is_finite() || max_extent <= 0.0 {
        return Err(Error::DegenerateGeometry(format!(
            "Bounding box extent {} cannot be scaled to {}",
            max_extent, target_size
        )));
    }

    let centroid = bounds.center();
    let offset: Vector3f = centroid.coords;
    let scale = target_size / max_extent;

    let mut normalized = mesh.clone();
    for vertex in &mut normalized.vertices {
        *vertex = Point3f::from((vertex.coords - offset) * scale);
    }

    log::debug!(
        "Normalized {} vertices: centroid {:?}, scale {}",
        normalized.vertex_count(),
        centroid,
        scale
    );

    Ok(NormalizedMesh {
        mesh: normalized,
        centroid,
        scale,
    })
}
