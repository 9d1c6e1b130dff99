//! Core traits for plyview

use crate::{bounds::Aabb, mesh::*, point::*};

/// Trait for drawable/renderable objects
pub trait Drawable {
    /// Get the bounding box of the object, `None` when it has no vertices
    fn bounding_box(&self) -> Option<Aabb>;

    /// Get the center point of the object
    fn center(&self) -> Option<Point3f> {
        self.bounding_box().map(|b| b.center())
    }
}

impl Drawable for TriangleMesh {
    fn bounding_box(&self) -> Option<Aabb> {
        self.bounds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_center() {
        let mesh = TriangleMesh::from_points(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(2.0, 4.0, 6.0),
        ]);
        assert_eq!(mesh.center(), Some(Point3f::new(1.0, 2.0, 3.0)));
        assert_eq!(TriangleMesh::new().center(), None);
    }
}
