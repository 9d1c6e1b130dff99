//! Axis-aligned bounding boxes

use crate::point::*;
use serde::{Deserialize, Serialize};

/// The smallest axis-aligned box containing a set of points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3f,
    pub max: Point3f,
}

impl Aabb {
    /// Create a box from its two corners
    pub fn new(min: Point3f, max: Point3f) -> Self {
        Self { min, max }
    }

    /// Compute the box of a point set, `None` if the set is empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3f>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut min = first;
        let mut max = first;

        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(Self { min, max })
    }

    /// Edge lengths along x, y and z
    pub fn size(&self) -> Vector3f {
        self.max - self.min
    }

    /// Center of the box
    pub fn center(&self) -> Point3f {
        nalgebra::center(&self.min, &self.max)
    }

    /// Length of the longest edge
    pub fn max_extent(&self) -> f32 {
        let s = self.size();
        s.x.max(s.y).max(s.z)
    }

    pub fn contains(&self, p: &Point3f) -> bool {
        (self.min.x..=self.max.x).contains(&p.x)
            && (self.min.y..=self.max.y).contains(&p.y)
            && (self.min.z..=self.max.z).contains(&p.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_points() {
        let points: Vec<Point3f> = Vec::new();
        assert!(Aabb::from_points(&points).is_none());
    }

    #[test]
    fn test_box_metrics() {
        let points = vec![
            Point3f::new(-1.0, 2.0, 0.0),
            Point3f::new(3.0, -2.0, 1.0),
            Point3f::new(0.0, 0.0, 0.5),
        ];
        let bbox = Aabb::from_points(&points).unwrap();

        assert_eq!(bbox.min, Point3f::new(-1.0, -2.0, 0.0));
        assert_eq!(bbox.max, Point3f::new(3.0, 2.0, 1.0));
        assert_relative_eq!(bbox.size(), Vector3f::new(4.0, 4.0, 1.0));
        assert_relative_eq!(bbox.center(), Point3f::new(1.0, 0.0, 0.5));
        assert_eq!(bbox.max_extent(), 4.0);
        assert!(bbox.contains(&Point3f::new(0.0, 0.0, 0.5)));
        assert!(!bbox.contains(&Point3f::new(0.0, 0.0, 2.0)));
    }

    #[test]
    fn test_single_point_has_zero_extent() {
        let points = vec![Point3f::new(5.0, 5.0, 5.0)];
        let bbox = Aabb::from_points(&points).unwrap();
        assert_eq!(bbox.max_extent(), 0.0);
        assert_eq!(bbox.center(), Point3f::new(5.0, 5.0, 5.0));
    }
}
