//! Level-of-detail reduction
//!
//! [`LodReducer::reduce`] never fails: decimation errors, panics and invalid
//! output all fall back to an unmodified copy of the input, so a bad reduction
//! can only cost detail, never the scene.

use crate::{ClusteringSimplifier, EdgeCollapseSimplifier, MeshSimplifier, DEFAULT_BOUNDARY_WEIGHT};
use plyview_core::{Error, Result, TriangleMesh};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Discrete detail level driven by the digit keys.
///
/// Level 0 is full detail; levels 1 to 9 keep `level / 10` of the vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LodLevel(u8);

impl LodLevel {
    /// Full detail
    pub const FULL: LodLevel = LodLevel(0);
    pub const MAX: u8 = 9;

    /// `None` for levels above [`LodLevel::MAX`]
    pub fn new(level: u8) -> Option<Self> {
        (level <= Self::MAX).then_some(Self(level))
    }

    /// Level selected by a digit key
    pub fn from_digit(c: char) -> Option<Self> {
        c.to_digit(10).and_then(|d| Self::new(d as u8))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn is_full_detail(self) -> bool {
        self.0 == 0
    }

    /// Fraction of vertices kept at this level
    pub fn fraction(self) -> f32 {
        if self.is_full_detail() {
            1.0
        } else {
            self.0 as f32 / 10.0
        }
    }

    /// Vertex budget for a mesh of `vertex_count` vertices, in exact integer math
    pub fn target_vertex_count(self, vertex_count: usize) -> usize {
        if self.is_full_detail() {
            vertex_count
        } else {
            vertex_count * self.0 as usize / 10
        }
    }
}

impl fmt::Display for LodLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_full_detail() {
            write!(f, "full detail")
        } else {
            write!(f, "level {} ({}%)", self.0, self.0 as u32 * 10)
        }
    }
}

/// Produces lower-detail copies of a mesh.
///
/// The primary simplifier runs first; if it stops above the vertex budget a
/// clustering pass finishes the reduction. Vertex normals are recomputed on
/// every reduced mesh that has faces.
#[derive(Debug, Clone)]
pub struct LodReducer<S = EdgeCollapseSimplifier> {
    simplifier: S,
    fallback: ClusteringSimplifier,
}

impl LodReducer<EdgeCollapseSimplifier> {
    /// Edge collapse that may also shrink open boundaries (at a cost penalty)
    pub fn new() -> Self {
        Self::with_simplifier(EdgeCollapseSimplifier::with_params(
            None,
            false,
            DEFAULT_BOUNDARY_WEIGHT,
        ))
    }
}

impl Default for LodReducer<EdgeCollapseSimplifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MeshSimplifier> LodReducer<S> {
    pub fn with_simplifier(simplifier: S) -> Self {
        Self {
            simplifier,
            fallback: ClusteringSimplifier::new(),
        }
    }

    pub fn simplifier(&self) -> &S {
        &self.simplifier
    }

    /// Reduce `mesh` to at most `floor(vertex_count * target_fraction)`
    /// vertices.
    ///
    /// A fraction of 1 or more returns an unmodified copy, as does a NaN or
    /// non-positive fraction (with a warning). Never fails.
    pub fn reduce(&self, mesh: &TriangleMesh, target_fraction: f32) -> TriangleMesh {
        if target_fraction.is_nan() || target_fraction <= 0.0 {
            log::warn!(
                "Ignoring invalid LOD fraction {}; keeping full detail",
                target_fraction
            );
            return mesh.clone();
        }
        if target_fraction >= 1.0 {
            return mesh.clone();
        }

        // Widened so large counts keep their low digits; no rounding up
        let target = (mesh.vertex_count() as f64 * f64::from(target_fraction)).floor() as usize;
        self.reduce_to_count(mesh, target)
    }

    /// Reduce to the budget of a discrete level.
    ///
    /// Prefer this over [`LodReducer::reduce`] for digit-key levels: the
    /// budget `vertex_count * level / 10` is exact, while an `f32` fraction
    /// such as 0.7 sits just below its decimal value.
    pub fn reduce_to_level(&self, mesh: &TriangleMesh, level: LodLevel) -> TriangleMesh {
        if level.is_full_detail() {
            return mesh.clone();
        }
        self.reduce_to_count(mesh, level.target_vertex_count(mesh.vertex_count()))
    }

    /// Reduce to at most `target` vertices, falling back to a copy on failure
    pub fn reduce_to_count(&self, mesh: &TriangleMesh, target: usize) -> TriangleMesh {
        if mesh.vertex_count() <= target {
            return mesh.clone();
        }
        if target == 0 {
            log::warn!(
                "LOD target of 0 vertices for a {}-vertex mesh yields an empty mesh",
                mesh.vertex_count()
            );
            return TriangleMesh::new();
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.try_reduce(mesh, target))) {
            Ok(Ok(reduced)) => {
                log::info!(
                    "Reduced mesh from {} to {} vertices (target {})",
                    mesh.vertex_count(),
                    reduced.vertex_count(),
                    target
                );
                reduced
            }
            Ok(Err(e)) => {
                log::warn!("Decimation failed, keeping full detail: {}", e);
                mesh.clone()
            }
            Err(_) => {
                log::warn!("Decimation panicked, keeping full detail");
                mesh.clone()
            }
        }
    }

    fn try_reduce(&self, mesh: &TriangleMesh, target: usize) -> Result<TriangleMesh> {
        let mut reduced = self.simplifier.simplify(mesh, target)?;
        reduced.validate()?;

        if reduced.vertex_count() > target {
            log::debug!(
                "Primary simplifier stopped at {} vertices, clustering down to {}",
                reduced.vertex_count(),
                target
            );
            reduced = self.fallback.simplify(&reduced, target)?;
            reduced.validate()?;
        }

        if reduced.vertex_count() > target {
            return Err(Error::Algorithm(format!(
                "Reduced mesh has {} vertices, above the target of {}",
                reduced.vertex_count(),
                target
            )));
        }

        reduced.compute_vertex_normals();
        Ok(reduced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plyview_core::{Point3f, Vector3f};
    use rand::{Rng, SeedableRng};

    struct FailingSimplifier;

    impl MeshSimplifier for FailingSimplifier {
        fn simplify(&self, _mesh: &TriangleMesh, _target: usize) -> Result<TriangleMesh> {
            Err(Error::Algorithm("simulated failure".to_string()))
        }
    }

    struct PanickingSimplifier;

    impl MeshSimplifier for PanickingSimplifier {
        fn simplify(&self, _mesh: &TriangleMesh, _target: usize) -> Result<TriangleMesh> {
            panic!("simulated panic")
        }
    }

    /// Returns a mesh whose faces point past the vertex list
    struct CorruptingSimplifier;

    impl MeshSimplifier for CorruptingSimplifier {
        fn simplify(&self, mesh: &TriangleMesh, _target: usize) -> Result<TriangleMesh> {
            Ok(TriangleMesh::from_vertices_and_faces(
                mesh.vertices[..1].to_vec(),
                vec![[0, 1, 2]],
            ))
        }
    }

    /// Does nothing, leaving all the work to the clustering pass
    struct IdentitySimplifier;

    impl MeshSimplifier for IdentitySimplifier {
        fn simplify(&self, mesh: &TriangleMesh, _target: usize) -> Result<TriangleMesh> {
            Ok(mesh.clone())
        }
    }

    /// Keeps exactly the first `target` vertices
    struct BudgetSimplifier;

    impl MeshSimplifier for BudgetSimplifier {
        fn simplify(&self, mesh: &TriangleMesh, target: usize) -> Result<TriangleMesh> {
            Ok(TriangleMesh::from_points(mesh.vertices[..target].to_vec()))
        }
    }

    fn make_line_cloud(count: usize) -> TriangleMesh {
        TriangleMesh::from_points((0..count).map(|i| Point3f::new(i as f32, 0.0, 0.0)).collect())
    }

    fn make_cube() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(-1.0, -1.0, -1.0),
                Point3f::new(1.0, -1.0, -1.0),
                Point3f::new(1.0, 1.0, -1.0),
                Point3f::new(-1.0, 1.0, -1.0),
                Point3f::new(-1.0, -1.0, 1.0),
                Point3f::new(1.0, -1.0, 1.0),
                Point3f::new(1.0, 1.0, 1.0),
                Point3f::new(-1.0, 1.0, 1.0),
            ],
            vec![
                [0, 2, 1], [0, 3, 2],
                [4, 5, 6], [4, 6, 7],
                [0, 1, 5], [0, 5, 4],
                [3, 7, 6], [3, 6, 2],
                [0, 4, 7], [0, 7, 3],
                [1, 2, 6], [1, 6, 5],
            ],
        )
    }

    fn make_sphere(segments: usize, rings: usize) -> TriangleMesh {
        let mut vertices = vec![Point3f::new(0.0, 0.0, 1.0)];
        for i in 1..rings {
            let theta = std::f32::consts::PI * i as f32 / rings as f32;
            for j in 0..segments {
                let phi = 2.0 * std::f32::consts::PI * j as f32 / segments as f32;
                vertices.push(Point3f::new(
                    theta.sin() * phi.cos(),
                    theta.sin() * phi.sin(),
                    theta.cos(),
                ));
            }
        }
        vertices.push(Point3f::new(0.0, 0.0, -1.0));
        let south = vertices.len() - 1;

        let mut faces = Vec::new();
        for j in 0..segments {
            faces.push([0, 1 + j, 1 + (j + 1) % segments]);
        }
        for i in 0..rings - 2 {
            for j in 0..segments {
                let a = 1 + i * segments + j;
                let b = 1 + i * segments + (j + 1) % segments;
                let c = a + segments;
                let d = b + segments;
                faces.push([a, c, b]);
                faces.push([b, c, d]);
            }
        }
        let base = 1 + (rings - 2) * segments;
        for j in 0..segments {
            faces.push([south, base + (j + 1) % segments, base + j]);
        }
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    #[test]
    fn test_lod_level_fractions() {
        assert_eq!(LodLevel::FULL.fraction(), 1.0);
        assert_eq!(LodLevel::new(5).unwrap().fraction(), 0.5);
        assert_eq!(LodLevel::new(1).unwrap().fraction(), 0.1);
        assert!(LodLevel::new(10).is_none());

        assert_eq!(LodLevel::from_digit('7'), LodLevel::new(7));
        assert_eq!(LodLevel::from_digit('0'), Some(LodLevel::FULL));
        assert_eq!(LodLevel::from_digit('x'), None);

        assert_eq!(LodLevel::new(7).unwrap().target_vertex_count(10), 7);
        assert_eq!(LodLevel::new(3).unwrap().target_vertex_count(8), 2);
        assert_eq!(LodLevel::FULL.target_vertex_count(8), 8);
        assert_eq!(LodLevel::new(5).unwrap().to_string(), "level 5 (50%)");
    }

    #[test]
    fn test_full_fraction_is_identity() {
        let reducer = LodReducer::new();
        let cube = make_cube();
        assert_eq!(reducer.reduce(&cube, 1.0), cube);
        assert_eq!(reducer.reduce(&cube, 1.5), cube);
        assert_eq!(reducer.reduce_to_level(&cube, LodLevel::FULL), cube);
    }

    #[test]
    fn test_cube_half_has_at_most_four_vertices() {
        let reducer = LodReducer::new();
        let reduced = reducer.reduce(&make_cube(), 0.5);

        assert!(reduced.vertex_count() <= 4);
        assert!(reduced.vertex_count() > 0);
        assert!(reduced.validate().is_ok());
        if reduced.has_faces() {
            assert_eq!(reduced.normals.as_ref().map(Vec::len), Some(reduced.vertex_count()));
        }
    }

    #[test]
    fn test_fraction_bound_holds_on_sphere() {
        let reducer = LodReducer::new();
        let sphere = make_sphere(16, 10);
        let n = sphere.vertex_count();

        for level in 1..=9u8 {
            let fraction = level as f32 / 10.0;
            let reduced = reducer.reduce(&sphere, fraction);
            let bound = (n as f32 * fraction).floor() as usize;
            assert!(
                reduced.vertex_count() <= bound,
                "fraction {}: {} > {}",
                fraction,
                reduced.vertex_count(),
                bound
            );
            assert!(reduced.validate().is_ok());

            let normals = reduced.normals.as_ref().expect("normals recomputed");
            for normal in normals {
                assert!((normal.norm() - 1.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_reduce_to_level_matches_integer_budget() {
        let reducer = LodReducer::new();
        let sphere = make_sphere(12, 8);
        let n = sphere.vertex_count();
        let reduced = reducer.reduce_to_level(&sphere, LodLevel::new(3).unwrap());
        assert!(reduced.vertex_count() <= n * 3 / 10);
    }

    #[test]
    fn test_tiny_fraction_yields_empty_mesh() {
        let reducer = LodReducer::new();
        let reduced = reducer.reduce(&make_cube(), 0.1);
        assert!(reduced.is_empty());
    }

    #[test]
    fn test_invalid_fraction_returns_copy() {
        let reducer = LodReducer::new();
        let cube = make_cube();
        assert_eq!(reducer.reduce(&cube, f32::NAN), cube);
        assert_eq!(reducer.reduce(&cube, 0.0), cube);
        assert_eq!(reducer.reduce(&cube, -0.5), cube);
    }

    #[test]
    fn test_simplifier_error_falls_back_to_copy() {
        let reducer = LodReducer::with_simplifier(FailingSimplifier);
        let cube = make_cube();
        let reduced = reducer.reduce(&cube, 0.5);
        assert_eq!(reduced, cube);
        assert!(reduced.validate().is_ok());
    }

    #[test]
    fn test_simplifier_panic_falls_back_to_copy() {
        let reducer = LodReducer::with_simplifier(PanickingSimplifier);
        let cube = make_cube();
        assert_eq!(reducer.reduce(&cube, 0.5), cube);
    }

    #[test]
    fn test_invalid_output_falls_back_to_copy() {
        let reducer = LodReducer::with_simplifier(CorruptingSimplifier);
        let cube = make_cube();
        assert_eq!(reducer.reduce(&cube, 0.5), cube);
    }

    #[test]
    fn test_clustering_finishes_stalled_reduction() {
        let reducer = LodReducer::with_simplifier(IdentitySimplifier);
        let sphere = make_sphere(10, 6);
        let target = sphere.vertex_count() / 4;
        let reduced = reducer.reduce_to_count(&sphere, target);
        assert!(reduced.vertex_count() <= target);
        assert!(reduced.validate().is_ok());
    }

    #[test]
    fn test_random_point_cloud() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let points: Vec<Point3f> = (0..500)
            .map(|_| Point3f::new(rng.gen_range(0.0..4.0), rng.gen_range(0.0..2.0), rng.gen_range(0.0..1.0)))
            .collect();
        let mut cloud = TriangleMesh::from_points(points);
        cloud.set_colors(vec![[200, 100, 50]; 500]);
        cloud.set_normals(vec![Vector3f::y(); 500]);

        let reducer = LodReducer::new();
        let reduced = reducer.reduce(&cloud, 0.2);
        assert!(reduced.vertex_count() <= 100);
        assert!(reduced.vertex_count() > 0);
        assert!(!reduced.has_faces());
        assert_eq!(reduced.colors.as_ref().map(Vec::len), Some(reduced.vertex_count()));
        // Point cloud normals come from the cluster members
        assert!(reduced.normals.as_ref().unwrap().iter().all(|n| n.y > 0.99));
    }

    #[test]
    fn test_fraction_budget_is_exact_on_large_clouds() {
        let reducer = LodReducer::with_simplifier(BudgetSimplifier);
        for &n in &[2_000_000usize, 4_000_000, 5_000_003] {
            let cloud = make_line_cloud(n);
            for &fraction in &[0.5f32, 0.25, 0.7] {
                let bound = (n as f64 * f64::from(fraction)).floor() as usize;
                let reduced = reducer.reduce(&cloud, fraction);
                assert!(
                    reduced.vertex_count() <= bound,
                    "n={} fraction={}: {} > {}",
                    n,
                    fraction,
                    reduced.vertex_count(),
                    bound
                );
            }
        }
    }

    #[test]
    fn test_level_budget_is_exact_on_large_clouds() {
        let reducer = LodReducer::with_simplifier(BudgetSimplifier);
        let n = 4_000_000;
        let cloud = make_line_cloud(n);
        for level in 1..=9u8 {
            let reduced = reducer.reduce_to_level(&cloud, LodLevel::new(level).unwrap());
            assert_eq!(reduced.vertex_count(), n * level as usize / 10);
        }
    }
}
