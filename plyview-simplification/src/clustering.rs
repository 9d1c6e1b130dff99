//! Clustering-based mesh simplification
//!
//! Implements the Rossignac & Borrel (1993) vertex clustering algorithm on a
//! uniform grid. The grid is made coarser pass by pass until the clustered
//! mesh fits the requested vertex budget, which makes this simplifier the
//! backstop whenever edge collapse cannot reach a target. It also handles
//! point clouds, where every occupied cell becomes one output point.

use crate::quadric::{compute_quadrics, optimal_position, quadric_error_at};
use crate::MeshSimplifier;
use nalgebra::Matrix4;
use std::collections::{BTreeMap, HashMap, HashSet};
use plyview_core::{Aabb, Color3, Error, Point3f, Result, TriangleMesh, Vector3f};

/// Factor applied to the cell size after a pass that kept too many vertices
const GRID_GROWTH: f64 = 1.5;
/// Passes before everything is merged into a single cluster
const MAX_PASSES: usize = 64;

// ============================================================
// Configuration Types
// ============================================================

/// Strategy for selecting the representative vertex within a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepresentativeStrategy {
    /// Arithmetic mean of all vertex positions in the cluster.
    #[default]
    Centroid,
    /// Weighted average using vertex valence (number of adjacent faces).
    WeightedAverage,
    /// Position that minimizes the summed quadric error for the cluster.
    MinimumError,
}

// ============================================================
// Helpers
// ============================================================

fn compute_vertex_valence(mesh: &TriangleMesh) -> Vec<usize> {
    let mut valence = vec![0usize; mesh.vertices.len()];
    for face in &mesh.faces {
        for &vi in face {
            valence[vi] += 1;
        }
    }
    valence
}

fn weighted_mean(cluster: &[usize], positions: &[Point3f], weight: impl Fn(usize) -> f64) -> Option<Point3f> {
    let mut sum = [0.0f64; 3];
    let mut w_total = 0.0f64;
    for &vi in cluster {
        let w = weight(vi);
        for (axis, s) in sum.iter_mut().enumerate() {
            *s += positions[vi][axis] as f64 * w;
        }
        w_total += w;
    }
    (w_total > 0.0).then(|| {
        Point3f::new(
            (sum[0] / w_total) as f32,
            (sum[1] / w_total) as f32,
            (sum[2] / w_total) as f32,
        )
    })
}

fn select_representative(
    cluster: &[usize],
    positions: &[Point3f],
    quadrics: &[Matrix4<f64>],
    valence: &[usize],
    strategy: RepresentativeStrategy,
) -> Point3f {
    match strategy {
        RepresentativeStrategy::Centroid => {
            weighted_mean(cluster, positions, |_| 1.0).unwrap_or(positions[cluster[0]])
        }
        RepresentativeStrategy::WeightedAverage => {
            weighted_mean(cluster, positions, |vi| valence[vi].max(1) as f64)
                .unwrap_or(positions[cluster[0]])
        }
        RepresentativeStrategy::MinimumError => {
            let q_sum = cluster
                .iter()
                .fold(Matrix4::zeros(), |acc, &vi| acc + quadrics[vi]);

            if let Some(candidate) = optimal_position(&q_sum) {
                return candidate;
            }

            // Fallback: pick the vertex with minimum quadric error
            let mut best_vi = cluster[0];
            let mut best_err = f64::MAX;
            for &vi in cluster {
                let err = quadric_error_at(&positions[vi], &q_sum);
                if err < best_err {
                    best_err = err;
                    best_vi = vi;
                }
            }
            positions[best_vi]
        }
    }
}

// ============================================================
// Clustering Simplifier
// ============================================================

/// Clustering-based mesh simplifier.
///
/// Vertices falling into the same grid cell are merged into one
/// representative; triangles that collapse are dropped and duplicates
/// removed. The output never exceeds the requested vertex count.
#[derive(Debug, Clone, Default)]
pub struct ClusteringSimplifier {
    /// Strategy for choosing the representative position of each cluster.
    pub representative_strategy: RepresentativeStrategy,
}

impl ClusteringSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(representative_strategy: RepresentativeStrategy) -> Self {
        Self {
            representative_strategy,
        }
    }

    /// Grid cell size expected to produce about `target` occupied cells.
    /// Handles degenerate (planar/linear) meshes by using only non-degenerate
    /// dimensions. `None` when all vertices coincide.
    fn initial_cell_size(bounds: &Aabb, target: usize) -> Option<f64> {
        let eps = 1e-6;
        let size = bounds.size();
        let extents: Vec<f64> = size
            .iter()
            .map(|&d| d as f64)
            .filter(|&d| d > eps)
            .collect();
        if extents.is_empty() {
            return None;
        }

        // product(extents) / cell_size^dim ≈ target
        let product: f64 = extents.iter().product();
        let cell = (product / target.max(1) as f64).powf(1.0 / extents.len() as f64);
        (cell.is_finite() && cell > 0.0).then_some(cell)
    }

    /// Assign vertices to uniform grid cells.
    fn uniform_clustering(mesh: &TriangleMesh, origin: &Point3f, cell_size: f64) -> Vec<Vec<usize>> {
        let mut cells: BTreeMap<(i64, i64, i64), Vec<usize>> = BTreeMap::new();

        for (vi, v) in mesh.vertices.iter().enumerate() {
            let ix = ((v.x as f64 - origin.x as f64) / cell_size).floor() as i64;
            let iy = ((v.y as f64 - origin.y as f64) / cell_size).floor() as i64;
            let iz = ((v.z as f64 - origin.z as f64) / cell_size).floor() as i64;
            cells.entry((ix, iy, iz)).or_default().push(vi);
        }

        cells.into_values().collect()
    }

    /// Build the simplified mesh from clusters.
    ///
    /// When at least one triangle survives, clusters referenced by no face are
    /// dropped; otherwise every cluster is kept as a point.
    fn build_simplified_mesh(
        &self,
        mesh: &TriangleMesh,
        clusters: &[Vec<usize>],
        quadrics: &[Matrix4<f64>],
        valence: &[usize],
    ) -> TriangleMesh {
        // Map each original vertex to its cluster index
        let mut vertex_to_cluster: Vec<usize> = vec![0; mesh.vertices.len()];
        for (ci, cluster) in clusters.iter().enumerate() {
            for &vi in cluster {
                vertex_to_cluster[vi] = ci;
            }
        }

        // Remap faces, filtering degenerate triangles
        let mut new_faces: Vec<[usize; 3]> = Vec::new();
        let mut seen_faces: HashSet<[usize; 3]> = HashSet::new();

        for face in &mesh.faces {
            let mapped = face.map(|vi| vertex_to_cluster[vi]);
            let [nv0, nv1, nv2] = mapped;

            // Skip degenerate triangles
            if nv0 == nv1 || nv1 == nv2 || nv2 == nv0 {
                continue;
            }

            // Canonical ordering to deduplicate
            let mut sorted = mapped;
            sorted.sort_unstable();
            if seen_faces.insert(sorted) {
                new_faces.push(mapped);
            }
        }

        let used_clusters: Option<HashSet<usize>> = (!new_faces.is_empty())
            .then(|| new_faces.iter().flatten().copied().collect());

        let mut old_to_new: HashMap<usize, usize> = HashMap::new();
        let mut new_vertices: Vec<Point3f> = Vec::new();
        let mut new_normals: Vec<Vector3f> = Vec::new();
        let mut new_colors: Vec<Color3> = Vec::new();

        for (ci, cluster) in clusters.iter().enumerate() {
            if used_clusters.as_ref().is_some_and(|used| !used.contains(&ci)) {
                continue;
            }
            old_to_new.insert(ci, new_vertices.len());

            let representative = if cluster.len() == 1 {
                mesh.vertices[cluster[0]]
            } else {
                select_representative(
                    cluster,
                    &mesh.vertices,
                    quadrics,
                    valence,
                    self.representative_strategy,
                )
            };
            new_vertices.push(representative);

            // Interpolate normals: average normals of cluster members
            if let Some(ref normals) = mesh.normals {
                let sum: Vector3f = cluster.iter().map(|&vi| normals[vi]).sum();
                let len = sum.magnitude();
                new_normals.push(if len > 1e-12 { sum / len } else { Vector3f::z() });
            }

            // Interpolate colors: average colors of cluster members
            if let Some(ref colors) = mesh.colors {
                let mut rgb = [0u32; 3];
                for &vi in cluster {
                    for (channel, total) in rgb.iter_mut().enumerate() {
                        *total += colors[vi][channel] as u32;
                    }
                }
                let n = cluster.len() as u32;
                new_colors.push(rgb.map(|total| (total / n) as u8));
            }
        }

        // Remap face indices
        let remapped_faces: Vec<[usize; 3]> = new_faces
            .iter()
            .filter_map(|f| {
                match (old_to_new.get(&f[0]), old_to_new.get(&f[1]), old_to_new.get(&f[2])) {
                    (Some(&a), Some(&b), Some(&c)) => Some([a, b, c]),
                    _ => None,
                }
            })
            .collect();

        let mut result = TriangleMesh::from_vertices_and_faces(new_vertices, remapped_faces);
        if mesh.normals.is_some() {
            result.set_normals(new_normals);
        }
        if mesh.colors.is_some() {
            result.set_colors(new_colors);
        }
        result
    }
}

impl MeshSimplifier for ClusteringSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, target_vertex_count: usize) -> Result<TriangleMesh> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }
        mesh.validate()?;
        if target_vertex_count == 0 {
            return Ok(TriangleMesh::new());
        }
        if mesh.vertex_count() <= target_vertex_count {
            return Ok(mesh.clone());
        }

        let quadrics = compute_quadrics(mesh);
        let valence = compute_vertex_valence(mesh);
        let bounds = mesh
            .bounds()
            .ok_or_else(|| Error::InvalidData("Mesh is empty".to_string()))?;

        if let Some(mut cell_size) = Self::initial_cell_size(&bounds, target_vertex_count) {
            for pass in 0..MAX_PASSES {
                let clusters = Self::uniform_clustering(mesh, &bounds.min, cell_size);
                let result = self.build_simplified_mesh(mesh, &clusters, &quadrics, &valence);
                if result.vertex_count() <= target_vertex_count {
                    log::debug!(
                        "Clustering pass {} (cell {:.4}): {} -> {} vertices",
                        pass,
                        cell_size,
                        mesh.vertex_count(),
                        result.vertex_count()
                    );
                    return Ok(result);
                }
                cell_size *= GRID_GROWTH;
            }
        }

        // Coincident or unbounded input: merge everything into one point
        let all: Vec<usize> = (0..mesh.vertex_count()).collect();
        Ok(self.build_simplified_mesh(mesh, &[all], &quadrics, &valence))
    }
}
