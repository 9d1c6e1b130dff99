//! Edge collapse simplification
//!
//! Implements iterative edge collapse mesh simplification using a half-edge
//! data structure for efficient topology operations and quadric error metrics
//! (QEM) for error-driven edge prioritization.
//!
//! Collapses are refused when they would break the link condition, pinch two
//! boundaries together, or fold two triangles onto each other. The simplifier
//! therefore stops early on meshes that cannot shrink further without
//! changing topology; callers needing a hard vertex budget finish the job with
//! [`ClusteringSimplifier`](crate::ClusteringSimplifier).

use crate::quadric::{compute_plane, optimal_position, plane_to_quadric};
use crate::MeshSimplifier;
use nalgebra::{Matrix4, Vector4};
use priority_queue::PriorityQueue;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use plyview_core::{Color3, Error, Point3f, Result, TriangleMesh, Vector3f};

const INVALID: usize = usize::MAX;

/// Default extra cost for collapses that touch the mesh boundary
pub const DEFAULT_BOUNDARY_WEIGHT: f64 = 100.0;

// ============================================================
// Half-Edge Data Structure
// ============================================================

#[derive(Debug, Clone)]
struct HalfEdge {
    target: usize,
    twin: usize,
    next: usize,
    prev: usize,
    face: usize,
}

/// Half-edge mesh for topology-aware edge collapse operations.
struct HalfEdgeMesh {
    half_edges: Vec<HalfEdge>,
    /// One outgoing half-edge per vertex (INVALID if removed)
    vertex_edge: Vec<usize>,
    /// One half-edge per face (INVALID if removed)
    face_edge: Vec<usize>,
    active_vertex_count: usize,
    positions: Vec<Point3f>,
    normals: Option<Vec<Vector3f>>,
    colors: Option<Vec<Color3>>,
    quadrics: Vec<Matrix4<f64>>,
    vertex_removed: Vec<bool>,
}

impl HalfEdgeMesh {
    fn from_triangle_mesh(mesh: &TriangleMesh) -> Self {
        let nv = mesh.vertices.len();
        let nf = mesh.faces.len();

        let mut half_edges = Vec::with_capacity(nf * 3);
        let mut vertex_edge = vec![INVALID; nv];
        let mut face_edge = Vec::with_capacity(nf);

        for (fi, face) in mesh.faces.iter().enumerate() {
            let base = fi * 3;
            for j in 0..3usize {
                half_edges.push(HalfEdge {
                    target: face[(j + 1) % 3],
                    twin: INVALID,
                    next: base + (j + 1) % 3,
                    prev: base + (j + 2) % 3,
                    face: fi,
                });
                if vertex_edge[face[j]] == INVALID {
                    vertex_edge[face[j]] = base + j;
                }
            }
            face_edge.push(base);
        }

        // Build twin pointers; non-manifold edges beyond the first pair stay unpaired
        let mut edge_map: HashMap<(usize, usize), usize> = HashMap::with_capacity(nf * 3);
        for (he_idx, he) in half_edges.iter().enumerate() {
            let src = half_edges[he.prev].target;
            edge_map.entry((src, he.target)).or_insert(he_idx);
        }
        for he_idx in 0..half_edges.len() {
            if half_edges[he_idx].twin != INVALID {
                continue;
            }
            let src = half_edges[half_edges[he_idx].prev].target;
            let tgt = half_edges[he_idx].target;
            if let Some(&twin_idx) = edge_map.get(&(tgt, src)) {
                if twin_idx != he_idx && half_edges[twin_idx].twin == INVALID {
                    half_edges[he_idx].twin = twin_idx;
                    half_edges[twin_idx].twin = he_idx;
                }
            }
        }

        let active_vertex_count = vertex_edge.iter().filter(|&&he| he != INVALID).count();

        let mut hem = HalfEdgeMesh {
            half_edges,
            vertex_edge,
            face_edge,
            active_vertex_count,
            positions: mesh.vertices.clone(),
            normals: mesh.normals.clone(),
            colors: mesh.colors.clone(),
            quadrics: vec![Matrix4::zeros(); nv],
            vertex_removed: vec![false; nv],
        };
        hem.initialize_quadrics();
        hem
    }

    #[inline]
    fn source(&self, he: usize) -> usize {
        self.half_edges[self.half_edges[he].prev].target
    }

    #[inline]
    fn is_alive(&self, v: usize) -> bool {
        !self.vertex_removed[v] && self.vertex_edge[v] != INVALID
    }

    fn face_vertices(&self, fi: usize) -> [usize; 3] {
        let he0 = self.face_edge[fi];
        let he1 = self.half_edges[he0].next;
        [self.source(he0), self.half_edges[he0].target, self.half_edges[he1].target]
    }

    fn initialize_quadrics(&mut self) {
        for fi in 0..self.face_edge.len() {
            if self.face_edge[fi] == INVALID {
                continue;
            }
            let [v0, v1, v2] = self.face_vertices(fi);
            let plane: Vector4<f64> =
                compute_plane(&self.positions[v0], &self.positions[v1], &self.positions[v2]);
            let q = plane_to_quadric(&plane);
            self.quadrics[v0] += q;
            self.quadrics[v1] += q;
            self.quadrics[v2] += q;
        }
    }

    /// Get all outgoing half-edges from a vertex (handles boundary vertices).
    ///
    /// Both rotations are bounded by the half-edge count so that damaged
    /// connectivity cannot loop forever.
    fn outgoing_half_edges(&self, v: usize) -> Vec<usize> {
        let start = self.vertex_edge[v];
        if start == INVALID {
            return vec![];
        }

        let limit = self.half_edges.len();
        let mut result = Vec::new();
        let mut current = start;

        // Rotate counterclockwise: current.prev.twin
        for _ in 0..limit {
            result.push(current);
            let prev = self.half_edges[current].prev;
            let twin = self.half_edges[prev].twin;
            if twin == INVALID {
                break;
            }
            current = twin;
            if current == start {
                return result;
            }
        }

        // Boundary: also rotate clockwise from start via twin.next
        let twin_of_start = self.half_edges[start].twin;
        if twin_of_start != INVALID {
            let mut current = self.half_edges[twin_of_start].next;
            for _ in 0..limit {
                if current == start || result.contains(&current) {
                    break;
                }
                result.push(current);
                let twin = self.half_edges[current].twin;
                if twin == INVALID {
                    break;
                }
                current = self.half_edges[twin].next;
            }
        }

        result
    }

    /// Every vertex sharing a live face with `v`
    fn neighbors(&self, v: usize) -> HashSet<usize> {
        let mut result = HashSet::new();
        for he in self.outgoing_half_edges(v) {
            if self.half_edges[he].face == INVALID {
                continue;
            }
            let next = self.half_edges[he].next;
            result.insert(self.half_edges[he].target);
            result.insert(self.half_edges[next].target);
        }
        result.remove(&v);
        result
    }

    /// Live faces incident to `v`
    fn faces_around(&self, v: usize) -> HashSet<usize> {
        self.outgoing_half_edges(v)
            .into_iter()
            .map(|he| self.half_edges[he].face)
            .filter(|&f| f != INVALID)
            .collect()
    }

    fn is_boundary_vertex(&self, v: usize) -> bool {
        self.outgoing_half_edges(v).into_iter().any(|he| {
            let prev = self.half_edges[he].prev;
            self.half_edges[he].twin == INVALID || self.half_edges[prev].twin == INVALID
        })
    }

    /// Check the link condition: common neighbors must equal exactly the
    /// face apices opposite the edge (2 for interior, 1 for boundary).
    /// Interior edges joining two boundary vertices would pinch the surface.
    fn check_link_condition(&self, v1: usize, v2: usize) -> bool {
        let h = match self.find_half_edge(v1, v2) {
            Some(h) => h,
            None => return false,
        };
        let is_boundary_edge = self.half_edges[h].twin == INVALID;
        if !is_boundary_edge && self.is_boundary_vertex(v1) && self.is_boundary_vertex(v2) {
            return false;
        }

        let n1 = self.neighbors(v1);
        let n2 = self.neighbors(v2);
        let common_count = n1.intersection(&n2).count();

        let expected = if is_boundary_edge { 1 } else { 2 };
        common_count == expected
    }

    /// True when merging `v2` into `v1` would leave two faces over the same
    /// three vertices (the fold produced by collapsing a tetrahedron edge).
    fn collapse_creates_duplicate_face(&self, v1: usize, v2: usize) -> bool {
        let mut faces = self.faces_around(v1);
        faces.extend(self.faces_around(v2));

        let mut seen = HashSet::with_capacity(faces.len());
        for fi in faces {
            let verts = self.face_vertices(fi);
            if verts.contains(&v1) && verts.contains(&v2) {
                continue;
            }
            let mut key = verts.map(|v| if v == v2 { v1 } else { v });
            key.sort_unstable();
            if !seen.insert(key) {
                return true;
            }
        }
        false
    }

    fn find_half_edge(&self, from: usize, to: usize) -> Option<usize> {
        self.outgoing_half_edges(from)
            .into_iter()
            .find(|&he| self.half_edges[he].face != INVALID && self.half_edges[he].target == to)
    }

    fn compute_collapse_cost(&self, v1: usize, v2: usize) -> (Point3f, f64) {
        let q = self.quadrics[v1] + self.quadrics[v2];

        let optimal = optimal_position(&q).unwrap_or_else(|| {
            Point3f::from((self.positions[v1].coords + self.positions[v2].coords) * 0.5)
        });

        let vh = Vector4::new(
            optimal.x as f64,
            optimal.y as f64,
            optimal.z as f64,
            1.0,
        );
        let cost = (vh.transpose() * q * vh)[0].max(0.0);
        (optimal, cost)
    }

    /// Find any valid outgoing half-edge from a vertex (linear scan fallback).
    fn find_valid_outgoing(&self, v: usize) -> usize {
        for (i, he) in self.half_edges.iter().enumerate() {
            if he.face != INVALID && self.source(i) == v {
                return i;
            }
        }
        INVALID
    }

    /// Point `v` at a live outgoing half-edge, preferring `candidate`
    fn repair_vertex_edge(&mut self, v: usize, candidate: usize) {
        if v == INVALID || self.vertex_edge[v] == INVALID {
            return;
        }
        if self.half_edges[self.vertex_edge[v]].face != INVALID {
            return;
        }
        self.vertex_edge[v] = if candidate != INVALID && self.half_edges[candidate].face != INVALID {
            candidate
        } else {
            self.find_valid_outgoing(v)
        };
    }

    /// Collapse edge (v1, v2), merging v2 into v1 at new_pos.
    /// Returns true on success.
    fn collapse_edge(&mut self, v1: usize, v2: usize, new_pos: Point3f) -> bool {
        let h = match self.find_half_edge(v1, v2) {
            Some(h) => h,
            None => return false,
        };

        let h_twin = self.half_edges[h].twin;
        let h_next = self.half_edges[h].next;
        let h_prev = self.half_edges[h].prev;
        let face_a = self.half_edges[h].face;
        let h_next_twin = self.half_edges[h_next].twin;
        let h_prev_twin = self.half_edges[h_prev].twin;
        let c = self.half_edges[h_next].target;

        let (face_b, ht_next, ht_prev, ht_next_twin, ht_prev_twin, d) = if h_twin != INVALID {
            let hn = self.half_edges[h_twin].next;
            let hp = self.half_edges[h_twin].prev;
            (
                self.half_edges[h_twin].face,
                hn,
                hp,
                self.half_edges[hn].twin,
                self.half_edges[hp].twin,
                self.half_edges[hn].target,
            )
        } else {
            (INVALID, INVALID, INVALID, INVALID, INVALID, INVALID)
        };

        // Collect v2 outgoing edges BEFORE any modifications
        let v2_outgoing = self.outgoing_half_edges(v2);

        // Re-pair twins for face A border edges
        if h_next_twin != INVALID {
            self.half_edges[h_next_twin].twin = h_prev_twin;
        }
        if h_prev_twin != INVALID {
            self.half_edges[h_prev_twin].twin = h_next_twin;
        }

        // Mark face A as removed
        for he in [h, h_next, h_prev] {
            self.half_edges[he].face = INVALID;
            self.half_edges[he].twin = INVALID;
        }
        self.face_edge[face_a] = INVALID;

        // Handle face B
        if face_b != INVALID {
            if ht_next_twin != INVALID {
                self.half_edges[ht_next_twin].twin = ht_prev_twin;
            }
            if ht_prev_twin != INVALID {
                self.half_edges[ht_prev_twin].twin = ht_next_twin;
            }
            for he in [h_twin, ht_next, ht_prev] {
                self.half_edges[he].face = INVALID;
                self.half_edges[he].twin = INVALID;
            }
            self.face_edge[face_b] = INVALID;
        }

        // Redirect all v2 references to v1
        for &he in &v2_outgoing {
            let prev = self.half_edges[he].prev;
            self.half_edges[prev].target = v1;

            let twin = self.half_edges[he].twin;
            if twin != INVALID && self.half_edges[twin].face != INVALID {
                self.half_edges[twin].target = v1;
            }
        }

        // v1 inherits v2's fan when its own outgoing edges all died
        let v2_survivor = v2_outgoing
            .iter()
            .copied()
            .find(|&he| self.half_edges[he].face != INVALID)
            .unwrap_or(INVALID);
        let v1_candidate = if h_prev_twin != INVALID { h_prev_twin } else { v2_survivor };
        self.repair_vertex_edge(v1, v1_candidate);
        self.repair_vertex_edge(c, h_next_twin);
        if d != c {
            self.repair_vertex_edge(d, ht_next_twin);
        }

        // Mark v2 as removed
        self.vertex_edge[v2] = INVALID;
        self.vertex_removed[v2] = true;
        self.active_vertex_count -= 1;

        // Vertices left without any face drop out of the mesh
        for v in [v1, c, d] {
            if v != INVALID && !self.vertex_removed[v] && self.vertex_edge[v] == INVALID {
                self.vertex_removed[v] = true;
                self.active_vertex_count -= 1;
            }
        }

        // Update position and quadric for v1
        let v2_quadric = self.quadrics[v2];
        self.positions[v1] = new_pos;
        self.quadrics[v1] += v2_quadric;

        // Interpolate normals
        if let Some(ref mut normals) = self.normals {
            let avg = (normals[v1] + normals[v2]).normalize();
            if avg.iter().all(|x| x.is_finite()) {
                normals[v1] = avg;
            }
        }

        // Interpolate colors
        if let Some(ref mut colors) = self.colors {
            let c1 = colors[v1];
            let c2 = colors[v2];
            colors[v1] = [
                ((c1[0] as u16 + c2[0] as u16) / 2) as u8,
                ((c1[1] as u16 + c2[1] as u16) / 2) as u8,
                ((c1[2] as u16 + c2[2] as u16) / 2) as u8,
            ];
        }

        true
    }

    fn to_triangle_mesh(&self) -> TriangleMesh {
        let mut old_to_new: HashMap<usize, usize> = HashMap::new();
        let mut new_positions = Vec::new();
        let mut new_normals = Vec::new();
        let mut new_colors = Vec::new();

        for i in 0..self.positions.len() {
            if !self.is_alive(i) {
                continue;
            }
            old_to_new.insert(i, new_positions.len());
            new_positions.push(self.positions[i]);
            if let Some(ref normals) = self.normals {
                new_normals.push(normals[i]);
            }
            if let Some(ref colors) = self.colors {
                new_colors.push(colors[i]);
            }
        }

        let mut new_faces = Vec::new();
        for fi in 0..self.face_edge.len() {
            if self.face_edge[fi] == INVALID {
                continue;
            }
            let [v0, v1, v2] = self.face_vertices(fi);

            if let (Some(&nv0), Some(&nv1), Some(&nv2)) =
                (old_to_new.get(&v0), old_to_new.get(&v1), old_to_new.get(&v2))
            {
                if nv0 != nv1 && nv1 != nv2 && nv2 != nv0 {
                    new_faces.push([nv0, nv1, nv2]);
                }
            }
        }

        let mut mesh = TriangleMesh::from_vertices_and_faces(new_positions, new_faces);
        if self.normals.is_some() {
            mesh.set_normals(new_normals);
        }
        if self.colors.is_some() {
            mesh.set_colors(new_colors);
        }
        mesh
    }
}

// ============================================================
// Edge Cost for Priority Queue
// ============================================================

#[derive(Debug, Clone)]
struct EdgeCost {
    v1: usize,
    v2: usize,
    cost: f64,
}

impl PartialEq for EdgeCost {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal
    }
}
impl Eq for EdgeCost {}

impl PartialOrd for EdgeCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeCost {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smallest cost first
        other.cost.total_cmp(&self.cost)
    }
}

/// Candidates are keyed by the undirected edge so re-queued edges replace
/// their stale entry instead of piling up.
type EdgeQueue = PriorityQueue<(usize, usize), EdgeCost>;

// ============================================================
// Edge Collapse Simplifier
// ============================================================

/// Edge collapse mesh simplifier using half-edge data structure and QEM.
///
/// This simplifier builds a half-edge mesh for efficient local topology
/// queries (neighbor iteration, boundary detection, link condition checks)
/// and uses quadric error metrics to prioritize edge collapses. It removes
/// vertices until the requested count is reached or no legal collapse is
/// left.
#[derive(Debug, Clone)]
pub struct EdgeCollapseSimplifier {
    /// Stop when the minimum collapse cost exceeds this threshold
    pub error_threshold: Option<f64>,
    /// Never collapse edges touching the mesh boundary
    pub preserve_boundary: bool,
    /// Extra penalty weight applied to boundary edge costs
    pub boundary_weight: f64,
}

impl Default for EdgeCollapseSimplifier {
    fn default() -> Self {
        Self {
            error_threshold: None,
            preserve_boundary: true,
            boundary_weight: DEFAULT_BOUNDARY_WEIGHT,
        }
    }
}

impl EdgeCollapseSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(
        error_threshold: Option<f64>,
        preserve_boundary: bool,
        boundary_weight: f64,
    ) -> Self {
        Self {
            error_threshold,
            preserve_boundary,
            boundary_weight,
        }
    }

    /// Cost of collapsing `(a, b)`, or `None` if boundary rules forbid it
    fn edge_candidate(&self, hem: &HalfEdgeMesh, a: usize, b: usize) -> Option<EdgeCost> {
        let touches_boundary = hem.is_boundary_vertex(a) || hem.is_boundary_vertex(b);
        if self.preserve_boundary && touches_boundary {
            return None;
        }

        let (_, mut cost) = hem.compute_collapse_cost(a, b);
        if touches_boundary {
            cost += self.boundary_weight;
        }
        Some(EdgeCost { v1: a, v2: b, cost })
    }

    /// Queue every live edge of the mesh.
    fn build_queue(&self, hem: &HalfEdgeMesh) -> EdgeQueue {
        let mut queue = PriorityQueue::new();

        for vi in 0..hem.positions.len() {
            if !hem.is_alive(vi) {
                continue;
            }
            self.push_incident_edges(hem, vi, &mut queue);
        }

        queue
    }

    /// (Re)queue the edges around `v` with their current cost.
    fn push_incident_edges(&self, hem: &HalfEdgeMesh, v: usize, queue: &mut EdgeQueue) {
        for target in hem.neighbors(v) {
            if !hem.is_alive(target) {
                continue;
            }
            let key = (v.min(target), v.max(target));
            if let Some(candidate) = self.edge_candidate(hem, v, target) {
                queue.push(key, candidate);
            } else {
                queue.remove(&key);
            }
        }
    }
}

impl MeshSimplifier for EdgeCollapseSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, target_vertex_count: usize) -> Result<TriangleMesh> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }
        mesh.validate()?;
        if !mesh.has_faces() || mesh.vertex_count() <= target_vertex_count {
            return Ok(mesh.clone());
        }

        let mut hem = HalfEdgeMesh::from_triangle_mesh(mesh);
        let mut queue = self.build_queue(&hem);
        let mut collapsed_since_rebuild = 0usize;
        let mut collapse_count = 0usize;

        while hem.active_vertex_count > target_vertex_count {
            let (_, edge_cost) = match queue.pop() {
                Some(item) => item,
                None => {
                    // Refused edges may have become legal after later collapses
                    if collapsed_since_rebuild == 0 {
                        break;
                    }
                    queue = self.build_queue(&hem);
                    collapsed_since_rebuild = 0;
                    continue;
                }
            };

            // Check error threshold
            if let Some(threshold) = self.error_threshold {
                if edge_cost.cost > threshold {
                    break;
                }
            }

            let (a, b) = (edge_cost.v1, edge_cost.v2);

            // Validate: both vertices still alive and still neighbors
            if !hem.is_alive(a) || !hem.is_alive(b) {
                continue;
            }

            // Boundary edges exist in one direction only
            let (v1, v2) = if hem.find_half_edge(a, b).is_some() {
                (a, b)
            } else if hem.find_half_edge(b, a).is_some() {
                (b, a)
            } else {
                continue;
            };

            if self.preserve_boundary
                && (hem.is_boundary_vertex(v1) || hem.is_boundary_vertex(v2))
            {
                continue;
            }

            // Check link condition to avoid non-manifold topology
            if !hem.check_link_condition(v1, v2) || hem.collapse_creates_duplicate_face(v1, v2) {
                continue;
            }

            // Recompute cost (may have changed since queuing)
            let (pos, _cost) = hem.compute_collapse_cost(v1, v2);

            if hem.collapse_edge(v1, v2, pos) {
                collapse_count += 1;
                collapsed_since_rebuild += 1;
                if hem.is_alive(v1) {
                    self.push_incident_edges(&hem, v1, &mut queue);
                }
            }
        }

        log::debug!(
            "Edge collapse: {} collapses, {} -> {} vertices (target {})",
            collapse_count,
            mesh.vertex_count(),
            hem.active_vertex_count,
            target_vertex_count
        );

        Ok(hem.to_triangle_mesh())
    }
}
