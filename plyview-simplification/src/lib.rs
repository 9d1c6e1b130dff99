//! Mesh simplification and decimation algorithms
//! 
//! This crate provides the level-of-detail reduction used by the viewer:
//! - Edge collapse decimation driven by quadric error metrics
//! - Uniform-grid vertex clustering, also usable on point clouds
//! - [`LodReducer`], which combines the two behind a never-failing API

mod quadric;
pub mod edge_collapse;
pub mod clustering;
pub mod lod;

pub use edge_collapse::*;
pub use clustering::*;
pub use lod::*;

use plyview_core::{TriangleMesh, Result};

/// Reduce the vertex count of a mesh
pub trait MeshSimplifier {
    /// Simplify `mesh` towards at most `target_vertex_count` vertices.
    ///
    /// Implementations may stop above the target when they cannot simplify
    /// further; callers needing a hard bound must check the result.
    fn simplify(&self, mesh: &TriangleMesh, target_vertex_count: usize) -> Result<TriangleMesh>;
}
