//! Core data structures and traits for plyview
//! 
//! This crate provides the fundamental types shared by the loader, the
//! normalizer, the level-of-detail reducer and the viewer: triangle meshes
//! (which double as point clouds when they carry no faces), axis-aligned
//! bounding boxes, transforms and the common error type.

pub mod point;
pub mod bounds;
pub mod mesh;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use bounds::*;
pub use mesh::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4};
