//! # plyview Algorithms
//!
//! Geometry processing applied to a freshly loaded asset before it is shown.
//!
//! Currently this is mesh normalization: centering on the bounding box and
//! uniform scaling to a target size.

pub mod normalize;

// Re-export commonly used items
pub use normalize::*;
