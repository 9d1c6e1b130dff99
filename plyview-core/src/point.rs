//! Point and vector types

use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// An 8-bit RGB vertex color
pub type Color3 = [u8; 3];

/// Convert a color channel stored as a float in `[0, 1]` to 8 bits
pub fn color_channel_from_f32(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Convert an 8-bit color to linear floats in `[0, 1]`
pub fn color_to_f32(color: Color3) -> [f32; 3] {
    [
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
    ]
}
