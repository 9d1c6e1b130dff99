//! Camera utilities for 3D visualization

use crate::settings::CameraSettings;
use nalgebra::{Isometry3, Matrix4, Perspective3, Point3, Rotation3, Vector3};

/// Near clip plane distance
pub const DEFAULT_NEAR: f32 = 0.1;
/// Far clip plane distance
pub const DEFAULT_FAR: f32 = 1000.0;

/// A perspective camera looking from `position` at `target`
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Create a new camera
    pub fn new(
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        fov: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            position,
            target,
            up,
            fov,
            aspect_ratio,
            near,
            far,
        }
    }

    /// Place the camera as the settings document describes.
    ///
    /// The Euler rotation picks the initial viewing direction; the target
    /// sits along it at the distance of the origin.
    pub fn from_settings(settings: &CameraSettings, aspect_ratio: f32) -> Self {
        let position = Point3::new(settings.position.x, settings.position.y, settings.position.z);
        let r = settings.rotation;
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), r.x)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), r.y)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), r.z);
        let forward = rotation * -Vector3::z();
        let distance = position.coords.norm().max(1.0);
        let up = rotation * Vector3::y();

        Self::new(
            position,
            position + forward * distance,
            up,
            settings.fov,
            aspect_ratio,
            DEFAULT_NEAR,
            DEFAULT_FAR,
        )
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let perspective =
            Perspective3::new(self.aspect_ratio, self.fov.to_radians(), self.near, self.far);
        perspective.into_inner()
    }

    /// Update the aspect ratio; a zero height leaves the camera untouched
    pub fn set_viewport(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.aspect_ratio = width as f32 / height as f32;
        true
    }

    /// Camera orientation as XYZ Euler angles in radians
    pub fn rotation_euler(&self) -> Vector3<f32> {
        let view = Isometry3::look_at_rh(&self.position, &self.target, &self.up);
        let m = view.rotation.inverse().to_rotation_matrix().into_inner();

        let m13 = m[(0, 2)].clamp(-1.0, 1.0);
        let y = m13.asin();
        if m13.abs() < 0.999_999_9 {
            Vector3::new(
                (-m[(1, 2)]).atan2(m[(2, 2)]),
                y,
                (-m[(0, 1)]).atan2(m[(0, 0)]),
            )
        } else {
            Vector3::new(m[(2, 1)].atan2(m[(1, 1)]), y, 0.0)
        }
    }

    /// Distance from the camera to its target
    pub fn distance(&self) -> f32 {
        (self.position - self.target).norm()
    }

    /// Unit vector pointing to the camera's right
    pub fn right(&self) -> Vector3<f32> {
        let forward = self.target - self.position;
        let right = forward.cross(&self.up);
        let len = right.norm();
        if len > f32::EPSILON {
            right / len
        } else {
            Vector3::x()
        }
    }

    /// Unit vector pointing up in screen space
    pub fn screen_up(&self) -> Vector3<f32> {
        let forward = (self.target - self.position).normalize();
        let up = self.right().cross(&forward);
        let len = up.norm();
        if len > f32::EPSILON {
            up / len
        } else {
            Vector3::y()
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            75.0,
            16.0 / 9.0,
            DEFAULT_NEAR,
            DEFAULT_FAR,
        )
    }
}
