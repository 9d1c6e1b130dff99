//! Orbit camera controls with damping
//!
//! Pointer input accumulates into pending deltas; `update` releases a
//! fraction of them into the camera each frame, so motion eases out after
//! the pointer stops.

use crate::camera::Camera;
use nalgebra::{Point3, Vector3};
use std::f32::consts::PI;

/// Fraction of the pending motion applied per update
pub const DEFAULT_DAMPING_FACTOR: f32 = 0.05;

const POLAR_EPSILON: f32 = 1e-6;
const MOTION_EPSILON: f32 = 1e-6;

/// Rotates, pans and dollies a camera around a target point
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Pending azimuth change in radians
    theta_delta: f32,
    /// Pending polar change in radians
    phi_delta: f32,
    pan_offset: Vector3<f32>,
    scale: f32,
}

impl OrbitControls {
    /// Create controls orbiting around `target`
    pub fn new(target: Point3<f32>) -> Self {
        Self {
            target,
            enable_damping: true,
            damping_factor: DEFAULT_DAMPING_FACTOR,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            theta_delta: 0.0,
            phi_delta: 0.0,
            pan_offset: Vector3::zeros(),
            scale: 1.0,
        }
    }

    /// Queue a rotation. Positive `horizontal` swings the camera left,
    /// positive `vertical` tilts it up over the target.
    pub fn rotate(&mut self, horizontal: f32, vertical: f32) {
        self.theta_delta -= horizontal * self.rotate_speed;
        self.phi_delta -= vertical * self.rotate_speed;
    }

    /// Queue a pan in the camera's screen plane, scaled by the distance to
    /// the target
    pub fn pan(&mut self, camera: &Camera, horizontal: f32, vertical: f32) {
        let distance = camera.distance();
        let step = distance * self.pan_speed;
        self.pan_offset += camera.right() * (-horizontal * step) + camera.screen_up() * (vertical * step);
    }

    /// Dolly towards (positive steps) or away from the target
    pub fn dolly(&mut self, steps: f32) {
        let zoom = 0.95_f32.powf(self.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.scale *= zoom;
        } else if steps < 0.0 {
            self.scale /= zoom;
        }
    }

    /// Whether any motion is still waiting to be applied
    pub fn is_settled(&self) -> bool {
        self.theta_delta.abs() < MOTION_EPSILON
            && self.phi_delta.abs() < MOTION_EPSILON
            && self.pan_offset.norm() < MOTION_EPSILON
            && (self.scale - 1.0).abs() < MOTION_EPSILON
    }

    /// Drop all pending motion
    pub fn stop(&mut self) {
        self.theta_delta = 0.0;
        self.phi_delta = 0.0;
        self.pan_offset = Vector3::zeros();
        self.scale = 1.0;
    }

    /// Apply pending motion to the camera and aim it at the target.
    ///
    /// Returns `true` when the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.position - self.target;
        let mut radius = offset.norm();
        let (mut theta, mut phi) = if radius > f32::EPSILON {
            (offset.x.atan2(offset.z), (offset.y / radius).clamp(-1.0, 1.0).acos())
        } else {
            (0.0, PI / 2.0)
        };

        let factor = if self.enable_damping { self.damping_factor } else { 1.0 };
        theta += self.theta_delta * factor;
        phi += self.phi_delta * factor;
        phi = phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
        self.target += self.pan_offset * factor;

        let sin_phi = phi.sin();
        let new_offset = Vector3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );

        let old_position = camera.position;
        let old_target = camera.target;
        camera.position = self.target + new_offset;
        camera.target = self.target;
        camera.up = Vector3::y();

        if self.enable_damping {
            let retain = 1.0 - self.damping_factor;
            self.theta_delta *= retain;
            self.phi_delta *= retain;
            self.pan_offset *= retain;
        } else {
            self.theta_delta = 0.0;
            self.phi_delta = 0.0;
            self.pan_offset = Vector3::zeros();
        }
        self.scale = 1.0;

        (camera.position - old_position).norm_squared() > MOTION_EPSILON
            || (camera.target - old_target).norm_squared() > MOTION_EPSILON
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(Point3::origin())
    }
}
