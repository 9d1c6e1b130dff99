//! Mutable viewer state shared by the controller and the render loop

use crate::camera::Camera;
use crate::controls::OrbitControls;
use crate::scene::SceneComposer;
use crate::settings::Settings;
use nalgebra::Point3;
use plyview_core::TriangleMesh;
use plyview_simplification::LodLevel;

const INITIAL_ASPECT: f32 = 16.0 / 9.0;

/// Everything that changes while the viewer runs.
///
/// Interaction handlers and the render loop both take `&mut ViewerState`;
/// the host runs them one after another on a single thread.
#[derive(Debug, Clone)]
pub struct ViewerState {
    scene: SceneComposer,
    camera: Camera,
    controls: OrbitControls,
    rotating: bool,
    rotation_speed: f32,
    current_lod: LodLevel,
    /// Normalized, full-detail mesh every LOD level is derived from
    original: Option<TriangleMesh>,
}

impl ViewerState {
    /// Build the initial state described by `settings`: rotating, axes on,
    /// full detail, no mesh yet
    pub fn new(settings: &Settings) -> Self {
        let mut scene = SceneComposer::new();
        scene.set_pivot_offset(settings.rotation.axis_offset.into());
        scene.set_pivot_yaw(settings.initial_yaw());
        scene.set_mesh_rotation(settings.mesh.initial_rotation.into());

        Self {
            scene,
            camera: Camera::from_settings(&settings.camera, INITIAL_ASPECT),
            controls: OrbitControls::new(Point3::origin()),
            rotating: true,
            rotation_speed: settings.rotation.speed,
            current_lod: LodLevel::FULL,
            original: None,
        }
    }

    pub fn scene(&self) -> &SceneComposer {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneComposer {
        &mut self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    /// Let the orbit controls move the camera; returns whether it moved
    pub fn update_controls(&mut self) -> bool {
        self.controls.update(&mut self.camera)
    }

    pub fn is_rotating(&self) -> bool {
        self.rotating
    }

    pub fn set_rotating(&mut self, rotating: bool) {
        self.rotating = rotating;
    }

    /// Yaw added per frame while rotating, in radians
    pub fn rotation_speed(&self) -> f32 {
        self.rotation_speed
    }

    pub fn axes_visible(&self) -> bool {
        self.scene.axes_visible()
    }

    pub fn current_lod(&self) -> LodLevel {
        self.current_lod
    }

    pub fn set_current_lod(&mut self, level: LodLevel) {
        self.current_lod = level;
    }

    pub fn original_mesh(&self) -> Option<&TriangleMesh> {
        self.original.as_ref()
    }

    /// Install a freshly loaded mesh at full detail and aim the orbit at the
    /// pivot
    pub fn install_mesh(&mut self, mesh: TriangleMesh) {
        self.current_lod = LodLevel::FULL;
        self.scene.compose(mesh.clone());
        self.original = Some(mesh);
        self.controls.target = Point3::from(self.scene.pivot_state().offset);
        self.update_controls();
    }

    /// Update the camera aspect; zero-height sizes are ignored
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        self.camera.set_viewport(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Vec3Setting;
    use approx::assert_relative_eq;
    use plyview_core::{Point3f, Vector3f};

    #[test]
    fn test_initial_state() {
        let mut settings = Settings::default();
        settings.rotation.axis_offset = Vec3Setting::new(0.5, 0.0, 0.0);
        settings.rotation.y_rotation = 180.0;
        settings.rotation.speed = 0.02;

        let state = ViewerState::new(&settings);
        assert!(state.is_rotating());
        assert!(state.axes_visible());
        assert!(state.current_lod().is_full_detail());
        assert!(state.original_mesh().is_none());
        assert!(state.scene().live_mesh().is_none());
        assert_eq!(state.rotation_speed(), 0.02);
        assert_eq!(state.scene().pivot_state().offset, Vector3f::new(0.5, 0.0, 0.0));
        assert_relative_eq!(state.scene().pivot_state().yaw, std::f32::consts::PI, epsilon = 1e-6);
        assert_eq!(state.camera().fov, 75.0);
    }

    #[test]
    fn test_install_mesh_targets_pivot() {
        let mut settings = Settings::default();
        settings.rotation.axis_offset = Vec3Setting::new(1.0, 0.0, 0.0);
        let mut state = ViewerState::new(&settings);
        state.set_current_lod(LodLevel::new(3).unwrap());

        state.install_mesh(TriangleMesh::from_points(vec![Point3f::origin()]));
        assert!(state.current_lod().is_full_detail());
        assert_eq!(state.controls().target, Point3f::new(1.0, 0.0, 0.0));
        assert_eq!(state.camera().target, Point3f::new(1.0, 0.0, 0.0));
        assert_eq!(state.original_mesh().map(|m| m.vertex_count()), Some(1));
    }

    #[test]
    fn test_resize() {
        let mut state = ViewerState::new(&Settings::default());
        assert!(state.resize(1000, 500));
        assert_eq!(state.camera().aspect_ratio, 2.0);
        assert!(!state.resize(1000, 0));
        assert_eq!(state.camera().aspect_ratio, 2.0);
    }
}
