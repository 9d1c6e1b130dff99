//! Scene composition: lights, the rotating pivot, the live mesh and the axes
//! helper

use nalgebra::{Matrix4, Point3};
use plyview_core::{Transform3D, TriangleMesh, Vector3f};

/// Kind of light source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    /// Parallel light shining from `position` towards the origin
    Directional { position: Vector3f },
}

/// A light in the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Light {
    pub fn ambient(color: [f32; 3], intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            color,
            intensity,
        }
    }

    pub fn directional(position: Vector3f, color: [f32; 3], intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional { position },
            color,
            intensity,
        }
    }
}

/// Surface parameters shared by every mesh the viewer shows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    pub vertex_colors: bool,
    pub flat_shading: bool,
    pub roughness: f32,
    pub metalness: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            vertex_colors: true,
            flat_shading: false,
            roughness: 0.5,
            metalness: 0.0,
        }
    }
}

/// Position and yaw of the pivot the mesh hangs from
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PivotState {
    pub offset: Vector3f,
    /// Rotation about +Y in radians
    pub yaw: f32,
}

/// The transform node every mesh is nested under
#[derive(Debug, Clone, Default)]
pub struct ScenePivot {
    state: PivotState,
}

impl ScenePivot {
    pub fn new(offset: Vector3f, yaw: f32) -> Self {
        Self {
            state: PivotState { offset, yaw },
        }
    }

    pub fn state(&self) -> PivotState {
        self.state
    }

    /// Translation then yaw
    pub fn transform(&self) -> Transform3D {
        Transform3D::translation(self.state.offset) * Transform3D::rotation_y(self.state.yaw)
    }
}

/// Three coloured line segments along +X, +Y and +Z
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxesHelper {
    pub size: f32,
    pub visible: bool,
}

impl AxesHelper {
    pub const DEFAULT_SIZE: f32 = 5.0;

    /// Segments as `(start, end, color)`, X red, Y green, Z blue
    pub fn segments(&self) -> [(Point3<f32>, Point3<f32>, [f32; 3]); 3] {
        let s = self.size;
        [
            (Point3::origin(), Point3::new(s, 0.0, 0.0), [1.0, 0.0, 0.0]),
            (Point3::origin(), Point3::new(0.0, s, 0.0), [0.0, 1.0, 0.0]),
            (Point3::origin(), Point3::new(0.0, 0.0, s), [0.0, 0.0, 1.0]),
        ]
    }
}

impl Default for AxesHelper {
    fn default() -> Self {
        Self {
            size: Self::DEFAULT_SIZE,
            visible: true,
        }
    }
}

/// Owns everything that gets drawn.
///
/// At most one mesh is live at a time; composing a new one detaches the
/// previous one first.
#[derive(Debug, Clone)]
pub struct SceneComposer {
    lights: Vec<Light>,
    pivot: ScenePivot,
    live_mesh: Option<TriangleMesh>,
    mesh_rotation: Vector3f,
    axes: AxesHelper,
    material: MaterialParams,
    generation: u64,
}

impl SceneComposer {
    pub fn new() -> Self {
        Self {
            lights: vec![
                Light::ambient([1.0, 1.0, 1.0], 1.0),
                Light::directional(Vector3f::new(1.0, 1.0, 1.0), [1.0, 1.0, 1.0], 0.5),
            ],
            pivot: ScenePivot::default(),
            live_mesh: None,
            mesh_rotation: Vector3f::zeros(),
            axes: AxesHelper::default(),
            material: MaterialParams::default(),
            generation: 0,
        }
    }

    /// Attach `mesh` under the pivot, replacing whatever was there
    pub fn compose(&mut self, mesh: TriangleMesh) {
        self.clear_mesh();
        log::debug!(
            "Composing mesh with {} vertices and {} faces",
            mesh.vertex_count(),
            mesh.face_count()
        );
        self.live_mesh = Some(mesh);
        self.generation += 1;
    }

    /// Detach the live mesh, leaving lights, pivot and axes in place
    pub fn clear_mesh(&mut self) {
        if self.live_mesh.take().is_some() {
            self.generation += 1;
        }
    }

    pub fn live_mesh(&self) -> Option<&TriangleMesh> {
        self.live_mesh.as_ref()
    }

    /// Bumped on every attach or detach; renderers use it to know when to
    /// re-upload geometry
    pub fn mesh_generation(&self) -> u64 {
        self.generation
    }

    pub fn set_pivot_offset(&mut self, offset: Vector3f) {
        self.pivot.state.offset = offset;
    }

    pub fn set_pivot_yaw(&mut self, yaw: f32) {
        self.pivot.state.yaw = yaw;
    }

    pub fn pivot_state(&self) -> PivotState {
        self.pivot.state()
    }

    pub fn pivot(&self) -> &ScenePivot {
        &self.pivot
    }

    /// Euler rotation (XYZ, radians) of the mesh inside the pivot
    pub fn set_mesh_rotation(&mut self, euler: Vector3f) {
        self.mesh_rotation = euler;
    }

    pub fn mesh_rotation(&self) -> Vector3f {
        self.mesh_rotation
    }

    pub fn set_axes_visible(&mut self, visible: bool) {
        self.axes.visible = visible;
    }

    pub fn axes_visible(&self) -> bool {
        self.axes.visible
    }

    pub fn axes(&self) -> &AxesHelper {
        &self.axes
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn material(&self) -> MaterialParams {
        self.material
    }

    /// World transform of the live mesh: pivot translation, pivot yaw, then
    /// the mesh's own rotation
    pub fn model_matrix(&self) -> Matrix4<f32> {
        (self.pivot.transform() * Transform3D::from_euler_xyz(self.mesh_rotation)).matrix
    }
}

impl Default for SceneComposer {
    fn default() -> Self {
        Self::new()
    }
}
