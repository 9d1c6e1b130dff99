//! Keyboard and pointer handling
//!
//! | key | effect |
//! |---|---|
//! | `R` | toggle auto-rotation |
//! | `A` | toggle the axes helper |
//! | `S` | log a camera/pivot snapshot |
//! | `0`-`9` | level of detail, `0` is full detail |
//! | Left / Right | pivot X offset -0.1 / +0.1 |
//! | Up / Down | pivot yaw +5° / -5° |

use crate::scene::PivotState;
use crate::state::ViewerState;
use nalgebra::{Point3, Vector3};
use plyview_simplification::{EdgeCollapseSimplifier, LodLevel, LodReducer, MeshSimplifier};
use std::fmt;

/// Distance the pivot moves per arrow press
pub const PIVOT_STEP: f32 = 0.1;
/// Yaw change per arrow press, in degrees
pub const YAW_STEP_DEGREES: f32 = 5.0;

/// Radians of orbit per pixel of drag
const ROTATE_PER_PIXEL: f32 = 0.01;
/// Pan distance per pixel, relative to the target distance
const PAN_PER_PIXEL: f32 = 0.001;

/// A key press, already stripped of platform details
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKey {
    Char(char),
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Orbit
    Primary,
    /// Pan
    Secondary,
}

/// Pointer motion routed to the orbit controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    /// Cursor moved by `dx, dy` pixels with `button` held
    Drag { button: PointerButton, dx: f32, dy: f32 },
    /// Wheel turned; positive is away from the user
    Wheel { delta: f32 },
}

/// Camera and pivot state at the moment of a snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    pub position: Point3<f32>,
    /// XYZ Euler angles in radians
    pub rotation: Vector3<f32>,
    pub target: Point3<f32>,
    /// Degrees
    pub fov: f32,
    pub pivot_offset: Vector3<f32>,
    /// Radians
    pub pivot_yaw: f32,
}

// Rounds float noise such as -2e-7 to a clean 0.000
fn tidy(v: f32) -> f32 {
    if v.abs() < 5e-4 {
        0.0
    } else {
        v
    }
}

fn fmt_vec(x: f32, y: f32, z: f32) -> String {
    format!("({:.3}, {:.3}, {:.3})", tidy(x), tidy(y), tidy(z))
}

impl fmt::Display for CameraSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.position;
        let r = self.rotation;
        let t = self.target;
        let o = self.pivot_offset;
        writeln!(f, "camera position: {}", fmt_vec(p.x, p.y, p.z))?;
        writeln!(f, "camera rotation: {}", fmt_vec(r.x, r.y, r.z))?;
        writeln!(f, "orbit target: {}", fmt_vec(t.x, t.y, t.z))?;
        writeln!(f, "fov: {:.1}", self.fov)?;
        writeln!(f, "pivot offset: {}", fmt_vec(o.x, o.y, o.z))?;
        write!(
            f,
            "pivot yaw: {:.3} rad ({:.1} deg)",
            tidy(self.pivot_yaw),
            tidy(self.pivot_yaw).to_degrees()
        )
    }
}

/// What a handled input changed
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    RotationToggled { rotating: bool },
    AxesToggled { visible: bool },
    LodChanged { level: LodLevel, vertex_count: usize },
    PivotMoved(PivotState),
    Snapshot(CameraSnapshot),
    CameraMoved,
}

/// Maps input to mutations of [`ViewerState`]
#[derive(Debug, Clone)]
pub struct InteractionController<S = EdgeCollapseSimplifier> {
    reducer: LodReducer<S>,
}

impl InteractionController<EdgeCollapseSimplifier> {
    pub fn new() -> Self {
        Self::with_reducer(LodReducer::new())
    }
}

impl Default for InteractionController<EdgeCollapseSimplifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MeshSimplifier> InteractionController<S> {
    pub fn with_reducer(reducer: LodReducer<S>) -> Self {
        Self { reducer }
    }

    /// Apply a key press. Keys outside the mapping return `None` and leave
    /// the state untouched.
    pub fn handle_key(&self, state: &mut ViewerState, key: ViewerKey) -> Option<ControllerEvent> {
        match key {
            ViewerKey::Char(c) => match c.to_ascii_lowercase() {
                'r' => {
                    let rotating = !state.is_rotating();
                    state.set_rotating(rotating);
                    log::info!("Rotation: {}", if rotating { "ON" } else { "OFF" });
                    Some(ControllerEvent::RotationToggled { rotating })
                }
                'a' => {
                    let visible = !state.axes_visible();
                    state.scene_mut().set_axes_visible(visible);
                    log::info!("Axes: {}", if visible { "ON" } else { "OFF" });
                    Some(ControllerEvent::AxesToggled { visible })
                }
                's' => {
                    let snapshot = self.snapshot(state);
                    log::info!("Camera snapshot\n{}", snapshot);
                    Some(ControllerEvent::Snapshot(snapshot))
                }
                d => LodLevel::from_digit(d).map(|level| self.select_lod(state, level)),
            },
            ViewerKey::ArrowLeft => Some(self.nudge_offset(state, -PIVOT_STEP)),
            ViewerKey::ArrowRight => Some(self.nudge_offset(state, PIVOT_STEP)),
            ViewerKey::ArrowUp => Some(self.nudge_yaw(state, YAW_STEP_DEGREES.to_radians())),
            ViewerKey::ArrowDown => Some(self.nudge_yaw(state, -YAW_STEP_DEGREES.to_radians())),
            ViewerKey::Other => None,
        }
    }

    /// Route pointer input to the orbit controls
    pub fn handle_pointer(&self, state: &mut ViewerState, input: PointerInput) -> Option<ControllerEvent> {
        match input {
            PointerInput::Drag { button: PointerButton::Primary, dx, dy } => {
                state
                    .controls_mut()
                    .rotate(dx * ROTATE_PER_PIXEL, dy * ROTATE_PER_PIXEL);
            }
            PointerInput::Drag { button: PointerButton::Secondary, dx, dy } => {
                let camera = state.camera().clone();
                state
                    .controls_mut()
                    .pan(&camera, dx * PAN_PER_PIXEL, dy * PAN_PER_PIXEL);
            }
            PointerInput::Wheel { delta } => {
                if delta == 0.0 || !delta.is_finite() {
                    return None;
                }
                state.controls_mut().dolly(delta);
            }
        }
        Some(ControllerEvent::CameraMoved)
    }

    /// Capture the current camera and pivot
    pub fn snapshot(&self, state: &ViewerState) -> CameraSnapshot {
        let camera = state.camera();
        let pivot = state.scene().pivot_state();
        CameraSnapshot {
            position: camera.position,
            rotation: camera.rotation_euler(),
            target: state.controls().target,
            fov: camera.fov,
            pivot_offset: pivot.offset,
            pivot_yaw: pivot.yaw,
        }
    }

    fn select_lod(&self, state: &mut ViewerState, level: LodLevel) -> ControllerEvent {
        state.set_current_lod(level);
        let reduced = state
            .original_mesh()
            .map(|original| self.reducer.reduce_to_level(original, level));

        let vertex_count = match reduced {
            Some(mesh) => {
                let count = mesh.vertex_count();
                state.scene_mut().compose(mesh);
                count
            }
            None => {
                log::warn!("No mesh loaded, nothing to reduce to {}", level);
                0
            }
        };
        log::info!("LOD {}: {} vertices", level, vertex_count);
        ControllerEvent::LodChanged {
            level,
            vertex_count,
        }
    }

    fn nudge_offset(&self, state: &mut ViewerState, dx: f32) -> ControllerEvent {
        let mut offset = state.scene().pivot_state().offset;
        offset.x += dx;
        state.scene_mut().set_pivot_offset(offset);
        let pivot = state.scene().pivot_state();
        log::info!("Pivot offset x: {:.3}", pivot.offset.x);
        ControllerEvent::PivotMoved(pivot)
    }

    fn nudge_yaw(&self, state: &mut ViewerState, delta: f32) -> ControllerEvent {
        let yaw = state.scene().pivot_state().yaw + delta;
        state.scene_mut().set_pivot_yaw(yaw);
        log::info!("Pivot yaw: {:.1} deg", yaw.to_degrees());
        ControllerEvent::PivotMoved(state.scene().pivot_state())
    }
}
