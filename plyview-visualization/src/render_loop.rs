//! Per-frame driver
//!
//! The host owns the schedule (a winit redraw, a headless loop, a test) and
//! calls [`RenderLoop::tick`] once per frame.

use crate::scene::{AxesHelper, Light, MaterialParams};
use crate::state::ViewerState;
use nalgebra::{Matrix4, Point3};
use plyview_core::{Result, TriangleMesh};

/// Everything a surface needs to draw one frame
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub index: u64,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub camera_position: Point3<f32>,
    pub model: Matrix4<f32>,
    pub mesh: Option<&'a TriangleMesh>,
    pub mesh_generation: u64,
    pub material: MaterialParams,
    pub lights: &'a [Light],
    /// `None` when the helper is hidden
    pub axes: Option<AxesHelper>,
}

impl<'a> Frame<'a> {
    /// Snapshot the drawable parts of `state`
    pub fn from_state(state: &'a ViewerState, index: u64) -> Self {
        let scene = state.scene();
        let camera = state.camera();
        Self {
            index,
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
            camera_position: camera.position,
            model: scene.model_matrix(),
            mesh: scene.live_mesh(),
            mesh_generation: scene.mesh_generation(),
            material: scene.material(),
            lights: scene.lights(),
            axes: scene.axes_visible().then(|| *scene.axes()),
        }
    }
}

/// Something frames can be drawn onto
pub trait RenderSurface {
    /// Resize the backing target; zero sizes are ignored
    fn resize(&mut self, width: u32, height: u32);

    /// Draw one frame
    fn draw(&mut self, frame: &Frame<'_>) -> Result<()>;
}

/// What a [`HeadlessSurface`] remembers about a drawn frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub index: u64,
    pub model: Matrix4<f32>,
    pub camera_position: Point3<f32>,
    pub vertex_count: usize,
    pub face_count: usize,
    pub axes_visible: bool,
}

/// A surface that draws nothing. It counts frames and keeps the most recent
/// record, so memory stays flat however long it runs.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    draw_count: usize,
    last_frame: Option<FrameRecord>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            draw_count: 0,
            last_frame: None,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn last_frame(&self) -> Option<&FrameRecord> {
        self.last_frame.as_ref()
    }

    pub fn draw_count(&self) -> usize {
        self.draw_count
    }
}

impl RenderSurface for HeadlessSurface {
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    fn draw(&mut self, frame: &Frame<'_>) -> Result<()> {
        self.draw_count += 1;
        self.last_frame = Some(FrameRecord {
            index: frame.index,
            model: frame.model,
            camera_position: frame.camera_position,
            vertex_count: frame.mesh.map_or(0, TriangleMesh::vertex_count),
            face_count: frame.mesh.map_or(0, TriangleMesh::face_count),
            axes_visible: frame.axes.is_some(),
        });
        Ok(())
    }
}

/// Frame counters. Elapsed time is bookkeeping only; it never scales motion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub frames: u64,
    pub elapsed: f32,
    pub last_dt: f32,
}

impl FrameStats {
    /// Mean frames per second since the loop started
    pub fn average_fps(&self) -> f32 {
        if self.elapsed > 0.0 {
            self.frames as f32 / self.elapsed
        } else {
            0.0
        }
    }
}

/// Advances the scene by one frame per tick
#[derive(Debug, Clone, Default)]
pub struct RenderLoop {
    stats: FrameStats,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one frame: spin the pivot if rotating, let the orbit controls
    /// settle the camera, then draw exactly once.
    ///
    /// The yaw step is per frame; `dt` only feeds [`FrameStats`].
    pub fn tick<S: RenderSurface + ?Sized>(
        &mut self,
        state: &mut ViewerState,
        dt: f32,
        surface: &mut S,
    ) -> Result<()> {
        if state.is_rotating() {
            let yaw = state.scene().pivot_state().yaw + state.rotation_speed();
            state.scene_mut().set_pivot_yaw(yaw);
        }
        state.update_controls();

        let frame = Frame::from_state(state, self.stats.frames);
        self.stats.frames += 1;
        if dt.is_finite() && dt > 0.0 {
            self.stats.elapsed += dt;
            self.stats.last_dt = dt;
        }
        surface.draw(&frame)
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}
