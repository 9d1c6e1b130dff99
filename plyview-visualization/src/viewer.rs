//! The viewer façade hosts drive

use crate::controller::{ControllerEvent, InteractionController, PointerInput, ViewerKey};
use crate::render_loop::{FrameStats, RenderLoop, RenderSurface};
use crate::settings::Settings;
use crate::state::ViewerState;
use plyview_algorithms::normalize;
use plyview_core::{Result, TriangleMesh};
use plyview_io::LoadError;
use plyview_simplification::{EdgeCollapseSimplifier, MeshSimplifier};

/// Owns the viewer state and the pieces that act on it.
///
/// A host builds one from [`Settings`], awaits [`Viewer::load`] once, then
/// forwards input and calls [`Viewer::tick`] per frame.
#[derive(Debug)]
pub struct Viewer<S = EdgeCollapseSimplifier> {
    settings: Settings,
    state: ViewerState,
    controller: InteractionController<S>,
    render_loop: RenderLoop,
}

impl Viewer<EdgeCollapseSimplifier> {
    pub fn new(settings: Settings) -> Self {
        Self::with_controller(settings, InteractionController::new())
    }
}

impl<S: MeshSimplifier> Viewer<S> {
    pub fn with_controller(settings: Settings, controller: InteractionController<S>) -> Self {
        let state = ViewerState::new(&settings);
        Self {
            settings,
            state,
            controller,
            render_loop: RenderLoop::new(),
        }
    }

    /// Load the mesh named by the settings.
    ///
    /// Returns whether a mesh is now shown. Failures are logged and leave an
    /// empty scene that still renders and responds to input.
    pub async fn load(&mut self) -> bool {
        let path = self.settings.mesh_path();
        log::info!("Loading {}", path.display());
        let result = plyview_io::load_mesh(&path).await;
        self.show_loaded(result)
    }

    /// Normalize and compose a finished load
    pub fn show_loaded(&mut self, result: std::result::Result<TriangleMesh, LoadError>) -> bool {
        let mesh = match result {
            Ok(mesh) => mesh,
            Err(e) => {
                log::error!("Error loading PLY file: {}", e);
                return false;
            }
        };

        match normalize(&mesh, self.settings.mesh.scale_factor) {
            Ok(normalized) => {
                log::info!(
                    "Showing {} vertices, {} faces (scale {:.4})",
                    normalized.mesh.vertex_count(),
                    normalized.mesh.face_count(),
                    normalized.scale
                );
                let mut mesh = normalized.mesh;
                mesh.compute_vertex_normals();
                self.state.install_mesh(mesh);
                true
            }
            Err(e) => {
                log::error!("Cannot display mesh: {}", e);
                false
            }
        }
    }

    pub fn handle_key(&mut self, key: ViewerKey) -> Option<ControllerEvent> {
        self.controller.handle_key(&mut self.state, key)
    }

    pub fn handle_pointer(&mut self, input: PointerInput) -> Option<ControllerEvent> {
        self.controller.handle_pointer(&mut self.state, input)
    }

    /// Update the camera aspect. Zero heights are ignored; repeated calls
    /// with the same size are harmless.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        self.state.resize(width, height)
    }

    /// Advance and draw one frame
    pub fn tick<R: RenderSurface + ?Sized>(&mut self, dt: f32, surface: &mut R) -> Result<()> {
        self.render_loop.tick(&mut self.state, dt, surface)
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ViewerState {
        &mut self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> FrameStats {
        self.render_loop.stats()
    }
}
