//! Scene composition, interaction and rendering for the plyview mesh viewer
//!
//! The viewer core is host-agnostic:
//! - [`Settings`]: the startup settings document
//! - [`SceneComposer`]: lights, the rotating pivot, the live mesh, the axes helper
//! - [`InteractionController`]: keyboard and pointer handling
//! - [`RenderLoop`]: per-frame rotation, orbit damping and drawing
//! - [`Viewer`]: the façade a host drives
//!
//! With the `gpu` feature, [`gpu::run`] hosts a viewer in a winit window
//! rendered with wgpu. Without it, [`HeadlessSurface`] records frames.

pub mod camera;
pub mod controller;
pub mod controls;
pub mod error;
pub mod render_loop;
pub mod scene;
pub mod settings;
pub mod state;
pub mod viewer;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use camera::*;
pub use controller::*;
pub use controls::*;
pub use error::*;
pub use render_loop::*;
pub use scene::*;
pub use settings::*;
pub use state::*;
pub use viewer::*;
