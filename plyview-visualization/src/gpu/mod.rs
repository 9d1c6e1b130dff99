//! Windowed rendering with wgpu and winit

pub mod renderer;
pub mod window;

pub use renderer::{GpuContext, MeshRenderer, MeshVertex, SceneUniform};
pub use window::{map_key, run};
