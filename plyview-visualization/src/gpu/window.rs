//! winit host: one window, one viewer

use super::renderer::MeshRenderer;
use crate::controller::{PointerButton, PointerInput, ViewerKey};
use crate::render_loop::RenderSurface;
use crate::viewer::Viewer;
use plyview_core::{Error, Result};
use plyview_simplification::MeshSimplifier;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

/// Translate a winit key into the viewer's key set
pub fn map_key(key: &Key) -> ViewerKey {
    match key {
        Key::Character(text) => text.chars().next().map_or(ViewerKey::Other, ViewerKey::Char),
        Key::Named(NamedKey::ArrowLeft) => ViewerKey::ArrowLeft,
        Key::Named(NamedKey::ArrowRight) => ViewerKey::ArrowRight,
        Key::Named(NamedKey::ArrowUp) => ViewerKey::ArrowUp,
        Key::Named(NamedKey::ArrowDown) => ViewerKey::ArrowDown,
        _ => ViewerKey::Other,
    }
}

/// Turns button and cursor events into drags
#[derive(Debug, Default)]
struct PointerTracker {
    last_position: Option<(f64, f64)>,
    left_pressed: bool,
    right_pressed: bool,
}

impl PointerTracker {
    fn set_button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.left_pressed = pressed,
            MouseButton::Right => self.right_pressed = pressed,
            _ => {}
        }
    }

    fn moved(&mut self, x: f64, y: f64) -> Option<PointerInput> {
        let last = self.last_position.replace((x, y))?;
        let (dx, dy) = ((x - last.0) as f32, (y - last.1) as f32);
        let button = if self.left_pressed {
            PointerButton::Primary
        } else if self.right_pressed {
            PointerButton::Secondary
        } else {
            return None;
        };
        Some(PointerInput::Drag { button, dx, dy })
    }
}

/// Open a window and run `viewer` until it is closed
pub fn run<S: MeshSimplifier + 'static>(mut viewer: Viewer<S>, title: &str) -> Result<()> {
    let event_loop = EventLoop::new()
        .map_err(|e| Error::Visualization(format!("Failed to create event loop: {}", e)))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(title)
            .with_inner_size(LogicalSize::new(1200.0, 800.0))
            .build(&event_loop)
            .map_err(|e| Error::Visualization(format!("Failed to create window: {}", e)))?,
    );

    let mut renderer = pollster::block_on(MeshRenderer::new(window.clone()))?;
    let size = window.inner_size();
    viewer.resize(size.width, size.height);

    let mut pointer = PointerTracker::default();
    let mut last_frame = Instant::now();

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
                    WindowEvent::CloseRequested => target.exit(),
                    WindowEvent::Resized(size) => {
                        viewer.resize(size.width, size.height);
                        renderer.resize(size.width, size.height);
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        pointer.set_button(button, state == ElementState::Pressed);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        if let Some(input) = pointer.moved(position.x, position.y) {
                            viewer.handle_pointer(input);
                        }
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        let lines = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                        };
                        viewer.handle_pointer(PointerInput::Wheel { delta: lines });
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state == ElementState::Pressed {
                            viewer.handle_key(map_key(&event.logical_key));
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let dt = now.duration_since(last_frame).as_secs_f32();
                        last_frame = now;
                        if let Err(e) = viewer.tick(dt, &mut renderer) {
                            log::error!("Rendering failed: {}", e);
                            target.exit();
                        }
                    }
                    _ => {}
                },
                Event::AboutToWait => window.request_redraw(),
                _ => {}
            }
        })
        .map_err(|e| Error::Visualization(format!("Event loop error: {}", e)))
}
