//! wgpu mesh renderer

use crate::render_loop::{Frame, RenderSurface};
use crate::scene::{AxesHelper, LightKind};
use bytemuck::{Pod, Zeroable};
use nalgebra::Vector3;
use plyview_core::{color_to_f32, Error, Result, TriangleMesh};
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const DEFAULT_COLOR: [f32; 3] = [0.8, 0.8, 0.8];

/// Vertex layout shared by the mesh, point and axes pipelines
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl MeshVertex {
    /// Vertex buffer layout descriptor
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normal
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Color
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Per-frame uniform block, mirrored by `SceneUniform` in `mesh.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneUniform {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub ambient: [f32; 4],
    pub light_direction: [f32; 4],
    pub light_color: [f32; 4],
    pub material: [f32; 4],
}

impl SceneUniform {
    pub fn from_frame(frame: &Frame<'_>) -> Self {
        let mut ambient = [0.0; 4];
        let mut light_direction = [0.0, 1.0, 0.0, 0.0];
        let mut light_color = [0.0; 4];

        for light in frame.lights {
            let c = light.color.map(|v| v * light.intensity);
            match light.kind {
                LightKind::Ambient => {
                    for i in 0..3 {
                        ambient[i] += c[i];
                    }
                }
                // One directional light is all the shader takes
                LightKind::Directional { position } => {
                    let dir = position
                        .try_normalize(f32::EPSILON)
                        .unwrap_or_else(Vector3::y);
                    light_direction = [dir.x, dir.y, dir.z, 0.0];
                    light_color = [c[0], c[1], c[2], 1.0];
                }
            }
        }

        let m = frame.material;
        let p = frame.camera_position;
        Self {
            view_proj: (frame.projection * frame.view).into(),
            model: frame.model.into(),
            camera_position: [p.x, p.y, p.z, 1.0],
            ambient,
            light_direction,
            light_color,
            material: [
                m.roughness,
                m.metalness,
                if m.vertex_colors { 1.0 } else { 0.0 },
                if m.flat_shading { 1.0 } else { 0.0 },
            ],
        }
    }
}

/// Interleave positions, normals and colours for upload
pub fn mesh_vertices(mesh: &TriangleMesh) -> Vec<MeshVertex> {
    mesh.vertices
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let normal = mesh
                .normals
                .as_ref()
                .and_then(|n| n.get(i))
                .map_or([0.0; 3], |n| [n.x, n.y, n.z]);
            let color = mesh
                .colors
                .as_ref()
                .and_then(|c| c.get(i))
                .map_or(DEFAULT_COLOR, |c| color_to_f32(*c));
            MeshVertex {
                position: [v.x, v.y, v.z],
                normal,
                color,
            }
        })
        .collect()
}

/// Flattened `u32` triangle indices
pub fn mesh_indices(mesh: &TriangleMesh) -> Vec<u32> {
    mesh.faces
        .iter()
        .flat_map(|f| f.iter().map(|&i| i as u32))
        .collect()
}

/// Line-list vertices for the axes helper
pub fn axes_vertices(axes: &AxesHelper) -> Vec<MeshVertex> {
    axes.segments()
        .iter()
        .flat_map(|(start, end, color)| {
            [start, end].map(|p| MeshVertex {
                position: [p.x, p.y, p.z],
                normal: [0.0; 3],
                color: *color,
            })
        })
        .collect()
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    /// `None` for point clouds
    index_buffer: Option<(wgpu::Buffer, u32)>,
}

struct GpuAxes {
    size: f32,
    vertex_buffer: wgpu::Buffer,
}

/// Device, queue and adapter for one window surface
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter: wgpu::Adapter,
}

impl GpuContext {
    /// Pick an adapter able to present to `surface`
    pub async fn for_surface(instance: &wgpu::Instance, surface: &wgpu::Surface<'_>) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| Error::Visualization("Failed to find suitable adapter".to_string()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("plyview device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| Error::Visualization(format!("Failed to create device: {}", e)))?;

        Ok(Self {
            device,
            queue,
            adapter,
        })
    }
}

/// Draws [`Frame`]s into a window
pub struct MeshRenderer {
    gpu: GpuContext,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    triangle_pipeline: wgpu::RenderPipeline,
    point_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    mesh: Option<GpuMesh>,
    uploaded_generation: Option<u64>,
    axes: Option<GpuAxes>,
    clear_color: wgpu::Color,
}

impl MeshRenderer {
    /// Create a renderer presenting to `window`
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::Visualization(format!("Failed to create surface: {}", e)))?;
        let gpu = GpuContext::for_surface(&instance, &surface).await?;

        let caps = surface.get_capabilities(&gpu.adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| Error::Visualization("Surface reports no formats".to_string()))?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &surface_config);

        let uniform_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniform Buffer"),
            size: std::mem::size_of::<SceneUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("scene_bind_group_layout"),
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("scene_bind_group"),
        });

        let shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("mesh.wgsl").into()),
        });

        let layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let triangle_pipeline = Self::create_render_pipeline(
            &gpu.device,
            &layout,
            &shader,
            format,
            wgpu::PrimitiveTopology::TriangleList,
            ("vs_main", "fs_main"),
            "Triangle",
        );
        let point_pipeline = Self::create_render_pipeline(
            &gpu.device,
            &layout,
            &shader,
            format,
            wgpu::PrimitiveTopology::PointList,
            ("vs_main", "fs_main"),
            "Point",
        );
        let line_pipeline = Self::create_render_pipeline(
            &gpu.device,
            &layout,
            &shader,
            format,
            wgpu::PrimitiveTopology::LineList,
            ("vs_axes", "fs_unlit"),
            "Axes",
        );

        let depth_view = Self::create_depth_view(&gpu.device, &surface_config);

        log::info!(
            "Renderer ready on {} ({:?})",
            gpu.adapter.get_info().name,
            format
        );

        Ok(Self {
            gpu,
            surface,
            surface_config,
            triangle_pipeline,
            point_pipeline,
            line_pipeline,
            uniform_buffer,
            bind_group,
            depth_view,
            mesh: None,
            uploaded_generation: None,
            axes: None,
            clear_color: wgpu::Color::BLACK,
        })
    }

    /// Background colour behind the scene
    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }

    fn create_render_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        topology: wgpu::PrimitiveTopology,
        (vertex_entry, fragment_entry): (&str, &str),
        label: &str,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} Render Pipeline", label)),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: vertex_entry,
                buffers: &[MeshVertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: fragment_entry,
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Scanned meshes are rarely consistently wound
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })
    }

    fn create_depth_view(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Re-upload geometry when the scene swapped its mesh
    fn sync_mesh(&mut self, frame: &Frame<'_>) {
        if self.uploaded_generation == Some(frame.mesh_generation) {
            return;
        }
        self.mesh = frame.mesh.filter(|m| !m.is_empty()).map(|mesh| {
            let vertices = mesh_vertices(mesh);
            let vertex_buffer = self.gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = mesh.has_faces().then(|| {
                let indices = mesh_indices(mesh);
                let buffer = self.gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Index Buffer"),
                    contents: bytemuck::cast_slice(&indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                (buffer, indices.len() as u32)
            });
            log::debug!("Uploaded {} vertices to the GPU", vertices.len());
            GpuMesh {
                vertex_buffer,
                vertex_count: vertices.len() as u32,
                index_buffer,
            }
        });
        self.uploaded_generation = Some(frame.mesh_generation);
    }

    fn sync_axes(&mut self, axes: &AxesHelper) {
        if self.axes.as_ref().is_some_and(|a| a.size == axes.size) {
            return;
        }
        let vertex_buffer = self.gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Axes Vertex Buffer"),
            contents: bytemuck::cast_slice(&axes_vertices(axes)),
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.axes = Some(GpuAxes {
            size: axes.size,
            vertex_buffer,
        });
    }

    fn acquire(&mut self) -> Result<Option<wgpu::SurfaceTexture>> {
        match self.surface.get_current_texture() {
            Ok(texture) => Ok(Some(texture)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost, reconfiguring");
                self.surface.configure(&self.gpu.device, &self.surface_config);
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out waiting for a surface texture");
                Ok(None)
            }
            Err(e) => Err(Error::Visualization(format!(
                "Failed to get surface texture: {}",
                e
            ))),
        }
    }
}

impl RenderSurface for MeshRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.surface_config.width = width;
            self.surface_config.height = height;
            self.surface.configure(&self.gpu.device, &self.surface_config);
            self.depth_view = Self::create_depth_view(&self.gpu.device, &self.surface_config);
        }
    }

    fn draw(&mut self, frame: &Frame<'_>) -> Result<()> {
        self.sync_mesh(frame);
        if let Some(axes) = &frame.axes {
            self.sync_axes(axes);
        }

        let uniform = SceneUniform::from_frame(frame);
        self.gpu
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let Some(output) = self.acquire()? else {
            return Ok(());
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Mesh Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mesh Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_bind_group(0, &self.bind_group, &[]);

            if let Some(mesh) = &self.mesh {
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                match &mesh.index_buffer {
                    Some((indices, count)) => {
                        render_pass.set_pipeline(&self.triangle_pipeline);
                        render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..*count, 0, 0..1);
                    }
                    None => {
                        render_pass.set_pipeline(&self.point_pipeline);
                        render_pass.draw(0..mesh.vertex_count, 0..1);
                    }
                }
            }

            if let (Some(_), Some(axes)) = (&frame.axes, &self.axes) {
                render_pass.set_pipeline(&self.line_pipeline);
                render_pass.set_vertex_buffer(0, axes.vertex_buffer.slice(..));
                render_pass.draw(0..6, 0..1);
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::state::ViewerState;
    use plyview_core::{Point3f, Vector3f};

    #[test]
    fn test_vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 36);
        assert_eq!(MeshVertex::desc().array_stride, 36);
        assert_eq!(std::mem::size_of::<SceneUniform>(), 208);
    }

    #[test]
    fn test_mesh_vertices_fill_missing_attributes() {
        let mut mesh = TriangleMesh::from_points(vec![Point3f::new(1.0, 2.0, 3.0)]);
        let vertices = mesh_vertices(&mesh);
        assert_eq!(vertices[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(vertices[0].normal, [0.0; 3]);
        assert_eq!(vertices[0].color, DEFAULT_COLOR);

        mesh.set_colors(vec![[255, 0, 0]]);
        mesh.set_normals(vec![Vector3f::z()]);
        let vertices = mesh_vertices(&mesh);
        assert_eq!(vertices[0].color, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_mesh_indices_flatten_faces() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![Point3f::origin(); 4],
            vec![[0, 1, 2], [2, 1, 3]],
        );
        assert_eq!(mesh_indices(&mesh), vec![0, 1, 2, 2, 1, 3]);
    }

    #[test]
    fn test_axes_vertices() {
        let vertices = axes_vertices(&AxesHelper::default());
        assert_eq!(vertices.len(), 6);
        assert_eq!(vertices[1].position, [AxesHelper::DEFAULT_SIZE, 0.0, 0.0]);
        assert_eq!(vertices[5].color, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_uniform_from_frame() {
        let state = ViewerState::new(&Settings::default());
        let frame = Frame::from_state(&state, 0);
        let uniform = SceneUniform::from_frame(&frame);

        assert_eq!(uniform.ambient, [1.0, 1.0, 1.0, 0.0]);
        assert_eq!(uniform.light_color, [0.5, 0.5, 0.5, 1.0]);
        let d = uniform.light_direction;
        let expected = 1.0 / 3.0_f32.sqrt();
        assert!((d[0] - expected).abs() < 1e-6 && (d[1] - expected).abs() < 1e-6);
        assert_eq!(uniform.material, [0.5, 0.0, 1.0, 0.0]);
        let model: [[f32; 4]; 4] = frame.model.into();
        assert_eq!(uniform.model, model);
    }
}
