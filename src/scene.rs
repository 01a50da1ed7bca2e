//! # Scene Module
//!
//! The `scene` module owns every GPU resource needed to draw the Cornell box and records the
//! per-frame render pass.
//!
//! ## Overview
//!
//! [`SceneResources`] is built once from a [`Mesh`], a [`ShaderDescriptor`] and the surface
//! format, and rebuilt from scratch after the GPU device is lost. It holds:
//!
//! - **Vertex and index buffers**: uploaded once; the mesh never changes.
//! - **Uniform binding**: the ring of per-frame uniform buffers and their bind groups.
//! - **Render pipeline**: triangle list, counter-clockwise front faces, back faces culled, depth
//!   test `Less` with depth writes.
//! - **Depth attachment**: a `Depth32Float` texture matching the surface size.
//!
//! ## Initialization
//!
//! Resources are created in a fixed order and construction stops at the first failure:
//!
//! 1. vertex buffer
//! 2. index buffer
//! 3. uniform storage (bind group layout and buffers)
//! 4. shader program
//! 5. render pipeline
//! 6. depth attachment
//! 7. uniform bind groups
//!
//! `wgpu` reports creation errors asynchronously through error scopes instead of return values,
//! so each step runs inside its own validation and out-of-memory scope. A captured error is
//! returned as [`RenderError::ResourceCreation`] naming the step; nothing is retried.
//!
//! ## Per-frame Work
//!
//! [`SceneResources::update_uniforms`] writes the frame's [`FrameUniforms`] into the current
//! ring slot, then [`SceneResources::record_and_submit_frame`] acquires the surface image,
//! draws the mesh with one indexed draw call, submits, presents, and advances the ring.

use wgpu::util::DeviceExt;

use crate::error::{FrameError, RenderError, Result};
use crate::gpu::{clamp_size, Gpu};
use crate::mesh::Mesh;
use crate::settings::RenderSettings;
use crate::shader::{ShaderDescriptor, ShaderProgram};
use crate::uniform_binding::UniformBinding;
use crate::uniform_buffer::FrameUniforms;
use crate::vertex::Vertex;

/// GPU resources and pipeline state for drawing the scene mesh.
pub struct SceneResources {
    /// The mesh vertices, uploaded once at creation.
    vertex_buffer: wgpu::Buffer,

    /// The mesh indices as `u16`, uploaded once at creation.
    index_buffer: wgpu::Buffer,

    /// Number of indices drawn every frame.
    index_count: u32,

    /// Per-frame uniform storage.
    uniform: UniformBinding,

    pipeline: wgpu::RenderPipeline,

    /// Depth attachment matching the surface size. Recreated on resize.
    depth_texture_view: wgpu::TextureView,

    /// Background color of every frame.
    clear_color: wgpu::Color,
}

impl SceneResources {
    /// Format of the depth attachment.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Creates all GPU resources for `mesh`.
    ///
    /// # Parameters
    ///
    /// - `device`: The device that owns the resources.
    /// - `surface_format`: The color format the pipeline renders to.
    /// - `width`, `height`: Initial size of the depth attachment, in pixels.
    /// - `mesh`: The geometry to upload.
    /// - `shader`: The shading program to compile.
    /// - `settings`: Clear color and the number of frames in flight.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ResourceCreation`] for the first step that fails.
    pub async fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        mesh: &Mesh,
        shader: &ShaderDescriptor,
        settings: &RenderSettings,
    ) -> Result<Self> {
        validate_mesh(mesh)?;

        let vertex_buffer = scoped(device, "vertex buffer", || {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: mesh.vertex_bytes(),
                usage: wgpu::BufferUsages::VERTEX,
            })
        })
        .await?;

        let index_buffer = scoped(device, "index buffer", || {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: mesh.index_bytes(),
                usage: wgpu::BufferUsages::INDEX,
            })
        })
        .await?;

        let (bind_group_layout, uniform_buffers) = scoped(device, "uniform storage", || {
            (
                UniformBinding::create_layout(device),
                UniformBinding::create_buffers(device, settings.frames_in_flight),
            )
        })
        .await?;

        let program = scoped(device, "shader program", || {
            ShaderProgram::compile(device, shader)
        })
        .await?;

        let pipeline = scoped(device, "render pipeline", || {
            Self::create_pipeline(device, surface_format, &bind_group_layout, &program)
        })
        .await?;

        let depth_texture_view = scoped(device, "depth attachment", || {
            Self::create_depth_texture(device, width, height)
        })
        .await?;

        let uniform = scoped(device, "uniform bind groups", || {
            UniformBinding::new(device, bind_group_layout, uniform_buffers)
        })
        .await?;

        log::info!(
            "Scene resources ready: {} vertices, {} indices, {} uniform slots",
            mesh.vertex_count(),
            mesh.index_count(),
            uniform.frames_in_flight()
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            uniform,
            pipeline,
            depth_texture_view,
            clear_color: settings.clear_color,
        })
    }

    /// Recreates the depth attachment for a new surface size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture_view = Self::create_depth_texture(device, width, height);
    }

    /// Writes this frame's uniforms into the current ring slot.
    pub fn update_uniforms(
        &mut self,
        queue: &wgpu::Queue,
        device: &wgpu::Device,
        uniforms: &FrameUniforms,
    ) {
        self.uniform.update_buffer(device, queue, uniforms);
    }

    /// Records the render pass for one frame, submits it and presents the surface image.
    ///
    /// # Errors
    ///
    /// - [`FrameError::DeviceLost`] if the device was lost since the previous frame.
    /// - [`FrameError::Skipped`] if no surface image could be acquired. A lost or outdated
    ///   surface is reconfigured first so the next frame can succeed.
    /// - [`FrameError::Fatal`] with [`RenderError::OutOfMemory`] if the surface ran out of
    ///   memory.
    pub fn record_and_submit_frame(&mut self, gpu: &Gpu) -> std::result::Result<(), FrameError> {
        if gpu.take_device_lost() {
            return Err(FrameError::DeviceLost);
        }

        let surface_texture = match gpu.surface.get_current_texture() {
            Ok(surface_texture) => surface_texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.reconfigure();
                return Err(FrameError::Skipped("surface lost or outdated"));
            }
            Err(wgpu::SurfaceError::Timeout) => {
                return Err(FrameError::Skipped("timed out acquiring the surface image"));
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(FrameError::Fatal(RenderError::OutOfMemory));
            }
            Err(wgpu::SurfaceError::Other) => {
                return Err(FrameError::Skipped("surface error"));
            }
        };

        let surface_texture_view =
            surface_texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor {
                    label: wgpu::Label::default(),
                    aspect: wgpu::TextureAspect::default(),
                    format: Some(gpu.surface_format),
                    dimension: None,
                    base_mip_level: 0,
                    mip_level_count: None,
                    base_array_layer: 0,
                    array_layer_count: None,
                    usage: None,
                });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        encoder.insert_debug_marker("Render Cornell box");
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: color_ops(self.clear_color),
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture_view,
                    depth_ops: Some(depth_ops()),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.render(&mut render_pass);
        }

        let submission = gpu.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        self.uniform.advance(submission);
        Ok(())
    }

    /// Binds the pipeline and mesh and issues the single indexed draw.
    fn render(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, self.uniform.bind_group(), &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    /// Creates a depth attachment of at least one pixel in each dimension.
    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let (width, height) = clamp_size(width, height);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Depth Texture View"),
            format: Some(Self::DEPTH_FORMAT),
            dimension: Some(wgpu::TextureViewDimension::D2),
            aspect: wgpu::TextureAspect::All,
            base_mip_level: 0,
            base_array_layer: 0,
            array_layer_count: None,
            mip_level_count: None,
            usage: None,
        })
    }

    fn create_pipeline(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        bind_group_layout: &wgpu::BindGroupLayout,
        program: &ShaderProgram,
    ) -> wgpu::RenderPipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cornell Box Pipeline Layout"),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        let vertex_attributes = Vertex::vertex_attributes();

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Cornell Box Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &program.module,
                entry_point: Some(program.vertex_entry),
                buffers: &[Vertex::description(&vertex_attributes)],
                compilation_options: Default::default(),
            },
            primitive: primitive_state(),
            depth_stencil: Some(depth_stencil_state()),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &program.module,
                entry_point: Some(program.fragment_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        })
    }
}

/// Runs one initialization step inside validation and out-of-memory error scopes.
async fn scoped<T>(
    device: &wgpu::Device,
    step: &'static str,
    create: impl FnOnce() -> T,
) -> Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    let validation = device.pop_error_scope().await;
    let out_of_memory = device.pop_error_scope().await;

    match validation.or(out_of_memory) {
        Some(error) => {
            log::error!("Failed to create {step}: {error}");
            Err(RenderError::ResourceCreation {
                step,
                message: error.to_string(),
            })
        }
        None => {
            log::debug!("Created {step}");
            Ok(value)
        }
    }
}

/// Rejects a mesh with nothing to draw.
fn validate_mesh(mesh: &Mesh) -> Result<()> {
    if mesh.vertex_count() == 0 || mesh.index_count() == 0 {
        return Err(RenderError::ResourceCreation {
            step: "vertex buffer",
            message: "the mesh is empty".to_string(),
        });
    }
    Ok(())
}

/// Triangle list with counter-clockwise front faces; back faces are culled.
fn primitive_state() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: Some(wgpu::Face::Back),
        polygon_mode: wgpu::PolygonMode::Fill,
        conservative: false,
        unclipped_depth: false,
    }
}

/// Nearer fragments win and write their depth.
fn depth_stencil_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: SceneResources::DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

fn color_ops(clear_color: wgpu::Color) -> wgpu::Operations<wgpu::Color> {
    wgpu::Operations {
        load: wgpu::LoadOp::Clear(clear_color),
        store: wgpu::StoreOp::Store,
    }
}

/// Clears depth to the far plane every frame.
fn depth_ops() -> wgpu::Operations<f32> {
    wgpu::Operations {
        load: wgpu::LoadOp::Clear(1.0),
        store: wgpu::StoreOp::Store,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_cornell_box;

    #[test]
    fn pipeline_culls_back_faces_of_counter_clockwise_triangles() {
        let primitive = primitive_state();
        assert_eq!(primitive.topology, wgpu::PrimitiveTopology::TriangleList);
        assert_eq!(primitive.strip_index_format, None);
        assert_eq!(primitive.front_face, wgpu::FrontFace::Ccw);
        assert_eq!(primitive.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(primitive.polygon_mode, wgpu::PolygonMode::Fill);
    }

    #[test]
    fn depth_test_keeps_nearer_fragments() {
        let depth = depth_stencil_state();
        assert_eq!(depth.format, wgpu::TextureFormat::Depth32Float);
        assert!(depth.depth_write_enabled);
        assert_eq!(depth.depth_compare, wgpu::CompareFunction::Less);
        assert!(!depth.stencil.is_enabled());
    }

    #[test]
    fn empty_mesh_is_rejected_before_any_upload() {
        match validate_mesh(&Mesh::default()) {
            Err(RenderError::ResourceCreation { step, .. }) => assert_eq!(step, "vertex buffer"),
            other => panic!("expected a resource creation error, got {other:?}"),
        }
        assert!(validate_mesh(&build_cornell_box()).is_ok());
    }

    #[test]
    fn frames_clear_to_the_configured_color_and_far_depth() {
        let settings = RenderSettings::default();

        let color = color_ops(settings.clear_color);
        assert_eq!(color.load, wgpu::LoadOp::Clear(settings.clear_color));
        assert_eq!(color.store, wgpu::StoreOp::Store);

        let depth = depth_ops();
        assert_eq!(depth.load, wgpu::LoadOp::Clear(1.0));
        assert_eq!(depth.store, wgpu::StoreOp::Store);
    }
}
