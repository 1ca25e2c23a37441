use std::mem::size_of;
use std::num::NonZeroU64;
use std::sync::Arc;

use crate::coords::{Mat4, Vec3};
use crate::device::{FatalError, WgpuContext, OFFSCREEN_COLOR_FORMAT, OFFSCREEN_DEPTH_FORMAT};

use super::{BufferLayout, FrameParams, LogoBackend, LogoMesh};

struct LogoResources {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    mesh_buffer: wgpu::Buffer,
    layout: BufferLayout,
}

/// Draws the logo into the offscreen target of a `WgpuContext`.
///
/// Culling mirrors the GL setup: clockwise triangles are front-facing and
/// front faces are culled.
pub struct WgpuLogoBackend {
    context: Arc<WgpuContext>,
    resources: Option<LogoResources>,
}

impl WgpuLogoBackend {
    pub fn new(context: Arc<WgpuContext>) -> Self {
        Self {
            context,
            resources: None,
        }
    }

    fn compile(&self, source: &str) -> Result<wgpu::ShaderModule, FatalError> {
        let device = self.context.device();
        scoped(device, FatalError::ShaderCompile, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("tandem logo shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })
    }

    fn link(
        &self,
        module: &wgpu::ShaderModule,
    ) -> Result<(wgpu::RenderPipeline, wgpu::BindGroupLayout), FatalError> {
        let device = self.context.device();
        scoped(device, FatalError::ProgramLink, || self.build_pipeline(module))
    }

    fn build_pipeline(&self, module: &wgpu::ShaderModule) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
        let device = self.context.device();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tandem logo bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(size_of::<Mat4>() as u64),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tandem logo pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
        const NORMAL_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];
        let stride = size_of::<Vec3>() as u64;

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tandem logo pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: stride,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &POSITION_ATTRS,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: stride,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &NORMAL_ATTRS,
                    },
                ],
            },

            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: OFFSCREEN_COLOR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Cw,
                cull_mode: Some(wgpu::Face::Front),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: OFFSCREEN_DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        (pipeline, bind_group_layout)
    }

    fn upload(&self, mesh: &LogoMesh) -> Result<(wgpu::Buffer, BufferLayout), FatalError> {
        let device = self.context.device();
        let layout = mesh.layout();

        let max = device.limits().max_buffer_size;
        if layout.total_bytes > max {
            return Err(FatalError::BufferBind(format!(
                "{} bytes exceeds the device limit of {max}",
                layout.total_bytes
            )));
        }

        let oom = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = scoped(device, FatalError::BufferBind, || {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("tandem logo vbo"),
                size: layout.total_bytes,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let queue = self.context.queue();
            queue.write_buffer(&buffer, 0, bytemuck::cast_slice(mesh.vertices()));
            queue.write_buffer(&buffer, layout.normals_offset, bytemuck::cast_slice(mesh.normals()));
            buffer
        });
        if let Some(err) = pollster::block_on(oom.pop()) {
            return Err(FatalError::BufferBind(err.to_string()));
        }

        Ok((buffer?, layout))
    }
}

impl LogoBackend for WgpuLogoBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn initialize(&mut self, mesh: &LogoMesh) -> Result<(), FatalError> {
        self.context
            .bound_target()
            .map_err(|e| FatalError::BufferBind(e.to_string()))?;

        let module = self.compile(include_str!("shaders/logo.wgsl"))?;
        let (pipeline, bind_group_layout) = self.link(&module)?;
        let (mesh_buffer, layout) = self.upload(mesh)?;

        let device = self.context.device();
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tandem logo matrix ubo"),
            size: size_of::<Mat4>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tandem logo bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        log::debug!(
            "logo uploaded: {} vertices, {} bytes",
            layout.vertex_count,
            layout.total_bytes
        );

        self.resources = Some(LogoResources {
            pipeline,
            bind_group,
            uniform_buffer,
            mesh_buffer,
            layout,
        });
        Ok(())
    }

    fn draw(&mut self, frame: &FrameParams) -> Result<(), FatalError> {
        let Some(res) = self.resources.as_ref() else {
            return Err(FatalError::ProgramBind("pipeline not initialized".into()));
        };

        let target = self
            .context
            .bound_target()
            .map_err(|e| FatalError::BufferBind(e.to_string()))?;

        let scope = self.context.device().push_error_scope(wgpu::ErrorFilter::Validation);
        let queue = self.context.queue();
        queue.write_buffer(&res.uniform_buffer, 0, bytemuck::bytes_of(&frame.model));

        let mut encoder = self
            .context
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tandem logo encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tandem logo pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear_color.into()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: target.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let layout = res.layout;
            rpass.set_pipeline(&res.pipeline);
            rpass.set_bind_group(0, &res.bind_group, &[]);
            rpass.set_vertex_buffer(0, res.mesh_buffer.slice(..layout.array_bytes));
            rpass.set_vertex_buffer(1, res.mesh_buffer.slice(layout.normals_offset..layout.total_bytes));
            rpass.draw(0..layout.vertex_count, 0..1);
        }

        queue.submit(std::iter::once(encoder.finish()));

        match pollster::block_on(scope.pop()) {
            Some(err) => Err(FatalError::ProgramBind(err.to_string())),
            None => Ok(()),
        }
    }
}

/// Runs `create` inside a validation error scope.
///
/// wgpu reports validation failures asynchronously to the device's
/// uncaptured-error handler, which panics by default; the scope turns them
/// into a `FatalError` built by `fail`.
fn scoped<T>(
    device: &wgpu::Device,
    fail: fn(String) -> FatalError,
    create: impl FnOnce() -> T,
) -> Result<T, FatalError> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(scope.pop()) {
        Some(err) => {
            log::error!("wgpu validation error: {err}");
            Err(fail(err.to_string()))
        }
        None => Ok(value),
    }
}
