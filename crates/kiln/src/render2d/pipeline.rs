//! wgpu implementation of [`RenderBackend`].
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ WgpuQuadBackend                                          │
//! │                                                          │
//! │  pipeline ──────── vs_main / fs_main from the .qsh file  │
//! │  group 0 ───────── projection uniform (vertex-only)      │
//! │  vertex buffer ─── max_quads * 4 QuadVertex, rewritten   │
//! │                    on every flush                        │
//! │  index buffer ──── max_quads * 6 u32, written once       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! A frame is one clear pass at `begin_frame`, one load pass per flushed
//! batch and a present at `end_frame`. Each pass is submitted right away
//! because the next flush overwrites the vertex buffer; queue writes and
//! submissions are ordered, so every draw sees its own batch.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::batch::{INDICES_PER_QUAD, RenderBackend, VERTICES_PER_QUAD};
use super::vertex::{ProjectionUniform, QuadVertex, quad_indices};
use crate::error::{Error, Result};
use crate::render::GpuContext;
use crate::render::shader::{FRAGMENT_ENTRY, SegmentedShader, VERTEX_ENTRY};

/// Fail with [`Error::Gpu`] when buffers for `max_quads` quads would not
/// fit in `max_buffer_size` bytes or overflow the `u32` index range.
fn check_capacity(max_quads: usize, max_buffer_size: u64) -> Result<()> {
    let too_many = || {
        Error::Gpu(format!(
            "{max_quads} quads per batch exceed the device buffer limit of {max_buffer_size} bytes"
        ))
    };
    let vertex_bytes = max_quads
        .checked_mul(VERTICES_PER_QUAD * std::mem::size_of::<QuadVertex>())
        .ok_or_else(too_many)?;
    let index_bytes = max_quads
        .checked_mul(INDICES_PER_QUAD as usize * std::mem::size_of::<u32>())
        .ok_or_else(too_many)?;
    if vertex_bytes.max(index_bytes) as u64 > max_buffer_size {
        return Err(too_many());
    }
    let last_vertex = max_quads.checked_mul(VERTICES_PER_QUAD);
    if last_vertex.is_none_or(|n| n > u32::MAX as usize) {
        return Err(Error::Gpu(format!(
            "{max_quads} quads per batch overflow 32-bit indices"
        )));
    }
    Ok(())
}

struct Frame {
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

pub struct WgpuQuadBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: Arc<wgpu::Surface<'static>>,
    surface_config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    projection_bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    max_quads: usize,
    frame: Option<Frame>,
}

impl WgpuQuadBackend {
    /// Compile `shader`, build the pipeline and allocate buffers for
    /// `max_quads` quads.
    ///
    /// Fails before allocating anything if the buffers would exceed the
    /// device's `max_buffer_size`.
    pub fn new(gpu: &GpuContext, shader: &SegmentedShader, max_quads: usize) -> Result<Self> {
        let device = &gpu.device;
        check_capacity(max_quads, device.limits().max_buffer_size)?;
        let modules = shader.compile(device)?;

        let projection_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("projection bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quad pipeline layout"),
            bind_group_layouts: &[&projection_layout],
            push_constant_ranges: &[],
        });

        let pipeline = shader.link(device, || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("quad pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &modules.vertex,
                    entry_point: Some(VERTEX_ENTRY),
                    buffers: &[QuadVertex::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &modules.fragment,
                    entry_point: Some(FRAGMENT_ENTRY),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.surface_format(),
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        let (width, height) = gpu.surface_size();
        let projection_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("projection uniform buffer"),
            contents: bytemuck::cast_slice(&[ProjectionUniform::screen(width, height)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let projection_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("projection bind group"),
            layout: &projection_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: projection_buffer.as_entire_binding(),
            }],
        });

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quad vertex buffer"),
            size: (max_quads * VERTICES_PER_QUAD * std::mem::size_of::<QuadVertex>())
                as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad index buffer"),
            contents: bytemuck::cast_slice(&quad_indices(max_quads)),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::debug!(
            "quad pipeline ready for {max_quads} quads per batch ({})",
            shader.path().display()
        );

        Ok(Self {
            device: gpu.device.clone(),
            queue: gpu.queue.clone(),
            surface: gpu.surface.clone(),
            surface_config: gpu.surface_config.clone(),
            pipeline,
            projection_bind_group,
            vertex_buffer,
            index_buffer,
            max_quads,
            frame: None,
        })
    }

    pub fn max_quads(&self) -> usize {
        self.max_quads
    }

    /// Next swapchain texture, reconfiguring once on a lost or outdated
    /// surface. `None` means skip this frame.
    fn acquire(&self) -> Result<Option<wgpu::SurfaceTexture>> {
        match self.surface.get_current_texture() {
            Ok(texture) => Ok(Some(texture)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                self.surface
                    .get_current_texture()
                    .map(Some)
                    .map_err(|e| Error::Gpu(format!("surface unavailable after reconfigure: {e}")))
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timed out, skipping frame");
                Ok(None)
            }
            Err(e) => Err(Error::Gpu(format!("cannot acquire frame: {e}"))),
        }
    }
}

impl RenderBackend for WgpuQuadBackend {
    fn begin_frame(&mut self, clear_color: [f64; 4]) -> Result<()> {
        // A frame left over from a failed update is dropped unpresented.
        self.frame = None;
        let Some(texture) = self.acquire()? else {
            return Ok(());
        };
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear_color[0],
                            g: clear_color[1],
                            b: clear_color[2],
                            a: clear_color[3],
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        self.frame = Some(Frame { texture, view });
        Ok(())
    }

    fn draw_batch(&mut self, vertices: &[QuadVertex], index_count: u32) -> Result<()> {
        let Some(frame) = &self.frame else {
            return Ok(());
        };
        if index_count as usize > self.max_quads * INDICES_PER_QUAD as usize {
            return Err(Error::Gpu(format!(
                "batch of {index_count} indices exceeds the index buffer"
            )));
        }

        self.queue
            .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("quad batch encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quad batch pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.projection_bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..index_count, 0, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        if let Some(frame) = self.frame.take() {
            frame.texture.present();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // wgpu's default `max_buffer_size` (256 MiB).
    const DEFAULT_LIMIT: u64 = 1 << 28;

    #[test]
    fn default_batch_fits_default_limits() {
        assert!(check_capacity(crate::render2d::MAX_QUADS, DEFAULT_LIMIT).is_ok());
        assert!(check_capacity(1, 64).is_ok());
    }

    #[test]
    fn vertex_buffer_over_the_limit_is_rejected() {
        // 64 vertex bytes per quad, 24 index bytes.
        assert!(check_capacity(16, 1024).is_ok());
        let err = check_capacity(17, 1024).unwrap_err();
        assert!(matches!(err, Error::Gpu(_)));
        assert!(err.to_string().contains("17 quads"));
    }

    #[test]
    fn huge_batches_do_not_overflow() {
        assert!(matches!(
            check_capacity(usize::MAX, u64::MAX),
            Err(Error::Gpu(_))
        ));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn index_range_is_limited_to_u32() {
        let quads = (u32::MAX as usize) / VERTICES_PER_QUAD + 1;
        let err = check_capacity(quads, u64::MAX).unwrap_err();
        assert!(err.to_string().contains("32-bit"));
    }
}
