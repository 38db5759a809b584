use std::time::{Duration, Instant};

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::debug;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::camera::{Backdrop, PLANE_INDICES};
use crate::scene::GradientScene;
use crate::touch::TouchTexture;
use crate::types::{Antialiasing, ColorSpaceMode, Rgb};

use super::context::{GpuContext, GpuInitError};
use super::pipeline::{PipelineLayouts, ScenePipeline};
use super::touch_channel::TouchChannel;
use super::uniforms::FlowUniforms;

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Vertex and index buffers for the backdrop plane, tagged with the plane
/// generation they were built from.
struct PlaneBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    generation: u64,
}

impl PlaneBuffers {
    fn new(device: &wgpu::Device, backdrop: &Backdrop) -> Self {
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("plane indices"),
            contents: bytemuck::cast_slice(&PLANE_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex: create_vertex_buffer(device, backdrop),
            index,
            generation: backdrop.generation(),
        }
    }

    /// Replaces the vertex buffer when the plane was rebuilt, destroying the old one.
    fn sync(&mut self, device: &wgpu::Device, backdrop: &Backdrop) {
        if self.generation == backdrop.generation() {
            return;
        }
        let stale = std::mem::replace(&mut self.vertex, create_vertex_buffer(device, backdrop));
        stale.destroy();
        self.generation = backdrop.generation();
    }
}

fn create_vertex_buffer(device: &wgpu::Device, backdrop: &Backdrop) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("plane vertices"),
        contents: bytemuck::cast_slice(backdrop.plane().vertices()),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

struct RenderStats {
    last_update: Instant,
    frames_since_update: u32,
    frames_per_second: f32,
}

impl RenderStats {
    fn new(now: Instant) -> Self {
        Self {
            last_update: now,
            frames_since_update: 0,
            frames_per_second: 0.0,
        }
    }

    fn record(&mut self, now: Instant, scene: &GradientScene) {
        self.frames_since_update += 1;
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed >= Duration::from_secs(1) {
            self.frames_per_second = self.frames_since_update as f32 / elapsed.as_secs_f32();
            self.frames_since_update = 0;
            self.last_update = now;
            debug!(
                fps = self.frames_per_second.round(),
                time = scene.time(),
                scene = %scene.kind(),
                trail = scene.touch().map_or(0, |touch| touch.trail().len()),
                "render stats"
            );
        }
    }
}

/// Every GPU resource the backdrop needs, owned by the frame loop thread.
pub(crate) struct GpuState {
    context: GpuContext,
    pipeline: ScenePipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    touch_channel: TouchChannel,
    channel_bind_group: wgpu::BindGroup,
    plane: PlaneBuffers,
    multisample_target: Option<MultisampleTarget>,
    clear_color: wgpu::Color,
    stats: RenderStats,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        scene: &GradientScene,
        antialiasing: Antialiasing,
        color_space: ColorSpaceMode,
        clear_color: Rgb,
    ) -> Result<Self, GpuInitError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, antialiasing, color_space)?;
        let device = &context.device;
        let layouts = PipelineLayouts::new(device);
        let pipeline = ScenePipeline::new(
            device,
            &layouts,
            context.surface_format,
            context.sample_count,
            scene.kind(),
        );

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform buffer"),
            size: std::mem::size_of::<FlowUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        Self::write_uniforms(&context.queue, &uniform_buffer, scene.uniforms());

        let blank = TouchTexture::new();
        let initial = scene.touch().unwrap_or(&blank);
        let touch_channel = TouchChannel::new(device, &context.queue, initial.pixels());
        let channel_bind_group = layouts.channel_bind_group(device, &touch_channel);

        let plane = PlaneBuffers::new(device, scene.backdrop());
        let multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });

        debug!(
            scene = %pipeline.scene,
            sample_count = context.sample_count,
            format = ?context.surface_format,
            "GPU state ready"
        );

        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            touch_channel,
            channel_bind_group,
            plane,
            multisample_target,
            clear_color: wgpu::Color {
                r: clear_color[0] as f64,
                g: clear_color[1] as f64,
                b: clear_color[2] as f64,
                a: 1.0,
            },
            stats: RenderStats::new(Instant::now()),
            context,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        self.multisample_target = (self.context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &self.context.device,
                self.context.surface_format,
                self.context.size,
                self.context.sample_count,
            )
        });
    }

    pub(crate) fn reconfigure(&self) {
        self.context.reconfigure();
    }

    /// Uploads whatever changed in `scene` and draws one frame.
    pub(crate) fn render(&mut self, scene: &mut GradientScene) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        self.stats.record(Instant::now(), scene);

        if let Some(touch) = scene.touch_mut() {
            self.touch_channel.sync(&self.context.queue, touch);
        }
        self.plane.sync(&self.context.device, scene.backdrop());
        Self::write_uniforms(&self.context.queue, &self.uniform_buffer, scene.uniforms());

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });

        let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("backdrop pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_bind_group(1, &self.channel_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.plane.vertex.slice(..));
            render_pass.set_index_buffer(self.plane.index.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..PLANE_INDICES.len() as u32, 0, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn write_uniforms(queue: &wgpu::Queue, buffer: &wgpu::Buffer, uniforms: &FlowUniforms) {
        queue.write_buffer(buffer, 0, bytemuck::bytes_of(uniforms));
    }
}
