use std::{
    borrow::Cow,
    f32::consts::{FRAC_PI_2, TAU},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc
    }
};

use bytemuck::{
    Pod,
    Zeroable
};

use wgpu::{
    util::DeviceExt,
    Device,
    RenderPipeline
};
use winit::window::Window;

use crate::{
    assets::TextureHandle,
    game::math::{Rect2F, Vector2F}
};

use super::{BlendMode, Color, RenderError, Renderer};

const CIRCLE_SEGMENTS: usize = 32;
const CORNER_SEGMENTS: usize = 8;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 2],
    color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Canvas style 2D transform: `p' = scale * p + offset`.
#[derive(Debug, Copy, Clone, PartialEq)]
struct Transform {
    scale: Vector2F,
    offset: Vector2F,
}

impl Default for Transform {
    fn default() -> Self {
        Self { scale: Vector2F::new(1.0, 1.0), offset: Vector2F::zero() }
    }
}

impl Transform {
    fn apply(&self, point: Vector2F) -> Vector2F {
        Vector2F::new(point.x * self.scale.x + self.offset.x, point.y * self.scale.y + self.offset.y)
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.scale.x *= sx;
        self.scale.y *= sy;
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.offset.x += self.scale.x * x;
        self.offset.y += self.scale.y * y;
    }
}

/// Triangles sharing one blend mode, drawn with one call.
#[derive(Debug)]
struct Batch {
    blend: BlendMode,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

/// Puts frames on a winit window through wgpu.
///
/// Shapes are tessellated on the CPU into coloured triangles and batched by
/// blend mode, the GPU only sees pixel positions converted to NDC. Sprites
/// are drawn as quads tinted with the fill colour and text is not rendered.
pub struct WgpuRenderer {
    window: Arc<Window>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    size: winit::dpi::PhysicalSize<u32>,
    surface: wgpu::Surface<'static>,
    surface_format: wgpu::TextureFormat,
    normal_pipeline: RenderPipeline,
    additive_pipeline: RenderPipeline,
    device_lost: Arc<AtomicBool>,

    background: Color,
    fill: Color,
    blend: BlendMode,
    transform: Transform,
    saved: Vec<(Transform, Color, BlendMode)>,
    batches: Vec<Batch>,
}

impl WgpuRenderer {
    pub async fn new(window: Arc<Window>) -> Result<WgpuRenderer, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let surface = instance.create_surface(window.clone())
            .map_err(|e| RenderError::ContextLost(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .ok_or_else(|| RenderError::ContextLost("no suitable adapter".into()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .map_err(|e| RenderError::ContextLost(e.to_string()))?;

        let device_lost = Arc::new(AtomicBool::new(false));
        let lost_flag = device_lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            log::error!("Device lost ({reason:?}): {message}");
            lost_flag.store(true, Ordering::SeqCst);
        });

        let size = window.inner_size();
        let surface_format = surface.get_capabilities(&adapter)
            .formats
            .first()
            .copied()
            .ok_or_else(|| RenderError::Surface("surface reports no formats".into()))?;

        let normal_pipeline = Self::prepare_pipeline(&device, surface_format, wgpu::BlendState::ALPHA_BLENDING, "Normal");
        let additive_pipeline = Self::prepare_pipeline(&device, surface_format, wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent::OVER,
        }, "Additive");

        let renderer = WgpuRenderer {
            window,
            device,
            queue,
            size,
            surface,
            surface_format,
            normal_pipeline,
            additive_pipeline,
            device_lost,
            background: Color::BLACK,
            fill: Color::WHITE,
            blend: BlendMode::Normal,
            transform: Transform::default(),
            saved: vec![],
            batches: vec![],
        };

        renderer.configure_surface();
        log::info!("Renderer ready, surface {:?} {}x{}", surface_format, size.width, size.height);
        Ok(renderer)
    }

    fn prepare_pipeline(device: &Device, format: wgpu::TextureFormat, blend: wgpu::BlendState, name: &str) -> RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shape Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shader.wgsl"))),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shape Pipeline Layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{name} Shape Pipeline")),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: format.add_srgb_suffix(),
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    fn configure_surface(&self) {
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: self.surface_format,
            view_formats: vec![self.surface_format.add_srgb_suffix()],
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            width: self.size.width.max(1),
            height: self.size.height.max(1),
            desired_maximum_frame_latency: 2,
            present_mode: wgpu::PresentMode::AutoVsync,
        };
        self.surface.configure(&self.device, &surface_config);
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.size = new_size;
        self.configure_surface();
    }

    fn to_ndc(&self, point: Vector2F) -> [f32; 2] {
        let p = self.transform.apply(point);
        let w = self.size.width.max(1) as f32;
        let h = self.size.height.max(1) as f32;
        [p.x / w * 2.0 - 1.0, 1.0 - p.y / h * 2.0]
    }

    fn batch(&mut self) -> &mut Batch {
        if self.batches.last().map(|b| b.blend) != Some(self.blend) {
            self.batches.push(Batch { blend: self.blend, vertices: vec![], indices: vec![] });
        }
        let last = self.batches.len() - 1;
        &mut self.batches[last]
    }

    /// Adds a convex polygon as a triangle fan around its first point.
    fn push_convex(&mut self, points: &[Vector2F]) {
        if points.len() < 3 {
            return;
        }
        let color = self.fill.to_f32_array();
        let vertices: Vec<Vertex> = points.iter()
            .map(|p| Vertex { position: self.to_ndc(*p), color })
            .collect();

        let batch = self.batch();
        let base = batch.vertices.len() as u32;
        batch.vertices.extend(vertices);
        for i in 1..(points.len() as u32 - 1) {
            batch.indices.extend([base, base + i, base + i + 1]);
        }
    }

    fn push_quad(&mut self, rect: Rect2F) {
        self.push_convex(&[
            Vector2F::new(rect.left(), rect.top()),
            Vector2F::new(rect.right(), rect.top()),
            Vector2F::new(rect.right(), rect.bottom()),
            Vector2F::new(rect.left(), rect.bottom()),
        ]);
    }

    fn pipeline(&self, blend: BlendMode) -> &RenderPipeline {
        match blend {
            BlendMode::Normal => &self.normal_pipeline,
            BlendMode::Additive => &self.additive_pipeline,
        }
    }

    fn check_device(&self) -> Result<(), RenderError> {
        if self.device_lost.load(Ordering::SeqCst) {
            return Err(RenderError::ContextLost("device lost".into()));
        }
        Ok(())
    }
}

impl Renderer for WgpuRenderer {
    fn clear_frame(&mut self, background: Color) -> Result<(), RenderError> {
        self.check_device()?;
        self.background = background;
        self.fill = Color::WHITE;
        self.blend = BlendMode::Normal;
        self.transform = Transform::default();
        self.saved.clear();
        self.batches.clear();
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.check_device()?;
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(RenderError::ContextLost("surface out of memory".into()));
            },
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                self.configure_surface();
                return Err(RenderError::Surface(e.to_string()));
            },
            Err(e) => return Err(RenderError::Surface(e.to_string())),
        };
        let texture_view = surface_texture.texture
            .create_view(&wgpu::TextureViewDescriptor {
                format: Some(self.surface_format.add_srgb_suffix()),
                ..Default::default()
            });

        let buffers: Vec<(BlendMode, wgpu::Buffer, wgpu::Buffer, u32)> = self.batches.iter()
            .filter(|b| !b.indices.is_empty())
            .map(|b| {
                let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Batch Vertex Buffer"),
                    contents: bytemuck::cast_slice(&b.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Batch Index Buffer"),
                    contents: bytemuck::cast_slice(&b.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                (b.blend, vertex_buffer, index_buffer, b.indices.len() as u32)
            })
            .collect();

        let mut encoder = self.device.create_command_encoder(&Default::default());
        {
            let [r, g, b, a] = self.background.to_f32_array();
            let mut renderpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (blend, vertex_buffer, index_buffer, count) in buffers.iter() {
                renderpass.set_pipeline(self.pipeline(*blend));
                renderpass.set_vertex_buffer(0, vertex_buffer.slice(..));
                renderpass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                renderpass.draw_indexed(0..*count, 0, 0..1);
            }
        }

        self.queue.submit([encoder.finish()]);
        self.window.pre_present_notify();
        surface_texture.present();
        Ok(())
    }

    fn canvas_size(&self) -> Vector2F {
        Vector2F::new(self.size.width as f32, self.size.height as f32)
    }

    fn set_fill_color(&mut self, color: Color) {
        self.fill = color;
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    fn save(&mut self) {
        self.saved.push((self.transform, self.fill, self.blend));
    }

    fn restore(&mut self) {
        match self.saved.pop() {
            Some((transform, fill, blend)) => {
                self.transform = transform;
                self.fill = fill;
                self.blend = blend;
            },
            None => log::warn!("Renderer restore without matching save"),
        }
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.transform.scale(sx, sy);
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.transform.translate(x, y);
    }

    fn draw_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.push_quad(Rect2F::new(x, y, w, h));
    }

    fn draw_circle(&mut self, x: f32, y: f32, r: f32) {
        let points: Vec<Vector2F> = (0..CIRCLE_SEGMENTS)
            .map(|i| {
                let angle = TAU * i as f32 / CIRCLE_SEGMENTS as f32;
                Vector2F::new(x + r * angle.cos(), y + r * angle.sin())
            })
            .collect();
        self.push_convex(&points);
    }

    fn draw_round_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32) {
        let radius = radius.clamp(0.0, w.min(h) / 2.0);
        if radius <= 0.0 {
            self.push_quad(Rect2F::new(x, y, w, h));
            return;
        }
        // Corner centers clockwise from top left, each with its start angle.
        let corners = [
            (Vector2F::new(x + radius, y + radius), FRAC_PI_2 * 2.0),
            (Vector2F::new(x + w - radius, y + radius), FRAC_PI_2 * 3.0),
            (Vector2F::new(x + w - radius, y + h - radius), 0.0),
            (Vector2F::new(x + radius, y + h - radius), FRAC_PI_2),
        ];
        let points: Vec<Vector2F> = corners.iter()
            .flat_map(|(center, start)| {
                (0..=CORNER_SEGMENTS).map(move |i| {
                    let angle = start + FRAC_PI_2 * i as f32 / CORNER_SEGMENTS as f32;
                    Vector2F::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
                })
            })
            .collect();
        self.push_convex(&points);
    }

    fn draw_sprite(&mut self, texture: &TextureHandle, _source: Option<Rect2F>, destination: Rect2F) {
        log::trace!("Sprite '{}' drawn as tinted quad", texture.key());
        self.push_quad(destination);
    }

    fn draw_text(&mut self, text: &str, _x: f32, _y: f32, _size: f32) {
        log::trace!("Text '{text}' skipped, no font backend");
    }
}

#[test]
fn test_transform_follows_canvas_order() {
    let mut transform = Transform::default();
    transform.scale(2.0, 2.0);
    transform.translate(10.0, -5.0);
    assert_eq!(transform.apply(Vector2F::new(1.0, 1.0)), Vector2F::new(22.0, -8.0));

    let mut nested = transform;
    nested.translate(1.0, 1.0);
    assert_eq!(nested.apply(Vector2F::zero()), Vector2F::new(22.0, -8.0));
}
