use std::num::NonZeroU64;

use anyhow::{Context, Result};

use crate::coords::PixelRect;
use crate::math::Mat4;

use super::{
    Backend, Bindings, BufferDesc, BufferId, CompareFunc, CullMode, ImageDesc, ImageId,
    PipelineDesc, PipelineId, ShaderDesc, ShaderId, ShaderStage, Topology, VertexFormat,
};

const SHADER_SRC: &str = include_str!("shaders/gl.wgsl");

/// Id-indexed resource table. Freed ids are handed out again, so an id must
/// not be used after its resource was destroyed.
struct Slots<T> {
    items: Vec<Option<T>>,
    free: Vec<u32>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self { items: Vec::new(), free: Vec::new() }
    }
}

impl<T> Slots<T> {
    fn insert(&mut self, item: T) -> u32 {
        if let Some(id) = self.free.pop() {
            self.items[id as usize] = Some(item);
            return id;
        }
        self.items.push(Some(item));
        (self.items.len() - 1) as u32
    }

    fn get(&self, id: u32) -> Option<&T> {
        self.items.get(id as usize).and_then(Option::as_ref)
    }

    fn remove(&mut self, id: u32) -> Option<T> {
        let item = self.items.get_mut(id as usize).and_then(Option::take)?;
        self.free.push(id);
        Some(item)
    }
}

struct GpuImage {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Shader module plus its ring of dynamically offset uniform blocks.
struct GpuShader {
    module: wgpu::ShaderModule,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    uniform_slots: u64,
}

struct GpuPipeline {
    pipeline: wgpu::RenderPipeline,
    shader: ShaderId,
}

/// Attachments for one [`WgpuBackend::begin_pass`].
pub struct PassTarget<'a> {
    pub color: &'a wgpu::TextureView,
    /// Cleared to 1.0 at pass start when present.
    pub depth: Option<&'a wgpu::TextureView>,
    pub width: u32,
    pub height: u32,
    /// `None` loads the existing color contents.
    pub clear: Option<wgpu::Color>,
}

/// [`Backend`] that replays into a `wgpu::RenderPass`.
///
/// Usage per frame:
/// - `begin_pass(&mut encoder, &target)`
/// - `Context::draw(&mut backend)`
/// - `end_pass()`, then finish and submit the encoder
///
/// Uniform blocks are written into a per-shader ring with dynamic offsets.
/// The ring restarts at `begin_pass`, so submit the encoder before starting
/// the next pass. `apply_*` and `draw` calls outside a pass are dropped.
///
/// A viewport overhanging the target is cropped to it, and the MVP of every
/// following draw is corrected so geometry keeps the pixels it would have
/// covered in the full viewport.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,

    buffers: Slots<wgpu::Buffer>,
    images: Slots<GpuImage>,
    shaders: Slots<GpuShader>,
    pipelines: Slots<GpuPipeline>,

    pass: Option<wgpu::RenderPass<'static>>,
    target_size: (u32, u32),
    viewport_fix: Option<Mat4>,
    current_shader: Option<ShaderId>,
    uniform_cursor: u64,

    warned_no_pass: bool,
    warned_uniform_ring: bool,
}

impl WgpuBackend {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("marduk-gl uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("marduk-gl texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("marduk-gl pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("marduk-gl sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            device: device.clone(),
            queue: queue.clone(),
            uniform_layout,
            texture_layout,
            pipeline_layout,
            sampler,
            buffers: Slots::default(),
            images: Slots::default(),
            shaders: Slots::default(),
            pipelines: Slots::default(),
            pass: None,
            target_size: (0, 0),
            viewport_fix: None,
            current_shader: None,
            uniform_cursor: 0,
            warned_no_pass: false,
            warned_uniform_ring: false,
        }
    }

    /// Opens a render pass on `encoder`. Subsequent `apply_*` / `draw` calls record into it.
    pub fn begin_pass(&mut self, encoder: &mut wgpu::CommandEncoder, target: &PassTarget<'_>) {
        debug_assert!(self.pass.is_none(), "begin_pass called while a pass is open");

        let load = match target.clear {
            Some(c) => wgpu::LoadOp::Clear(c),
            None => wgpu::LoadOp::Load,
        };

        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("marduk-gl pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: target.depth.map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        self.pass = Some(pass.forget_lifetime());
        self.target_size = (target.width, target.height);
        self.viewport_fix = None;
        self.current_shader = None;
        self.uniform_cursor = 0;
        self.warned_uniform_ring = false;
    }

    /// Ends the pass opened by `begin_pass`. Must happen before the encoder is finished.
    pub fn end_pass(&mut self) {
        self.pass = None;
    }

    #[inline]
    pub fn in_pass(&self) -> bool {
        self.pass.is_some()
    }

    fn warn_no_pass(&mut self) {
        if !self.warned_no_pass {
            log::warn!("WgpuBackend: render call outside begin_pass/end_pass; ignored");
            self.warned_no_pass = true;
        }
    }
}

/// Viewport cropped to the target, plus the clip-space transform that maps
/// the requested viewport onto the cropped one (`None` when nothing was cut).
#[derive(Debug, Clone, Copy, PartialEq)]
struct FittedViewport {
    rect: (u32, u32, u32, u32),
    clip: Option<Mat4>,
}

fn fit_viewport(rect: PixelRect, (tw, th): (u32, u32)) -> Option<FittedViewport> {
    let full = rect.to_top_left(th);
    let (x, y, w, h) = full.clamp_to(tw, th);
    if w == 0 || h == 0 {
        return None;
    }
    if (x as i64, y as i64, w as i64, h as i64)
        == (full.x as i64, full.y as i64, full.w as i64, full.h as i64)
    {
        return Some(FittedViewport { rect: (x, y, w, h), clip: None });
    }

    let (fx, fy, fw, fh) = (full.x as f32, full.y as f32, full.w as f32, full.h as f32);
    let (cx, cy, cw, ch) = (x as f32, y as f32, w as f32, h as f32);
    // NDC y points up, pixel y down.
    let sx = fw / cw;
    let sy = fh / ch;
    let ox = (2.0 * (fx - cx) + fw - cw) / cw;
    let oy = -(2.0 * (fy - cy) + fh - ch) / ch;
    let clip = Mat4::from_cols([
        [sx, 0.0, 0.0, 0.0],
        [0.0, sy, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [ox, oy, 0.0, 1.0],
    ]);
    Some(FittedViewport { rect: (x, y, w, h), clip: Some(clip) })
}

fn alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent::OVER,
    }
}

fn topology(t: Topology) -> wgpu::PrimitiveTopology {
    match t {
        Topology::PointList => wgpu::PrimitiveTopology::PointList,
        Topology::LineList => wgpu::PrimitiveTopology::LineList,
        Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

fn vertex_format(f: VertexFormat) -> wgpu::VertexFormat {
    match f {
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Sint16x2 => wgpu::VertexFormat::Sint16x2,
        VertexFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
    }
}

fn compare(c: CompareFunc) -> wgpu::CompareFunction {
    match c {
        CompareFunc::Always => wgpu::CompareFunction::Always,
        CompareFunc::LessEqual => wgpu::CompareFunction::LessEqual,
    }
}

impl Backend for WgpuBackend {
    fn make_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId> {
        anyhow::ensure!(desc.size > 0, "buffer {} has zero size", desc.label);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: desc.size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(BufferId(self.buffers.insert(buffer)))
    }

    fn make_image(&mut self, desc: &ImageDesc<'_>) -> Result<ImageId> {
        let expected = desc.width as usize * desc.height as usize * 4;
        anyhow::ensure!(
            desc.width > 0 && desc.height > 0 && desc.pixels.len() == expected,
            "image {}: expected {expected} bytes of RGBA8 for {}x{}, got {}",
            desc.label,
            desc.width,
            desc.height,
            desc.pixels.len()
        );

        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            desc.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(desc.width * 4),
                rows_per_image: Some(desc.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(desc.label),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        Ok(ImageId(self.images.insert(GpuImage { texture, bind_group })))
    }

    fn make_shader(&mut self, desc: &ShaderDesc<'_>) -> Result<ShaderId> {
        let uniform_size =
            NonZeroU64::new(desc.uniform_size).context("uniform block size must be non-zero")?;

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(SHADER_SRC.into()),
        });

        let align = self.device.limits().min_uniform_buffer_offset_alignment.max(1) as u64;
        let uniform_stride = desc.uniform_size.div_ceil(align) * align;
        let uniform_slots = desc.max_uniform_updates.max(1) as u64;
        // dynamic offsets are u32
        let last_offset = uniform_stride.checked_mul(uniform_slots - 1);
        anyhow::ensure!(
            last_offset.is_some_and(|o| o <= u64::from(u32::MAX)),
            "uniform ring of {uniform_slots} x {uniform_stride} bytes exceeds u32 offsets"
        );

        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("marduk-gl uniform ring"),
            size: uniform_stride * uniform_slots,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("marduk-gl uniform bind group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: Some(uniform_size),
                }),
            }],
        });

        Ok(ShaderId(self.shaders.insert(GpuShader {
            module,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            uniform_slots,
        })))
    }

    fn make_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineId> {
        let shader = self
            .shaders
            .get(desc.shader.0)
            .with_context(|| format!("pipeline {}: unknown shader {:?}", desc.label, desc.shader))?;

        let attributes: Vec<wgpu::VertexAttribute> = desc
            .attrs
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: vertex_format(a.format),
                offset: a.offset,
                shader_location: a.location,
            })
            .collect();

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&self.pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader.module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: desc.stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader.module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: desc.color_format,
                    blend: desc.blend.then(alpha_blend),
                    write_mask: wgpu::ColorWrites::COLOR,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: topology(desc.topology),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: match desc.cull {
                    CullMode::None => None,
                    CullMode::Back => Some(wgpu::Face::Back),
                },
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: desc.depth_format.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: desc.depth_write,
                depth_compare: compare(desc.depth_compare),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),

            multisample: wgpu::MultisampleState {
                count: desc.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },

            multiview_mask: None,
            cache: None,
        });

        Ok(PipelineId(self.pipelines.insert(GpuPipeline {
            pipeline,
            shader: desc.shader,
        })))
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        if let Some(buffer) = self.buffers.remove(id.0) {
            buffer.destroy();
        }
    }

    fn destroy_image(&mut self, id: ImageId) {
        if let Some(image) = self.images.remove(id.0) {
            image.texture.destroy();
        }
    }

    fn destroy_shader(&mut self, id: ShaderId) {
        if let Some(shader) = self.shaders.remove(id.0) {
            shader.uniform_buffer.destroy();
        }
    }

    fn destroy_pipeline(&mut self, id: PipelineId) {
        self.pipelines.remove(id.0);
    }

    fn update_buffer(&mut self, id: BufferId, data: &[u8]) {
        let Some(buffer) = self.buffers.get(id.0) else { return };
        if data.is_empty() {
            return;
        }
        self.queue.write_buffer(buffer, 0, data);
    }

    fn apply_viewport(&mut self, rect: PixelRect) {
        let Some(pass) = self.pass.as_mut() else {
            self.warn_no_pass();
            return;
        };
        let Some(fit) = fit_viewport(rect, self.target_size) else {
            log::debug!("WgpuBackend: viewport {rect:?} lies outside the target; ignored");
            return;
        };
        let (x, y, w, h) = fit.rect;
        pass.set_viewport(x as f32, y as f32, w as f32, h as f32, 0.0, 1.0);
        self.viewport_fix = fit.clip;
    }

    fn apply_scissor_rect(&mut self, rect: PixelRect) {
        let Some(pass) = self.pass.as_mut() else {
            self.warn_no_pass();
            return;
        };
        let (tw, th) = self.target_size;
        let (x, y, w, h) = rect.to_top_left(th).clamp_to(tw, th);
        pass.set_scissor_rect(x, y, w, h);
    }

    fn apply_pipeline(&mut self, id: PipelineId) {
        let Some(pass) = self.pass.as_mut() else {
            self.warn_no_pass();
            return;
        };
        let Some(p) = self.pipelines.get(id.0) else {
            log::warn!("WgpuBackend: unknown pipeline {id:?}");
            return;
        };
        pass.set_pipeline(&p.pipeline);
        self.current_shader = Some(p.shader);
    }

    fn apply_bindings(&mut self, bindings: &Bindings) {
        let Some(pass) = self.pass.as_mut() else {
            self.warn_no_pass();
            return;
        };
        let (Some(buffer), Some(image)) = (
            self.buffers.get(bindings.vertex_buffer.0),
            self.images.get(bindings.image.0),
        ) else {
            log::warn!("WgpuBackend: stale bindings {bindings:?}");
            return;
        };
        pass.set_vertex_buffer(0, buffer.slice(bindings.vertex_offset..));
        pass.set_bind_group(1, &image.bind_group, &[]);
    }

    fn apply_uniforms(&mut self, stage: ShaderStage, slot: u32, data: &[u8]) {
        let Some(pass) = self.pass.as_mut() else {
            self.warn_no_pass();
            return;
        };
        if stage != ShaderStage::Vertex || slot != 0 {
            log::debug!("WgpuBackend: no uniform block at {stage:?} slot {slot}");
            return;
        }
        let Some(shader) = self.current_shader.and_then(|id| self.shaders.get(id.0)) else {
            log::warn!("WgpuBackend: apply_uniforms before apply_pipeline");
            return;
        };
        if self.uniform_cursor >= shader.uniform_slots || data.len() as u64 > shader.uniform_stride {
            if !self.warned_uniform_ring {
                log::warn!(
                    "WgpuBackend: uniform ring exhausted ({} blocks); further draws in this pass use stale uniforms",
                    shader.uniform_slots
                );
                self.warned_uniform_ring = true;
            }
            return;
        }

        let offset = self.uniform_cursor * shader.uniform_stride;
        self.queue.write_buffer(&shader.uniform_buffer, offset, data);
        if let Some(fix) = self.viewport_fix {
            if let Some(mvp) = data.get(..size_of::<Mat4>()) {
                let mvp: Mat4 = bytemuck::pod_read_unaligned(mvp);
                self.queue.write_buffer(&shader.uniform_buffer, offset, bytemuck::bytes_of(&(fix * mvp)));
            }
        }
        pass.set_bind_group(0, &shader.uniform_bind_group, &[offset as u32]);
        self.uniform_cursor += 1;
    }

    fn draw(&mut self, base_element: u32, num_elements: u32, num_instances: u32) {
        let Some(pass) = self.pass.as_mut() else {
            self.warn_no_pass();
            return;
        };
        pass.draw(base_element..base_element + num_elements, 0..num_instances);
    }
}
