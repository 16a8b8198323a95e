//! Graphics backend seam.
//!
//! The recording context never talks to a GPU API directly. It creates
//! resources and replays frames through the [`Backend`] trait: resources are
//! opaque ids, state is applied with `apply_*` calls, and draws are
//! non-indexed.
//!
//! Implementations:
//! - [`WgpuBackend`]: records into a `wgpu::RenderPass`
//! - [`TraceBackend`]: records every call, for tests and diagnostics

mod gpu;
mod trace;

pub use gpu::{PassTarget, WgpuBackend};
pub use trace::{Call, TraceBackend};

use anyhow::Result;

use crate::coords::PixelRect;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferId(pub u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ImageId(pub u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ShaderId(pub u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PipelineId(pub u32);

/// Streaming vertex buffer, rewritten once per frame.
#[derive(Debug, Clone)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub size: u64,
}

/// 2D RGBA8 image sampled with nearest filtering.
#[derive(Debug, Clone)]
pub struct ImageDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    /// Tightly packed `width * height * 4` bytes.
    pub pixels: &'a [u8],
}

/// Shader with one vertex-stage uniform block and one fragment-stage texture.
#[derive(Debug, Clone)]
pub struct ShaderDesc<'a> {
    pub label: &'a str,
    /// Size in bytes of the vertex-stage uniform block.
    pub uniform_size: u64,
    /// Upper bound on `apply_uniforms` calls between two passes.
    pub max_uniform_updates: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Topology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CullMode {
    None,
    Back,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CompareFunc {
    Always,
    LessEqual,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexFormat {
    Float32x3,
    Sint16x2,
    Unorm8x4,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttr {
    pub location: u32,
    pub offset: u64,
    pub format: VertexFormat,
}

/// Everything a backend needs to build one pipeline object.
#[derive(Debug, Clone)]
pub struct PipelineDesc<'a> {
    pub label: &'a str,
    pub shader: ShaderId,
    pub stride: u64,
    pub attrs: &'a [VertexAttr],
    pub topology: Topology,
    /// Source-alpha blending when `true`.
    pub blend: bool,
    pub cull: CullMode,
    pub depth_compare: CompareFunc,
    pub depth_write: bool,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub sample_count: u32,
}

/// Resources bound for the next draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Bindings {
    pub vertex_buffer: BufferId,
    pub vertex_offset: u64,
    pub image: ImageId,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Graphics API consumed by the context.
///
/// All calls are synchronous from the caller's point of view and issued in
/// submission order. Destroying an unknown id is a no-op.
pub trait Backend {
    fn make_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId>;
    fn make_image(&mut self, desc: &ImageDesc<'_>) -> Result<ImageId>;
    fn make_shader(&mut self, desc: &ShaderDesc<'_>) -> Result<ShaderId>;
    fn make_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineId>;

    fn destroy_buffer(&mut self, id: BufferId);
    fn destroy_image(&mut self, id: ImageId);
    fn destroy_shader(&mut self, id: ShaderId);
    fn destroy_pipeline(&mut self, id: PipelineId);

    /// Replaces the start of the buffer with `data`.
    fn update_buffer(&mut self, id: BufferId, data: &[u8]);

    fn apply_viewport(&mut self, rect: PixelRect);
    fn apply_scissor_rect(&mut self, rect: PixelRect);
    fn apply_pipeline(&mut self, id: PipelineId);
    fn apply_bindings(&mut self, bindings: &Bindings);
    fn apply_uniforms(&mut self, stage: ShaderStage, slot: u32, data: &[u8]);

    /// Non-indexed draw of `num_elements` vertices starting at `base_element`.
    fn draw(&mut self, base_element: u32, num_elements: u32, num_instances: u32);
}
