use anyhow::{bail, Result};

use crate::coords::PixelRect;

use super::{
    Backend, Bindings, BufferDesc, BufferId, CompareFunc, CullMode, ImageDesc, ImageId,
    PipelineDesc, PipelineId, ShaderDesc, ShaderId, ShaderStage, Topology,
};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    MakeBuffer { id: BufferId, size: u64 },
    MakeImage { id: ImageId, width: u32, height: u32 },
    MakeShader { id: ShaderId, uniform_size: u64 },
    MakePipeline {
        id: PipelineId,
        topology: Topology,
        blend: bool,
        cull: CullMode,
        depth_compare: CompareFunc,
        sample_count: u32,
    },
    DestroyBuffer(BufferId),
    DestroyImage(ImageId),
    DestroyShader(ShaderId),
    DestroyPipeline(PipelineId),
    UpdateBuffer { id: BufferId, len: usize },
    Viewport(PixelRect),
    Scissor(PixelRect),
    ApplyPipeline(PipelineId),
    ApplyBindings(Bindings),
    ApplyUniforms { stage: ShaderStage, slot: u32, data: Vec<u8> },
    Draw { base: u32, count: u32, instances: u32 },
}

/// Backend that performs no GPU work and records every call in order.
///
/// Ids are allocated from one counter per resource kind, starting at 0.
#[derive(Debug, Default)]
pub struct TraceBackend {
    calls: Vec<Call>,
    next_buffer: u32,
    next_image: u32,
    next_shader: u32,
    next_pipeline: u32,
    /// When set, `make_pipeline` fails.
    pub fail_pipelines: bool,
}

impl TraceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Forgets recorded calls. Id counters keep running.
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// `(base, count, instances)` of every draw call, in order.
    pub fn draws(&self) -> Vec<(u32, u32, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                Call::Draw { base, count, instances } => Some((base, count, instances)),
                _ => None,
            })
            .collect()
    }

    pub fn pipelines_created(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::MakePipeline { .. }))
            .count()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl Backend for TraceBackend {
    fn make_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId> {
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.calls.push(Call::MakeBuffer { id, size: desc.size });
        Ok(id)
    }

    fn make_image(&mut self, desc: &ImageDesc<'_>) -> Result<ImageId> {
        let id = ImageId(self.next_image);
        self.next_image += 1;
        self.calls.push(Call::MakeImage { id, width: desc.width, height: desc.height });
        Ok(id)
    }

    fn make_shader(&mut self, desc: &ShaderDesc<'_>) -> Result<ShaderId> {
        let id = ShaderId(self.next_shader);
        self.next_shader += 1;
        self.calls.push(Call::MakeShader { id, uniform_size: desc.uniform_size });
        Ok(id)
    }

    fn make_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineId> {
        if self.fail_pipelines {
            bail!("pipeline creation disabled for {}", desc.label);
        }
        let id = PipelineId(self.next_pipeline);
        self.next_pipeline += 1;
        self.calls.push(Call::MakePipeline {
            id,
            topology: desc.topology,
            blend: desc.blend,
            cull: desc.cull,
            depth_compare: desc.depth_compare,
            sample_count: desc.sample_count,
        });
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        self.calls.push(Call::DestroyBuffer(id));
    }

    fn destroy_image(&mut self, id: ImageId) {
        self.calls.push(Call::DestroyImage(id));
    }

    fn destroy_shader(&mut self, id: ShaderId) {
        self.calls.push(Call::DestroyShader(id));
    }

    fn destroy_pipeline(&mut self, id: PipelineId) {
        self.calls.push(Call::DestroyPipeline(id));
    }

    fn update_buffer(&mut self, id: BufferId, data: &[u8]) {
        self.calls.push(Call::UpdateBuffer { id, len: data.len() });
    }

    fn apply_viewport(&mut self, rect: PixelRect) {
        self.calls.push(Call::Viewport(rect));
    }

    fn apply_scissor_rect(&mut self, rect: PixelRect) {
        self.calls.push(Call::Scissor(rect));
    }

    fn apply_pipeline(&mut self, id: PipelineId) {
        self.calls.push(Call::ApplyPipeline(id));
    }

    fn apply_bindings(&mut self, bindings: &Bindings) {
        self.calls.push(Call::ApplyBindings(*bindings));
    }

    fn apply_uniforms(&mut self, stage: ShaderStage, slot: u32, data: &[u8]) {
        self.calls.push(Call::ApplyUniforms { stage, slot, data: data.to_vec() });
    }

    fn draw(&mut self, base_element: u32, num_elements: u32, num_instances: u32) {
        self.calls.push(Call::Draw {
            base: base_element,
            count: num_elements,
            instances: num_instances,
        });
    }
}
