//! Lazily created pipeline objects, one per render-state key.

use core::mem::{offset_of, size_of};

use crate::backend::{
    Backend, CompareFunc, CullMode, PipelineDesc, PipelineId, ShaderId, Topology, VertexAttr,
    VertexFormat,
};
use crate::record::Vertex;
use crate::state::{PrimitiveType, StateBits, StateFlag, PIPELINE_SLOTS};

const VERTEX_ATTRS: [VertexAttr; 3] = [
    VertexAttr {
        location: 0,
        offset: offset_of!(Vertex, pos) as u64,
        format: VertexFormat::Float32x3,
    },
    VertexAttr {
        location: 1,
        offset: offset_of!(Vertex, uv) as u64,
        format: VertexFormat::Sint16x2,
    },
    VertexAttr {
        location: 2,
        offset: offset_of!(Vertex, rgba) as u64,
        format: VertexFormat::Unorm8x4,
    },
];

/// Key-independent part of every pipeline: shader and render target formats.
#[derive(Debug, Clone)]
pub(crate) struct PipelineTemplate {
    pub shader: ShaderId,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub sample_count: u32,
}

impl PipelineTemplate {
    /// Fills in the key-dependent fields.
    pub(crate) fn desc_for(&self, key: StateBits) -> PipelineDesc<'static> {
        PipelineDesc {
            label: "marduk-gl pipeline",
            shader: self.shader,
            stride: size_of::<Vertex>() as u64,
            attrs: &VERTEX_ATTRS,
            topology: topology(key.primitive_type()),
            blend: key.is_enabled(StateFlag::Blend),
            cull: if key.is_enabled(StateFlag::CullFace) {
                CullMode::Back
            } else {
                CullMode::None
            },
            depth_compare: if key.is_enabled(StateFlag::DepthTest) {
                CompareFunc::LessEqual
            } else {
                CompareFunc::Always
            },
            depth_write: true,
            color_format: self.color_format,
            depth_format: self.depth_format,
            sample_count: self.sample_count,
        }
    }
}

fn topology(ty: PrimitiveType) -> Topology {
    match ty {
        PrimitiveType::Points => Topology::PointList,
        PrimitiveType::Lines => Topology::LineList,
        PrimitiveType::LineStrip => Topology::LineStrip,
        PrimitiveType::Triangles => Topology::TriangleList,
        PrimitiveType::TriangleStrip => Topology::TriangleStrip,
    }
}

/// Slot table indexed by [`StateBits::pipeline_slot`].
///
/// A slot is filled on first use and kept until [`destroy_all`](Self::destroy_all).
#[derive(Debug)]
pub(crate) struct PipelineCache {
    template: PipelineTemplate,
    slots: [Option<PipelineId>; PIPELINE_SLOTS],
}

impl PipelineCache {
    pub(crate) fn new(template: PipelineTemplate) -> Self {
        Self {
            template,
            slots: [None; PIPELINE_SLOTS],
        }
    }

    /// Returns the pipeline for `key`, creating it on first use.
    ///
    /// `None` if creation failed; the slot stays empty and the next call retries.
    pub(crate) fn resolve(&mut self, backend: &mut impl Backend, key: StateBits) -> Option<PipelineId> {
        let slot = key.pipeline_slot();
        if let Some(id) = self.slots[slot] {
            return Some(id);
        }

        match backend.make_pipeline(&self.template.desc_for(key)) {
            Ok(id) => {
                log::debug!(
                    "marduk-gl: pipeline {id:?} for slot {slot} ({:?}, key {:#06x})",
                    key.primitive_type(),
                    key.raw()
                );
                self.slots[slot] = Some(id);
                Some(id)
            }
            Err(e) => {
                log::error!("marduk-gl: pipeline creation failed for key {:#06x}: {e:#}", key.raw());
                None
            }
        }
    }

    /// Number of filled slots.
    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub(crate) fn destroy_all(&mut self, backend: &mut impl Backend) {
        for id in self.slots.iter_mut().filter_map(Option::take) {
            backend.destroy_pipeline(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Call, TraceBackend};

    fn cache() -> PipelineCache {
        PipelineCache::new(PipelineTemplate {
            shader: ShaderId(0),
            color_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            depth_format: None,
            sample_count: 1,
        })
    }

    fn tri() -> StateBits {
        StateBits::new().with_primitive_type(PrimitiveType::Triangles)
    }

    // ── resolve ──────────────────────────────────────────────────────────

    #[test]
    fn same_key_resolves_to_same_handle() {
        let mut be = TraceBackend::new();
        let mut c = cache();
        let a = c.resolve(&mut be, tri());
        let b = c.resolve(&mut be, tri());
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(be.pipelines_created(), 1);
    }

    #[test]
    fn distinct_keys_get_distinct_handles() {
        let mut be = TraceBackend::new();
        let mut c = cache();
        let mut seen = std::collections::HashSet::new();
        for ty in PrimitiveType::ALL {
            for flag in StateFlag::ALL {
                let key = StateBits::new().with_primitive_type(ty).enable(flag);
                assert!(seen.insert(c.resolve(&mut be, key)));
            }
            assert!(seen.insert(c.resolve(&mut be, StateBits::new().with_primitive_type(ty))));
        }
        assert_eq!(c.len(), 25);
        assert_eq!(be.pipelines_created(), 25);
    }

    #[test]
    fn failed_creation_leaves_slot_empty_and_retries() {
        let mut be = TraceBackend::new();
        be.fail_pipelines = true;
        let mut c = cache();
        assert_eq!(c.resolve(&mut be, tri()), None);
        assert_eq!(c.len(), 0);

        be.fail_pipelines = false;
        assert!(c.resolve(&mut be, tri()).is_some());
        assert_eq!(c.len(), 1);
    }

    // ── desc_for ─────────────────────────────────────────────────────────

    #[test]
    fn flags_map_to_pipeline_state() {
        let c = cache();
        let plain = c.template.desc_for(tri());
        assert_eq!(plain.topology, Topology::TriangleList);
        assert!(!plain.blend);
        assert_eq!(plain.cull, CullMode::None);
        assert_eq!(plain.depth_compare, CompareFunc::Always);
        assert!(plain.depth_write);

        let key = tri()
            .enable(StateFlag::Blend)
            .enable(StateFlag::CullFace)
            .enable(StateFlag::DepthTest);
        let full = c.template.desc_for(key);
        assert!(full.blend);
        assert_eq!(full.cull, CullMode::Back);
        assert_eq!(full.depth_compare, CompareFunc::LessEqual);
    }

    #[test]
    fn vertex_layout_matches_vertex_struct() {
        let d = cache().template.desc_for(tri());
        assert_eq!(d.stride, 20);
        let offsets: Vec<u64> = d.attrs.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 12, 16]);
    }

    // ── destroy_all ──────────────────────────────────────────────────────

    #[test]
    fn destroy_all_releases_each_pipeline_once() {
        let mut be = TraceBackend::new();
        let mut c = cache();
        c.resolve(&mut be, tri());
        c.resolve(&mut be, tri().enable(StateFlag::Blend));
        be.clear();

        c.destroy_all(&mut be);
        assert_eq!(be.count(|call| matches!(call, Call::DestroyPipeline(_))), 2);
        assert_eq!(c.len(), 0);

        c.destroy_all(&mut be);
        assert_eq!(be.calls().len(), 2);
    }
}
