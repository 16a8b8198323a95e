use bytemuck::{Pod, Zeroable};

use crate::math::Mat4;

/// One recorded vertex: 20 bytes, uploaded verbatim.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    /// Fixed-point texture coordinate, see `paint::TexcoordScale`.
    pub uv: [i16; 2],
    /// Packed RGBA, red in the low byte.
    pub rgba: u32,
}

/// Per-draw shader constants, captured when a primitive closes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Uniform {
    /// `projection * modelview`, column-major.
    pub mvp: Mat4,
    /// Multiplier from packed texcoord integers back to floats.
    pub uv_scale: [f32; 2],
    pub _pad: [f32; 2], // 16-byte alignment
}

const _: () = assert!(core::mem::size_of::<Vertex>() == 20);
const _: () = assert!(core::mem::size_of::<Uniform>() % 16 == 0);
