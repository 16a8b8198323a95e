use crate::backend::ImageId;
use crate::coords::PixelRect;
use crate::state::StateBits;

/// Arguments of one recorded primitive.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DrawArgs {
    pub texture: ImageId,
    pub state: StateBits,
    pub base_vertex: u32,
    pub num_vertices: u32,
    pub uniform_index: u32,
}

/// Recorded command stream for a frame.
///
/// Commands are replayed strictly in recording order; nothing is sorted or merged.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Command {
    Draw(DrawArgs),
    Viewport(PixelRect),
    Scissor(PixelRect),
}
