//! Per-frame recording buffers.
//!
//! Responsibilities:
//! - own the vertex, uniform and command buffers, each sized once at setup
//! - map a full buffer to the matching [`RecordError`]
//! - rewind all three at once after playback

mod arena;
mod cmd;
mod vertex;

pub use cmd::{Command, DrawArgs};
pub use vertex::{Uniform, Vertex};

use crate::RecordError;

use arena::FixedBuf;

/// Snapshot of how much of each buffer the current frame has used.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct RecordStats {
    pub vertices: usize,
    pub uniforms: usize,
    pub commands: usize,
}

#[derive(Debug)]
pub(crate) struct Recorder {
    vertices: FixedBuf<Vertex>,
    uniforms: FixedBuf<Uniform>,
    commands: FixedBuf<Command>,
}

impl Recorder {
    /// Uniform and command buffers share `max_commands`: one uniform block per draw.
    pub(crate) fn new(max_vertices: usize, max_commands: usize) -> Self {
        Self {
            vertices: FixedBuf::with_capacity(max_vertices),
            uniforms: FixedBuf::with_capacity(max_commands),
            commands: FixedBuf::with_capacity(max_commands),
        }
    }

    #[inline]
    pub(crate) fn push_vertex(&mut self, v: Vertex) -> Result<usize, RecordError> {
        self.vertices.push(v).ok_or(RecordError::VerticesFull)
    }

    #[inline]
    pub(crate) fn push_uniform(&mut self, u: Uniform) -> Result<usize, RecordError> {
        self.uniforms.push(u).ok_or(RecordError::UniformsFull)
    }

    #[inline]
    pub(crate) fn push_command(&mut self, c: Command) -> Result<usize, RecordError> {
        self.commands.push(c).ok_or(RecordError::CommandsFull)
    }

    /// Index the next vertex will receive.
    #[inline]
    pub(crate) fn vertex_cursor(&self) -> usize {
        self.vertices.len()
    }

    /// Index the next uniform block will receive.
    #[inline]
    pub(crate) fn uniform_cursor(&self) -> usize {
        self.uniforms.len()
    }

    #[inline]
    pub(crate) fn vertices(&self) -> &[Vertex] {
        self.vertices.as_slice()
    }

    #[inline]
    pub(crate) fn commands(&self) -> &[Command] {
        self.commands.as_slice()
    }

    #[inline]
    pub(crate) fn uniform(&self, index: u32) -> Option<&Uniform> {
        self.uniforms.get(index as usize)
    }

    pub(crate) fn stats(&self) -> RecordStats {
        RecordStats {
            vertices: self.vertices.len(),
            uniforms: self.uniforms.len(),
            commands: self.commands.len(),
        }
    }

    /// Capacities, in the same shape as [`stats`](Self::stats).
    pub(crate) fn capacity(&self) -> RecordStats {
        RecordStats {
            vertices: self.vertices.capacity(),
            uniforms: self.uniforms.capacity(),
            commands: self.commands.capacity(),
        }
    }

    pub(crate) fn rewind(&mut self) {
        self.vertices.rewind();
        self.uniforms.rewind();
        self.commands.rewind();
    }
}
