//! Frame replay: turns the recorded command list into backend calls.

use crate::backend::{Backend, Bindings, ShaderStage};
use crate::context::Context;
use crate::record::Command;

/// What one [`Context::draw`] did.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    /// Commands replayed; 0 when the frame was skipped.
    pub commands: usize,
    /// Backend draw calls issued.
    pub draws: usize,
    pub vertices_uploaded: usize,
    /// `true` when the frame was dropped because of a recording error.
    pub skipped: bool,
}

impl Context {
    /// Replays the frame through `backend`, then rewinds the recording buffers
    /// and clears the error.
    ///
    /// A frame with a recording error issues no backend calls at all. An
    /// empty frame (no vertices or no commands) issues none either, but is not
    /// reported as skipped.
    ///
    /// Calling it between `begin` and `end` panics in debug builds; otherwise
    /// the open primitive is closed as `end` would and the frame is replayed.
    pub fn draw(&mut self, backend: &mut impl Backend) -> FrameStats {
        debug_assert!(!self.is_recording(), "draw called between begin and end");
        if self.is_recording() {
            log::error!("marduk-gl: draw called between begin and end; closing the open primitive");
            self.end();
        }

        let mut stats = FrameStats::default();

        if let Some(e) = self.error {
            let s = self.recorder.stats();
            log::warn!(
                "marduk-gl: frame dropped ({e}): {} vertices, {} commands",
                s.vertices,
                s.commands
            );
            stats.skipped = true;
        } else if !self.recorder.vertices().is_empty() && !self.recorder.commands().is_empty() {
            self.replay(backend, &mut stats);
        }

        self.rewind();
        stats
    }

    fn replay(&mut self, backend: &mut impl Backend, stats: &mut FrameStats) {
        let vertices = self.recorder.vertices();
        backend.update_buffer(self.vertex_buffer, bytemuck::cast_slice(vertices));
        stats.vertices_uploaded = vertices.len();

        for cmd in self.recorder.commands() {
            stats.commands += 1;
            match *cmd {
                Command::Viewport(rect) => backend.apply_viewport(rect),
                Command::Scissor(rect) => backend.apply_scissor_rect(rect),
                Command::Draw(args) => {
                    let Some(pipeline) = self.pipelines.resolve(backend, args.state) else {
                        continue;
                    };
                    let Some(uniform) = self.recorder.uniform(args.uniform_index) else {
                        log::warn!("marduk-gl: draw without uniform block {}", args.uniform_index);
                        continue;
                    };

                    backend.apply_pipeline(pipeline);
                    backend.apply_bindings(&Bindings {
                        vertex_buffer: self.vertex_buffer,
                        vertex_offset: 0,
                        image: args.texture,
                    });
                    backend.apply_uniforms(ShaderStage::Vertex, 0, bytemuck::bytes_of(uniform));
                    backend.draw(args.base_vertex, args.num_vertices, 1);
                    stats.draws += 1;
                }
            }
        }
    }
}
