//! Marduk immediate-mode GL layer.
//!
//! Geometry is described GL 1.x style (`begin`, vertices, `end`) into
//! fixed-capacity per-frame buffers and replayed once per frame as a short,
//! ordered list of pipeline / binding / draw calls on a [`Backend`].
//!
//! ```no_run
//! use marduk_gl::{Context, GlDesc, PrimitiveType, TraceBackend};
//!
//! let mut backend = TraceBackend::new();
//! let mut gl = Context::setup(&mut backend, GlDesc::default())?;
//!
//! gl.begin(PrimitiveType::Triangles);
//! gl.v2f_c4b(0.0, 0.5, 255, 0, 0, 255);
//! gl.v2f_c4b(-0.5, -0.5, 0, 255, 0, 255);
//! gl.v2f_c4b(0.5, -0.5, 0, 0, 255, 255);
//! gl.end();
//!
//! let stats = gl.draw(&mut backend);
//! assert_eq!(stats.draws, 1);
//!
//! gl.shutdown(&mut backend);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod backend;
pub mod coords;
pub mod device;
pub mod logging;
pub mod math;
pub mod paint;
pub mod state;

mod config;
mod context;
mod error;
mod pipeline;
mod playback;
mod record;

pub use backend::{Backend, ImageId, PassTarget, TraceBackend, WgpuBackend};
pub use config::GlDesc;
pub use context::Context;
pub use error::RecordError;
pub use math::{Mat4, MatrixMode};
pub use paint::Color;
pub use playback::FrameStats;
pub use record::RecordStats;
pub use state::{PrimitiveType, StateFlag};
