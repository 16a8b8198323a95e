//! Per-vertex paint attributes and their compact encodings.
//!
//! Scope:
//! - RGBA colors packed into one `u32` (red in the low byte)
//! - texture coordinates packed as `i16` fixed point with a configurable integer part

pub mod color;
pub mod texcoord;

pub use color::Color;
pub use texcoord::{TexcoordScale, MAX_TEXCOORD_BITS};
