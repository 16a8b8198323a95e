//! Integer pixel rectangles shared by commands and backends.
//!
//! Rects carry their own origin convention: top-left (+Y down, the wgpu
//! convention) or bottom-left (+Y up, the GL convention). Backends normalize
//! to their native origin with [`PixelRect::to_top_left`].

mod rect;

pub use rect::PixelRect;
