//! Transform math.
//!
//! - `Mat4`: column-major 4×4 matrix with the OpenGL-style builders
//! - three bounded matrix stacks (model-view, projection, texture)

mod mat4;
mod stack;

pub use mat4::Mat4;
pub use stack::MatrixMode;

pub(crate) use stack::MatrixStacks;
