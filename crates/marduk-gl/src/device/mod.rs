//! Headless GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue without a window
//! - creating offscreen render targets for the wgpu backend

mod gpu;
mod target;

pub use gpu::{Gpu, GpuInit};
pub use target::OffscreenTarget;
