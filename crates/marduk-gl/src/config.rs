/// Setup parameters for a [`Context`](crate::Context).
///
/// Capacities are fixed for the lifetime of the context; recording past them
/// drops the frame instead of growing the buffers. Zero capacities fall back
/// to the defaults.
#[derive(Debug, Clone)]
pub struct GlDesc {
    /// Vertex buffer capacity per frame.
    pub max_vertices: usize,

    /// Command (and uniform block) capacity per frame.
    pub max_commands: usize,

    /// Pushes allowed on each matrix stack above its base matrix.
    pub matrix_stack_depth: usize,

    /// Color target format, forwarded verbatim to pipeline creation.
    pub color_format: wgpu::TextureFormat,

    /// Depth target format. `None` renders without a depth attachment and the
    /// depth-test flag then only affects pipeline selection.
    pub depth_format: Option<wgpu::TextureFormat>,

    /// MSAA sample count, forwarded verbatim to pipeline creation.
    pub sample_count: u32,
}

impl GlDesc {
    pub const DEFAULT_MAX_VERTICES: usize = 1 << 16;
    pub const DEFAULT_MAX_COMMANDS: usize = 1 << 14;
    pub const DEFAULT_STACK_DEPTH: usize = 64;

    /// Replaces zero fields with defaults.
    pub(crate) fn resolved(&self) -> Self {
        fn or(v: usize, d: usize) -> usize {
            if v == 0 { d } else { v }
        }
        Self {
            max_vertices: or(self.max_vertices, Self::DEFAULT_MAX_VERTICES),
            max_commands: or(self.max_commands, Self::DEFAULT_MAX_COMMANDS),
            matrix_stack_depth: or(self.matrix_stack_depth, Self::DEFAULT_STACK_DEPTH),
            sample_count: self.sample_count.max(1),
            ..self.clone()
        }
    }
}

impl Default for GlDesc {
    fn default() -> Self {
        Self {
            max_vertices: Self::DEFAULT_MAX_VERTICES,
            max_commands: Self::DEFAULT_MAX_COMMANDS,
            matrix_stack_depth: Self::DEFAULT_STACK_DEPTH,
            color_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            depth_format: None,
            sample_count: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fields_fall_back_to_defaults() {
        let d = GlDesc {
            max_vertices: 0,
            max_commands: 0,
            matrix_stack_depth: 0,
            sample_count: 0,
            ..GlDesc::default()
        }
        .resolved();
        assert_eq!(d.max_vertices, 65536);
        assert_eq!(d.max_commands, 16384);
        assert_eq!(d.matrix_stack_depth, 64);
        assert_eq!(d.sample_count, 1);
    }

    #[test]
    fn explicit_fields_are_kept() {
        let d = GlDesc { max_vertices: 3, ..GlDesc::default() }.resolved();
        assert_eq!(d.max_vertices, 3);
    }
}
