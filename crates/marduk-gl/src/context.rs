use core::mem::size_of;

use anyhow::{Context as _, Result};

use crate::backend::{Backend, BufferDesc, BufferId, ImageDesc, ImageId, ShaderDesc, ShaderId};
use crate::config::GlDesc;
use crate::coords::PixelRect;
use crate::math::{Mat4, MatrixMode, MatrixStacks};
use crate::paint::color::{pack_rgba8, WHITE};
use crate::paint::{Color, TexcoordScale, MAX_TEXCOORD_BITS};
use crate::pipeline::{PipelineCache, PipelineTemplate};
use crate::record::{Command, DrawArgs, RecordStats, Recorder, Uniform, Vertex};
use crate::state::{PrimitiveType, StateBits, StateFlag};
use crate::RecordError;

/// Immediate-mode recording context.
///
/// Frame flow:
/// - state calls (`enable`, `viewport`, matrix ops, ...) while idle
/// - `begin(prim)`, vertex calls, `end()` for each primitive
/// - [`draw`](Self::draw) replays the frame through a [`Backend`] and rewinds
///
/// State calls between `begin` and `end` are programmer errors: they panic
/// in debug builds and are logged and ignored otherwise. Capacity and stack
/// errors are recoverable and reported through [`error`](Self::error).
///
/// GPU resources are released by [`shutdown`](Self::shutdown); dropping a
/// context without it leaks them on the backend side.
#[derive(Debug)]
pub struct Context {
    pub(crate) recorder: Recorder,
    pub(crate) pipelines: PipelineCache,
    pub(crate) vertex_buffer: BufferId,
    pub(crate) error: Option<RecordError>,

    stacks: MatrixStacks,
    state: StateBits,
    in_begin: bool,
    base_vertex: usize,

    // pending paint
    uv: [i16; 2],
    rgba: u32,
    tex_scale: TexcoordScale,

    texture: ImageId,
    default_image: ImageId,
    shader: ShaderId,
}

impl Context {
    // ── lifecycle ────────────────────────────────────────────────────────

    /// Allocates the recording buffers and creates the backend resources:
    /// one streaming vertex buffer, a 1×1 white default texture and the shader.
    pub fn setup(backend: &mut impl Backend, desc: GlDesc) -> Result<Self> {
        let desc = desc.resolved();

        // Draw commands address vertices and uniform blocks with u32.
        anyhow::ensure!(
            u32::try_from(desc.max_vertices).is_ok(),
            "max_vertices {} does not fit in u32",
            desc.max_vertices
        );
        anyhow::ensure!(
            u32::try_from(desc.max_commands).is_ok(),
            "max_commands {} does not fit in u32",
            desc.max_commands
        );
        let vertex_bytes = (desc.max_vertices as u64) * size_of::<Vertex>() as u64;

        let vertex_buffer = backend
            .make_buffer(&BufferDesc {
                label: "marduk-gl vertex buffer",
                size: vertex_bytes,
            })
            .context("failed to create vertex buffer")?;

        let default_image = match backend.make_image(&ImageDesc {
            label: "marduk-gl default texture",
            width: 1,
            height: 1,
            pixels: &WHITE.to_le_bytes(),
        }) {
            Ok(id) => id,
            Err(e) => {
                backend.destroy_buffer(vertex_buffer);
                return Err(e.context("failed to create default texture"));
            }
        };

        let shader = match backend.make_shader(&ShaderDesc {
            label: "marduk-gl shader",
            uniform_size: size_of::<Uniform>() as u64,
            max_uniform_updates: desc.max_commands as u32,
        }) {
            Ok(id) => id,
            Err(e) => {
                backend.destroy_image(default_image);
                backend.destroy_buffer(vertex_buffer);
                return Err(e.context("failed to create shader"));
            }
        };

        log::debug!(
            "marduk-gl setup: {} vertices, {} commands, stack depth {}",
            desc.max_vertices,
            desc.max_commands,
            desc.matrix_stack_depth
        );

        Ok(Self {
            recorder: Recorder::new(desc.max_vertices, desc.max_commands),
            pipelines: PipelineCache::new(PipelineTemplate {
                shader,
                color_format: desc.color_format,
                depth_format: desc.depth_format,
                sample_count: desc.sample_count,
            }),
            vertex_buffer,
            error: None,
            stacks: MatrixStacks::new(desc.matrix_stack_depth),
            state: StateBits::new(),
            in_begin: false,
            base_vertex: 0,
            uv: [0, 0],
            rgba: WHITE,
            tex_scale: TexcoordScale::default(),
            texture: default_image,
            default_image,
            shader,
        })
    }

    /// Destroys every backend resource owned by the context.
    pub fn shutdown(mut self, backend: &mut impl Backend) {
        debug_assert!(!self.in_begin, "shutdown between begin and end");
        log::debug!("marduk-gl shutdown: {} pipelines", self.pipelines.len());

        self.pipelines.destroy_all(backend);
        backend.destroy_shader(self.shader);
        backend.destroy_image(self.default_image);
        backend.destroy_buffer(self.vertex_buffer);
    }

    // ── queries ──────────────────────────────────────────────────────────

    /// Most recent error recorded this frame.
    #[inline]
    pub fn error(&self) -> Option<RecordError> {
        self.error
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        self.in_begin
    }

    #[inline]
    pub fn stats(&self) -> RecordStats {
        self.recorder.stats()
    }

    /// Buffer capacities fixed at setup.
    #[inline]
    pub fn capacity(&self) -> RecordStats {
        self.recorder.capacity()
    }

    #[inline]
    pub fn default_texture(&self) -> ImageId {
        self.default_image
    }

    #[inline]
    pub fn texture(&self) -> ImageId {
        self.texture
    }

    #[inline]
    pub fn is_enabled(&self, flag: StateFlag) -> bool {
        self.state.is_enabled(flag)
    }

    #[inline]
    pub fn current_matrix_mode(&self) -> MatrixMode {
        self.stacks.mode()
    }

    /// Top of the `mode` stack.
    #[inline]
    pub fn matrix(&self, mode: MatrixMode) -> Mat4 {
        *self.stacks.get(mode).top()
    }

    /// Number of pushes currently on the selected stack.
    #[inline]
    pub fn matrix_depth(&self) -> usize {
        self.stacks.get(self.stacks.mode()).top_index()
    }

    #[inline]
    fn fail(&mut self, e: RecordError) {
        self.error = Some(e);
    }

    /// `false` (and a debug panic) when called inside `begin`/`end`.
    fn idle(&self, op: &str) -> bool {
        debug_assert!(!self.in_begin, "{op} called between begin and end");
        if self.in_begin {
            log::error!("marduk-gl: {op} called between begin and end; ignored");
            return false;
        }
        true
    }

    // ── render state ─────────────────────────────────────────────────────

    pub fn enable(&mut self, flag: StateFlag) {
        if self.idle("enable") {
            self.state = self.state.enable(flag);
        }
    }

    pub fn disable(&mut self, flag: StateFlag) {
        if self.idle("disable") {
            self.state = self.state.disable(flag);
        }
    }

    /// Records a viewport change, applied in order during playback.
    pub fn viewport(&mut self, x: i32, y: i32, w: i32, h: i32, origin_top_left: bool) {
        if !self.idle("viewport") {
            return;
        }
        let rect = PixelRect::new(x, y, w, h, origin_top_left);
        if let Err(e) = self.recorder.push_command(Command::Viewport(rect)) {
            self.fail(e);
        }
    }

    /// Records a scissor change, applied in order during playback.
    pub fn scissor_rect(&mut self, x: i32, y: i32, w: i32, h: i32, origin_top_left: bool) {
        if !self.idle("scissor_rect") {
            return;
        }
        let rect = PixelRect::new(x, y, w, h, origin_top_left);
        if let Err(e) = self.recorder.push_command(Command::Scissor(rect)) {
            self.fail(e);
        }
    }

    /// Texture for subsequent primitives. `None` selects the default white texture.
    pub fn set_texture(&mut self, texture: Option<ImageId>) {
        if self.idle("set_texture") {
            self.texture = texture.unwrap_or(self.default_image);
        }
    }

    /// Integer bits (0..=15) of the fixed-point texture coordinates, per axis.
    ///
    /// Affects coordinates packed after the call; the pending texcoord keeps its packing.
    pub fn texcoord_int_bits(&mut self, u_bits: u32, v_bits: u32) {
        debug_assert!(
            u_bits <= MAX_TEXCOORD_BITS && v_bits <= MAX_TEXCOORD_BITS,
            "texcoord bits out of range: {u_bits}, {v_bits}"
        );
        if self.idle("texcoord_int_bits") {
            self.tex_scale = TexcoordScale::from_int_bits(u_bits, v_bits);
        }
    }

    // ── pending paint ────────────────────────────────────────────────────

    pub fn t2f(&mut self, u: f32, v: f32) {
        self.uv = self.tex_scale.pack(u, v);
    }

    pub fn c3f(&mut self, r: f32, g: f32, b: f32) {
        self.rgba = Color::rgb(r, g, b).pack();
    }

    pub fn c4f(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.rgba = Color::rgba(r, g, b, a).pack();
    }

    pub fn c3b(&mut self, r: u8, g: u8, b: u8) {
        self.rgba = pack_rgba8(r, g, b, 255);
    }

    pub fn c4b(&mut self, r: u8, g: u8, b: u8, a: u8) {
        self.rgba = pack_rgba8(r, g, b, a);
    }

    /// Packed RGBA, red in the low byte.
    pub fn c1i(&mut self, rgba: u32) {
        self.rgba = rgba;
    }

    // ── primitives ───────────────────────────────────────────────────────

    pub fn begin(&mut self, prim: PrimitiveType) {
        debug_assert!(!self.in_begin, "begin called twice without end");
        if self.in_begin {
            log::error!("marduk-gl: begin called twice without end; ignored");
            return;
        }
        self.in_begin = true;
        self.base_vertex = self.recorder.vertex_cursor();
        self.state = self.state.with_primitive_type(prim);
    }

    /// Closes the primitive: one draw command plus one uniform block, or
    /// nothing when no vertex was recorded since `begin`.
    pub fn end(&mut self) {
        debug_assert!(self.in_begin, "end called without begin");
        if !self.in_begin {
            log::error!("marduk-gl: end called without begin; ignored");
            return;
        }
        self.in_begin = false;

        let cursor = self.recorder.vertex_cursor();
        let num_vertices = match cursor.checked_sub(self.base_vertex) {
            Some(0) => return,
            Some(n) => n,
            None => {
                log::error!(
                    "marduk-gl: vertex cursor {cursor} behind primitive start {}; primitive dropped",
                    self.base_vertex
                );
                return;
            }
        };

        let draw = DrawArgs {
            texture: self.texture,
            state: self.state,
            base_vertex: self.base_vertex as u32,
            num_vertices: num_vertices as u32,
            uniform_index: self.recorder.uniform_cursor() as u32,
        };
        if let Err(e) = self.recorder.push_command(Command::Draw(draw)) {
            self.fail(e);
        }

        let uniform = Uniform {
            mvp: self.stacks.mvp(),
            uv_scale: self.tex_scale.descale(),
            _pad: [0.0; 2],
        };
        if let Err(e) = self.recorder.push_uniform(uniform) {
            self.fail(e);
        }
    }

    #[inline]
    fn vtx(&mut self, pos: [f32; 3], uv: [i16; 2], rgba: u32) {
        debug_assert!(self.in_begin, "vertex outside begin/end");
        if !self.in_begin {
            log::error!("marduk-gl: vertex outside begin/end; ignored");
            return;
        }
        if let Err(e) = self.recorder.push_vertex(Vertex { pos, uv, rgba }) {
            self.fail(e);
        }
    }

    // ── vertices ─────────────────────────────────────────────────────────

    pub fn v2f(&mut self, x: f32, y: f32) {
        self.vtx([x, y, 0.0], self.uv, self.rgba);
    }

    pub fn v3f(&mut self, x: f32, y: f32, z: f32) {
        self.vtx([x, y, z], self.uv, self.rgba);
    }

    pub fn v2f_t2f(&mut self, x: f32, y: f32, u: f32, v: f32) {
        self.vtx([x, y, 0.0], self.tex_scale.pack(u, v), self.rgba);
    }

    pub fn v3f_t2f(&mut self, x: f32, y: f32, z: f32, u: f32, v: f32) {
        self.vtx([x, y, z], self.tex_scale.pack(u, v), self.rgba);
    }

    pub fn v2f_c4f(&mut self, x: f32, y: f32, r: f32, g: f32, b: f32, a: f32) {
        self.vtx([x, y, 0.0], self.uv, Color::rgba(r, g, b, a).pack());
    }

    pub fn v2f_c4b(&mut self, x: f32, y: f32, r: u8, g: u8, b: u8, a: u8) {
        self.vtx([x, y, 0.0], self.uv, pack_rgba8(r, g, b, a));
    }

    pub fn v2f_c1i(&mut self, x: f32, y: f32, rgba: u32) {
        self.vtx([x, y, 0.0], self.uv, rgba);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn v3f_c4f(&mut self, x: f32, y: f32, z: f32, r: f32, g: f32, b: f32, a: f32) {
        self.vtx([x, y, z], self.uv, Color::rgba(r, g, b, a).pack());
    }

    #[allow(clippy::too_many_arguments)]
    pub fn v3f_c4b(&mut self, x: f32, y: f32, z: f32, r: u8, g: u8, b: u8, a: u8) {
        self.vtx([x, y, z], self.uv, pack_rgba8(r, g, b, a));
    }

    pub fn v3f_c1i(&mut self, x: f32, y: f32, z: f32, rgba: u32) {
        self.vtx([x, y, z], self.uv, rgba);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn v2f_t2f_c4f(&mut self, x: f32, y: f32, u: f32, v: f32, r: f32, g: f32, b: f32, a: f32) {
        self.vtx([x, y, 0.0], self.tex_scale.pack(u, v), Color::rgba(r, g, b, a).pack());
    }

    #[allow(clippy::too_many_arguments)]
    pub fn v2f_t2f_c4b(&mut self, x: f32, y: f32, u: f32, v: f32, r: u8, g: u8, b: u8, a: u8) {
        self.vtx([x, y, 0.0], self.tex_scale.pack(u, v), pack_rgba8(r, g, b, a));
    }

    pub fn v2f_t2f_c1i(&mut self, x: f32, y: f32, u: f32, v: f32, rgba: u32) {
        self.vtx([x, y, 0.0], self.tex_scale.pack(u, v), rgba);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn v3f_t2f_c4f(
        &mut self,
        x: f32,
        y: f32,
        z: f32,
        u: f32,
        v: f32,
        r: f32,
        g: f32,
        b: f32,
        a: f32,
    ) {
        self.vtx([x, y, z], self.tex_scale.pack(u, v), Color::rgba(r, g, b, a).pack());
    }

    #[allow(clippy::too_many_arguments)]
    pub fn v3f_t2f_c4b(
        &mut self,
        x: f32,
        y: f32,
        z: f32,
        u: f32,
        v: f32,
        r: u8,
        g: u8,
        b: u8,
        a: u8,
    ) {
        self.vtx([x, y, z], self.tex_scale.pack(u, v), pack_rgba8(r, g, b, a));
    }

    pub fn v3f_t2f_c1i(&mut self, x: f32, y: f32, z: f32, u: f32, v: f32, rgba: u32) {
        self.vtx([x, y, z], self.tex_scale.pack(u, v), rgba);
    }

    // ── matrices ─────────────────────────────────────────────────────────

    /// Selects the stack subsequent matrix calls operate on.
    pub fn matrix_mode(&mut self, mode: MatrixMode) {
        if self.idle("matrix_mode") {
            self.stacks.set_mode(mode);
        }
    }

    pub fn load_identity(&mut self) {
        if self.idle("load_identity") {
            *self.stacks.current().top_mut() = Mat4::IDENTITY;
        }
    }

    pub fn load_matrix_cm(&mut self, m: &[f32; 16]) {
        if self.idle("load_matrix_cm") {
            *self.stacks.current().top_mut() = Mat4::from_cols_slice(m);
        }
    }

    pub fn load_matrix_rm(&mut self, m: &[f32; 16]) {
        if self.idle("load_matrix_rm") {
            *self.stacks.current().top_mut() = Mat4::from_rows_slice(m);
        }
    }

    pub fn mult_matrix_cm(&mut self, m: &[f32; 16]) {
        self.mult("mult_matrix_cm", Mat4::from_cols_slice(m));
    }

    pub fn mult_matrix_rm(&mut self, m: &[f32; 16]) {
        self.mult("mult_matrix_rm", Mat4::from_rows_slice(m));
    }

    /// Rotation by `angle` radians around `(x, y, z)`.
    pub fn rotate(&mut self, angle: f32, x: f32, y: f32, z: f32) {
        self.mult("rotate", Mat4::rotation(angle, x, y, z));
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.mult("scale", Mat4::scaling(x, y, z));
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.mult("translate", Mat4::translation(x, y, z));
    }

    pub fn frustum(&mut self, l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) {
        self.mult("frustum", Mat4::frustum(l, r, b, t, n, f));
    }

    pub fn ortho(&mut self, l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) {
        self.mult("ortho", Mat4::ortho(l, r, b, t, n, f));
    }

    /// `ortho` with near -1 and far 1.
    pub fn ortho2d(&mut self, l: f32, r: f32, b: f32, t: f32) {
        self.mult("ortho2d", Mat4::ortho(l, r, b, t, -1.0, 1.0));
    }

    /// `fov_y` in radians.
    pub fn perspective(&mut self, fov_y: f32, aspect: f32, z_near: f32, z_far: f32) {
        self.mult("perspective", Mat4::perspective(fov_y, aspect, z_near, z_far));
    }

    pub fn lookat(&mut self, eye: [f32; 3], center: [f32; 3], up: [f32; 3]) {
        self.mult("lookat", Mat4::look_at(eye, center, up));
    }

    fn mult(&mut self, op: &str, m: Mat4) {
        if self.idle(op) {
            self.stacks.mul_top(m);
        }
    }

    pub fn push_matrix(&mut self) {
        if !self.idle("push_matrix") {
            return;
        }
        if let Err(e) = self.stacks.current().push() {
            self.fail(e);
        }
    }

    pub fn pop_matrix(&mut self) {
        if !self.idle("pop_matrix") {
            return;
        }
        if let Err(e) = self.stacks.current().pop() {
            self.fail(e);
        }
    }

    /// Clears the per-frame buffers and the error after playback.
    pub(crate) fn rewind(&mut self) {
        self.recorder.rewind();
        self.base_vertex = 0;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Call, TraceBackend};
    use crate::paint::color::unpack_rgba8;

    fn ctx() -> (Context, TraceBackend) {
        let mut be = TraceBackend::new();
        let ctx = Context::setup(&mut be, GlDesc::default()).expect("setup");
        (ctx, be)
    }

    fn small(max_vertices: usize, max_commands: usize) -> (Context, TraceBackend) {
        let mut be = TraceBackend::new();
        let desc = GlDesc { max_vertices, max_commands, ..GlDesc::default() };
        let ctx = Context::setup(&mut be, desc).expect("setup");
        (ctx, be)
    }

    fn draws(ctx: &Context) -> Vec<DrawArgs> {
        ctx.recorder
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::Draw(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    // ── setup / shutdown ─────────────────────────────────────────────────

    #[test]
    fn setup_creates_buffer_texture_and_shader() {
        let (ctx, be) = ctx();
        assert_eq!(
            be.calls(),
            &[
                Call::MakeBuffer { id: ctx.vertex_buffer, size: 65536 * 20 },
                Call::MakeImage { id: ctx.default_texture(), width: 1, height: 1 },
                Call::MakeShader { id: ctx.shader, uniform_size: 80 },
            ]
        );
        assert_eq!(ctx.texture(), ctx.default_texture());
        assert_eq!(
            ctx.capacity(),
            RecordStats { vertices: 65536, uniforms: 16384, commands: 16384 }
        );
        assert_eq!(ctx.error(), None);
        assert!(!ctx.is_recording());
    }

    #[test]
    fn shutdown_destroys_everything_it_created() {
        let (mut ctx, mut be) = ctx();
        ctx.begin(PrimitiveType::Triangles);
        ctx.v2f(0.0, 0.0);
        ctx.end();
        ctx.draw(&mut be);
        be.clear();

        ctx.shutdown(&mut be);
        assert_eq!(be.count(|c| matches!(c, Call::DestroyPipeline(_))), 1);
        assert_eq!(be.count(|c| matches!(c, Call::DestroyShader(_))), 1);
        assert_eq!(be.count(|c| matches!(c, Call::DestroyImage(_))), 1);
        assert_eq!(be.count(|c| matches!(c, Call::DestroyBuffer(_))), 1);
    }

    // ── begin / end ──────────────────────────────────────────────────────

    #[test]
    fn one_draw_per_non_empty_primitive() {
        let (mut ctx, _be) = ctx();
        for n in [3, 0, 2, 0, 0, 5] {
            ctx.begin(PrimitiveType::Triangles);
            for i in 0..n {
                ctx.v2f(i as f32, 0.0);
            }
            ctx.end();
        }
        let d = draws(&ctx);
        assert_eq!(d.len(), 3);
        assert_eq!(ctx.stats().uniforms, 3);
        assert_eq!(
            d.iter().map(|d| (d.base_vertex, d.num_vertices)).collect::<Vec<_>>(),
            [(0, 3), (3, 2), (5, 5)]
        );
        assert_eq!(d.iter().map(|d| d.uniform_index).collect::<Vec<_>>(), [0, 1, 2]);
    }

    #[test]
    fn draw_captures_state_and_texture() {
        let (mut ctx, _be) = ctx();
        ctx.enable(StateFlag::Blend);
        ctx.set_texture(Some(ImageId(7)));
        ctx.begin(PrimitiveType::LineStrip);
        ctx.v2f(0.0, 0.0);
        ctx.v2f(1.0, 1.0);
        ctx.end();

        let d = draws(&ctx)[0];
        assert_eq!(d.texture, ImageId(7));
        assert_eq!(d.state.primitive_type(), PrimitiveType::LineStrip);
        assert!(d.state.is_enabled(StateFlag::Blend));
        assert!(!d.state.is_enabled(StateFlag::DepthTest));
    }

    #[test]
    fn set_texture_none_restores_default() {
        let (mut ctx, _be) = ctx();
        ctx.set_texture(Some(ImageId(9)));
        ctx.set_texture(None);
        assert_eq!(ctx.texture(), ctx.default_texture());
    }

    #[test]
    fn uniform_snapshots_projection_times_modelview() {
        let (mut ctx, _be) = ctx();
        ctx.matrix_mode(MatrixMode::Projection);
        ctx.ortho(0.0, 2.0, 0.0, 2.0, -1.0, 1.0);
        ctx.matrix_mode(MatrixMode::ModelView);
        ctx.translate(1.0, 0.0, 0.0);
        ctx.texcoord_int_bits(2, 0);

        ctx.begin(PrimitiveType::Points);
        ctx.v2f(0.0, 0.0);
        ctx.end();

        let u = ctx.recorder.uniform(0).copied().expect("uniform");
        let expected = ctx.matrix(MatrixMode::Projection) * ctx.matrix(MatrixMode::ModelView);
        assert_eq!(u.mvp, expected);
        assert_eq!(u.uv_scale, [4.0 / 32768.0, 1.0 / 32768.0]);

        // (0,0) translated to x=1, then mapped from [0,2] to NDC 0.
        let clip = u.mvp.transform([0.0, 0.0, 0.0, 1.0]);
        assert!(clip[0].abs() < 1e-6);
    }

    // ── paint ────────────────────────────────────────────────────────────

    #[test]
    fn pending_paint_applies_to_plain_vertices() {
        let (mut ctx, _be) = ctx();
        ctx.t2f(0.5, 0.25);
        ctx.c4b(1, 2, 3, 4);
        ctx.begin(PrimitiveType::Points);
        ctx.v3f(1.0, 2.0, 3.0);
        ctx.end();

        let v = ctx.recorder.vertices()[0];
        assert_eq!(v.pos, [1.0, 2.0, 3.0]);
        assert_eq!(v.uv, [16384, 8192]);
        assert_eq!(unpack_rgba8(v.rgba), [1, 2, 3, 4]);
    }

    #[test]
    fn explicit_attributes_override_pending_without_changing_it() {
        let (mut ctx, _be) = ctx();
        ctx.c1i(0x1122_3344);
        ctx.begin(PrimitiveType::Points);
        ctx.v2f_t2f_c4f(0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0);
        ctx.v2f(0.0, 0.0);
        ctx.end();

        let v = ctx.recorder.vertices();
        assert_eq!(unpack_rgba8(v[0].rgba), [255, 0, 0, 255]);
        assert_eq!(v[0].uv, [32767, 0]);
        assert_eq!(v[1].rgba, 0x1122_3344);
        assert_eq!(v[1].uv, [0, 0]);
    }

    #[test]
    fn three_component_colors_are_opaque() {
        let (mut ctx, _be) = ctx();
        ctx.c3f(0.0, 1.0, 0.0);
        assert_eq!(unpack_rgba8(ctx.rgba), [0, 255, 0, 255]);
        ctx.c3b(9, 8, 7);
        assert_eq!(unpack_rgba8(ctx.rgba), [9, 8, 7, 255]);
    }

    #[test]
    fn paint_setters_are_legal_while_recording() {
        let (mut ctx, _be) = ctx();
        ctx.begin(PrimitiveType::Lines);
        ctx.c4f(0.0, 0.0, 1.0, 1.0);
        ctx.v2f(0.0, 0.0);
        ctx.t2f(1.0, 1.0);
        ctx.v2f(1.0, 1.0);
        ctx.end();
        assert_eq!(ctx.stats().vertices, 2);
        assert_eq!(ctx.stats().commands, 1);
        assert_eq!(ctx.error(), None);
    }

    // ── capacity ─────────────────────────────────────────────────────────

    #[test]
    fn vertex_overflow_is_sticky() {
        let (mut ctx, _be) = small(4, 16);
        ctx.begin(PrimitiveType::Points);
        for _ in 0..5 {
            ctx.v2f(0.0, 0.0);
        }
        ctx.end();
        assert_eq!(ctx.error(), Some(RecordError::VerticesFull));
        assert_eq!(ctx.stats().vertices, 4);

        ctx.begin(PrimitiveType::Points);
        ctx.end();
        assert_eq!(ctx.error(), Some(RecordError::VerticesFull));
    }

    #[test]
    fn command_overflow_keeps_recorded_commands() {
        let (mut ctx, _be) = small(64, 2);
        for _ in 0..3 {
            ctx.viewport(0, 0, 1, 1, true);
        }
        assert_eq!(ctx.error(), Some(RecordError::CommandsFull));
        assert_eq!(ctx.stats().commands, 2);
    }

    #[test]
    fn most_recent_error_wins() {
        let (mut ctx, _be) = small(64, 1);
        ctx.pop_matrix();
        assert_eq!(ctx.error(), Some(RecordError::StackUnderflow));
        ctx.viewport(0, 0, 1, 1, false);
        ctx.viewport(0, 0, 1, 1, false);
        assert_eq!(ctx.error(), Some(RecordError::CommandsFull));
    }

    // ── matrices ─────────────────────────────────────────────────────────

    #[test]
    fn builders_multiply_onto_the_top() {
        let (mut ctx, _be) = ctx();
        ctx.translate(1.0, 2.0, 3.0);
        ctx.scale(2.0, 2.0, 2.0);
        let m = ctx.matrix(MatrixMode::ModelView);
        assert_eq!(m, Mat4::translation(1.0, 2.0, 3.0) * Mat4::scaling(2.0, 2.0, 2.0));
        // scale applies first: (1,0,0) → (2,0,0) → (3,2,3)
        assert_eq!(m.transform([1.0, 0.0, 0.0, 1.0]), [3.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn row_and_column_major_loads_agree() {
        let (mut ctx, _be) = ctx();
        let cm = Mat4::translation(4.0, 5.0, 6.0).to_cols_array();
        let rm = Mat4::translation(4.0, 5.0, 6.0).transpose().to_cols_array();

        ctx.load_matrix_cm(&cm);
        let a = ctx.matrix(MatrixMode::ModelView);
        ctx.load_matrix_rm(&rm);
        let b = ctx.matrix(MatrixMode::ModelView);
        assert_eq!(a, b);

        ctx.load_identity();
        ctx.mult_matrix_rm(&rm);
        ctx.mult_matrix_cm(&cm);
        assert_eq!(ctx.matrix(MatrixMode::ModelView), Mat4::translation(8.0, 10.0, 12.0));
    }

    #[test]
    fn matrix_ops_act_on_selected_stack_only() {
        let (mut ctx, _be) = ctx();
        ctx.matrix_mode(MatrixMode::Texture);
        ctx.scale(2.0, 2.0, 1.0);
        ctx.push_matrix();
        assert_eq!(ctx.current_matrix_mode(), MatrixMode::Texture);
        assert_eq!(ctx.matrix_depth(), 1);
        assert_eq!(ctx.matrix(MatrixMode::ModelView), Mat4::IDENTITY);
        assert_eq!(ctx.matrix(MatrixMode::Projection), Mat4::IDENTITY);

        ctx.matrix_mode(MatrixMode::ModelView);
        assert_eq!(ctx.matrix_depth(), 0);
    }

    #[test]
    fn stack_overflow_and_underflow_leave_top_unchanged() {
        let mut be = TraceBackend::new();
        let desc = GlDesc { matrix_stack_depth: 3, ..GlDesc::default() };
        let mut ctx = Context::setup(&mut be, desc).expect("setup");

        for _ in 0..3 {
            ctx.push_matrix();
        }
        ctx.translate(1.0, 0.0, 0.0);
        assert_eq!(ctx.error(), None);
        ctx.push_matrix();
        assert_eq!(ctx.error(), Some(RecordError::StackOverflow));
        assert_eq!(ctx.matrix_depth(), 3);
        assert_eq!(ctx.matrix(MatrixMode::ModelView), Mat4::translation(1.0, 0.0, 0.0));

        for _ in 0..3 {
            ctx.pop_matrix();
        }
        ctx.pop_matrix();
        assert_eq!(ctx.error(), Some(RecordError::StackUnderflow));
        assert_eq!(ctx.matrix(MatrixMode::ModelView), Mat4::IDENTITY);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn setup_rejects_capacities_beyond_u32() {
        let too_big = u32::MAX as usize + 1;
        for desc in [
            GlDesc { max_vertices: too_big, ..GlDesc::default() },
            GlDesc { max_commands: too_big, ..GlDesc::default() },
        ] {
            let mut be = TraceBackend::new();
            let err = Context::setup(&mut be, desc).expect_err("oversized capacity");
            assert!(err.to_string().contains("does not fit in u32"), "{err}");
            assert!(be.calls().is_empty());
        }
    }

    // ── contract violations ──────────────────────────────────────────────

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "begin called twice")]
    fn nested_begin_panics_in_debug() {
        let (mut ctx, _be) = ctx();
        ctx.begin(PrimitiveType::Points);
        ctx.begin(PrimitiveType::Points);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "end called without begin")]
    fn end_without_begin_panics_in_debug() {
        let (mut ctx, _be) = ctx();
        ctx.end();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "enable called between begin and end")]
    fn state_change_while_recording_panics_in_debug() {
        let (mut ctx, _be) = ctx();
        ctx.begin(PrimitiveType::Points);
        ctx.enable(StateFlag::DepthTest);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "translate called between begin and end")]
    fn matrix_op_while_recording_panics_in_debug() {
        let (mut ctx, _be) = ctx();
        ctx.begin(PrimitiveType::Points);
        ctx.translate(1.0, 0.0, 0.0);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn contract_violations_are_ignored_in_release() {
        let (mut ctx, _be) = ctx();
        ctx.end();
        ctx.begin(PrimitiveType::Points);
        ctx.enable(StateFlag::Blend);
        ctx.viewport(0, 0, 1, 1, true);
        ctx.begin(PrimitiveType::Lines);
        ctx.end();
        assert!(!ctx.is_enabled(StateFlag::Blend));
        assert_eq!(ctx.stats().commands, 0);
        assert_eq!(ctx.error(), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "draw called between begin and end")]
    fn draw_while_recording_panics_in_debug() {
        let (mut ctx, mut be) = ctx();
        ctx.begin(PrimitiveType::Triangles);
        ctx.draw(&mut be);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn draw_while_recording_closes_the_primitive_in_release() {
        let (mut ctx, mut be) = ctx();
        ctx.begin(PrimitiveType::Points);
        for i in 0..3 {
            ctx.v2f(i as f32, 0.0);
        }
        ctx.end();
        ctx.begin(PrimitiveType::Triangles);
        ctx.v2f(0.0, 0.0);

        let stats = ctx.draw(&mut be);
        assert!(!ctx.is_recording());
        assert_eq!(stats.draws, 2);
        assert_eq!(be.draws(), [(0, 3, 1), (3, 1, 1)]);

        // the late vertex and end land outside any primitive and are dropped
        be.clear();
        ctx.v2f(1.0, 0.0);
        ctx.end();
        let stats = ctx.draw(&mut be);
        assert_eq!(stats.draws, 0);
        assert!(be.draws().is_empty());

        ctx.begin(PrimitiveType::Triangles);
        ctx.v2f(0.0, 0.0);
        ctx.v2f(1.0, 0.0);
        ctx.v2f(0.0, 1.0);
        ctx.end();
        ctx.draw(&mut be);
        assert_eq!(be.draws(), [(0, 3, 1)]);
    }
}
