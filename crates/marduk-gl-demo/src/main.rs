use anyhow::{Context as _, Result};
use marduk_gl::backend::{Backend, ImageDesc, ImageId};
use marduk_gl::device::{Gpu, GpuInit, OffscreenTarget};
use marduk_gl::logging::{init_logging, LoggingConfig};
use marduk_gl::{Context, GlDesc, MatrixMode, PrimitiveType, StateFlag, WgpuBackend};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const FRAMES: u32 = 8;

const COLOR: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let gpu = Gpu::new_headless_blocking(GpuInit::default())?;
    let target = OffscreenTarget::new(gpu.device(), WIDTH, HEIGHT, COLOR, Some(DEPTH), 1);
    let mut backend = WgpuBackend::new(gpu.device(), gpu.queue());

    let mut gl = Context::setup(
        &mut backend,
        GlDesc {
            color_format: COLOR,
            depth_format: Some(DEPTH),
            ..GlDesc::default()
        },
    )?;

    let checker = make_checkerboard(&mut backend, 8).context("checkerboard texture")?;

    for frame in 0..FRAMES {
        let t = frame as f32 / FRAMES as f32;
        record_frame(&mut gl, checker, t);

        let mut encoder = gpu.create_encoder("marduk-gl-demo frame");
        backend.begin_pass(
            &mut encoder,
            &target.pass_target(Some(wgpu::Color { r: 0.1, g: 0.1, b: 0.12, a: 1.0 })),
        );
        let stats = gl.draw(&mut backend);
        backend.end_pass();
        gpu.submit(encoder);

        log::info!(
            "frame {frame}: {} commands, {} draws, {} vertices",
            stats.commands,
            stats.draws,
            stats.vertices_uploaded
        );
    }

    gl.shutdown(&mut backend);
    backend.destroy_image(checker);
    Ok(())
}

/// Spinning textured cube, a 2D overlay grid and a triangle fan of points.
fn record_frame(gl: &mut Context, checker: ImageId, t: f32) {
    let angle = t * std::f32::consts::TAU;

    gl.viewport(0, 0, WIDTH as i32, HEIGHT as i32, true);

    // 3D pass
    gl.enable(StateFlag::DepthTest);
    gl.enable(StateFlag::CullFace);
    gl.enable(StateFlag::Texturing);
    gl.set_texture(Some(checker));
    gl.texcoord_int_bits(2, 2);

    gl.matrix_mode(MatrixMode::Projection);
    gl.load_identity();
    gl.perspective(60f32.to_radians(), WIDTH as f32 / HEIGHT as f32, 0.1, 100.0);
    gl.matrix_mode(MatrixMode::ModelView);
    gl.load_identity();
    gl.lookat([0.0, 1.5, 4.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
    gl.rotate(angle, 0.0, 1.0, 0.0);
    gl.rotate(angle * 0.5, 1.0, 0.0, 0.0);
    cube(gl);

    // 2D overlay
    gl.disable(StateFlag::DepthTest);
    gl.disable(StateFlag::CullFace);
    gl.disable(StateFlag::Texturing);
    gl.set_texture(None);
    gl.enable(StateFlag::Blend);

    gl.matrix_mode(MatrixMode::Projection);
    gl.load_identity();
    gl.ortho2d(0.0, WIDTH as f32, HEIGHT as f32, 0.0);
    gl.matrix_mode(MatrixMode::ModelView);
    gl.load_identity();

    gl.scissor_rect(16, 16, 160, 120, true);
    gl.begin(PrimitiveType::Lines);
    gl.c4f(1.0, 1.0, 1.0, 0.3);
    for i in 0..=8 {
        let o = 16.0 + i as f32 * 20.0;
        gl.v2f(o, 16.0);
        gl.v2f(o, 136.0);
    }
    gl.end();
    gl.scissor_rect(0, 0, WIDTH as i32, HEIGHT as i32, true);

    gl.push_matrix();
    gl.translate(WIDTH as f32 - 80.0, 80.0, 0.0);
    gl.begin(PrimitiveType::Points);
    for i in 0..32 {
        let a = i as f32 / 32.0 * std::f32::consts::TAU + angle;
        gl.v2f_c4b(a.cos() * 48.0, a.sin() * 48.0, 255, (i * 8) as u8, 64, 255);
    }
    gl.end();
    gl.pop_matrix();

    gl.disable(StateFlag::Blend);
}

fn cube(gl: &mut Context) {
    // One quad per face, counter-clockwise seen from outside.
    const FACES: [[[f32; 3]; 4]; 6] = [
        [[-1., -1., 1.], [1., -1., 1.], [1., 1., 1.], [-1., 1., 1.]],
        [[1., -1., -1.], [-1., -1., -1.], [-1., 1., -1.], [1., 1., -1.]],
        [[-1., -1., -1.], [-1., -1., 1.], [-1., 1., 1.], [-1., 1., -1.]],
        [[1., -1., 1.], [1., -1., -1.], [1., 1., -1.], [1., 1., 1.]],
        [[-1., 1., 1.], [1., 1., 1.], [1., 1., -1.], [-1., 1., -1.]],
        [[-1., -1., -1.], [1., -1., -1.], [1., -1., 1.], [-1., -1., 1.]],
    ];
    const UV: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    gl.begin(PrimitiveType::Triangles);
    for (f, face) in FACES.iter().enumerate() {
        let shade = 0.6 + 0.08 * f as f32;
        gl.c3f(shade, shade, shade);
        for i in [0, 1, 2, 0, 2, 3] {
            let [x, y, z] = face[i];
            let [u, v] = UV[i];
            gl.v3f_t2f(x * 0.5, y * 0.5, z * 0.5, u * 2.0, v * 2.0);
        }
    }
    gl.end();
}

fn make_checkerboard(backend: &mut impl Backend, size: u32) -> Result<ImageId> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let v = if (x + y) % 2 == 0 { 255 } else { 64 };
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    backend.make_image(&ImageDesc {
        label: "checkerboard",
        width: size,
        height: size,
        pixels: &pixels,
    })
}
