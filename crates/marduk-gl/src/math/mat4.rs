use core::ops::Mul;

use bytemuck::{Pod, Zeroable};

/// 4×4 matrix, column-major storage (`cols[c][r]`).
///
/// Column-vector convention: `clip = m * position`. `a * b` applies `b` first.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Mat4 {
    pub cols: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    #[inline]
    pub const fn from_cols(cols: [[f32; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Builds from 16 floats in column-major order.
    pub fn from_cols_slice(m: &[f32; 16]) -> Self {
        let mut cols = [[0.0; 4]; 4];
        for (c, col) in cols.iter_mut().enumerate() {
            col.copy_from_slice(&m[c * 4..c * 4 + 4]);
        }
        Self { cols }
    }

    /// Builds from 16 floats in row-major order.
    #[inline]
    pub fn from_rows_slice(m: &[f32; 16]) -> Self {
        Self::from_cols_slice(m).transpose()
    }

    /// Returns the 16 floats in column-major order.
    pub fn to_cols_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        for (c, col) in self.cols.iter().enumerate() {
            out[c * 4..c * 4 + 4].copy_from_slice(col);
        }
        out
    }

    pub fn transpose(&self) -> Self {
        let mut res = [[0.0; 4]; 4];
        for (c, col) in res.iter_mut().enumerate() {
            for (r, v) in col.iter_mut().enumerate() {
                *v = self.cols[r][c];
            }
        }
        Self { cols: res }
    }

    /// Transforms a homogeneous column vector.
    pub fn transform(&self, v: [f32; 4]) -> [f32; 4] {
        let mut out = [0.0; 4];
        for (r, o) in out.iter_mut().enumerate() {
            *o = (0..4).map(|k| self.cols[k][r] * v[k]).sum();
        }
        out
    }

    // ── builders ──────────────────────────────────────────────────────────

    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3] = [x, y, z, 1.0];
        m
    }

    pub fn scaling(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[0][0] = x;
        m.cols[1][1] = y;
        m.cols[2][2] = z;
        m
    }

    /// Counter-clockwise rotation of `angle` radians about the axis `(x, y, z)`.
    ///
    /// A zero-length axis yields the identity.
    pub fn rotation(angle: f32, x: f32, y: f32, z: f32) -> Self {
        let len = (x * x + y * y + z * z).sqrt();
        if len <= f32::EPSILON {
            return Self::IDENTITY;
        }
        let (x, y, z) = (x / len, y / len, z / len);
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;

        Self::from_cols([
            [t * x * x + c, t * x * y + s * z, t * x * z - s * y, 0.0],
            [t * x * y - s * z, t * y * y + c, t * y * z + s * x, 0.0],
            [t * x * z + s * y, t * y * z - s * x, t * z * z + c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Perspective frustum, OpenGL clip conventions (NDC z in `[-1, 1]`).
    pub fn frustum(l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) -> Self {
        let w = r - l;
        let h = t - b;
        let d = f - n;
        Self::from_cols([
            [2.0 * n / w, 0.0, 0.0, 0.0],
            [0.0, 2.0 * n / h, 0.0, 0.0],
            [(r + l) / w, (t + b) / h, -(f + n) / d, -1.0],
            [0.0, 0.0, -2.0 * f * n / d, 0.0],
        ])
    }

    pub fn ortho(l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) -> Self {
        let w = r - l;
        let h = t - b;
        let d = f - n;
        Self::from_cols([
            [2.0 / w, 0.0, 0.0, 0.0],
            [0.0, 2.0 / h, 0.0, 0.0],
            [0.0, 0.0, -2.0 / d, 0.0],
            [-(r + l) / w, -(t + b) / h, -(f + n) / d, 1.0],
        ])
    }

    /// `fov_y` in radians.
    pub fn perspective(fov_y: f32, aspect: f32, z_near: f32, z_far: f32) -> Self {
        let fy = 1.0 / (fov_y * 0.5).tan();
        let d = z_near - z_far;
        Self::from_cols([
            [fy / aspect, 0.0, 0.0, 0.0],
            [0.0, fy, 0.0, 0.0],
            [0.0, 0.0, (z_far + z_near) / d, -1.0],
            [0.0, 0.0, 2.0 * z_far * z_near / d, 0.0],
        ])
    }

    /// Right-handed view matrix looking from `eye` towards `center`.
    pub fn look_at(eye: [f32; 3], center: [f32; 3], up: [f32; 3]) -> Self {
        let f = normalize(sub(center, eye));
        let s = normalize(cross(f, up));
        let u = cross(s, f);
        Self::from_cols([
            [s[0], u[0], -f[0], 0.0],
            [s[1], u[1], -f[1], 0.0],
            [s[2], u[2], -f[2], 0.0],
            [-dot(s, eye), -dot(u, eye), dot(f, eye), 1.0],
        ])
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut res = [[0.0; 4]; 4];
        for (c, col) in res.iter_mut().enumerate() {
            for (r, v) in col.iter_mut().enumerate() {
                *v = (0..4).map(|k| self.cols[k][r] * rhs.cols[c][k]).sum();
            }
        }
        Mat4 { cols: res }
    }
}

#[inline]
fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = dot(v, v).sqrt();
    if len <= f32::EPSILON {
        v
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn approx(a: [f32; 4], b: [f32; 4]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < EPS)
    }

    fn approx_mat(a: &Mat4, b: &Mat4) -> bool {
        a.cols.iter().zip(b.cols.iter()).all(|(x, y)| approx(*x, *y))
    }

    fn project(m: &Mat4, p: [f32; 3]) -> [f32; 3] {
        let c = m.transform([p[0], p[1], p[2], 1.0]);
        [c[0] / c[3], c[1] / c[3], c[2] / c[3]]
    }

    // ── algebra ───────────────────────────────────────────────────────────

    #[test]
    fn identity_is_neutral() {
        let m = Mat4::translation(1.0, 2.0, 3.0) * Mat4::scaling(2.0, 2.0, 2.0);
        assert_eq!(Mat4::IDENTITY * m, m);
        assert_eq!(m * Mat4::IDENTITY, m);
    }

    #[test]
    fn mul_applies_right_operand_first() {
        let t = Mat4::translation(10.0, 0.0, 0.0);
        let s = Mat4::scaling(2.0, 2.0, 2.0);
        // Scale, then translate.
        assert!(approx((t * s).transform([1.0, 0.0, 0.0, 1.0]), [12.0, 0.0, 0.0, 1.0]));
        // Translate, then scale.
        assert!(approx((s * t).transform([1.0, 0.0, 0.0, 1.0]), [22.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn row_major_load_is_transposed() {
        let rows = [
            1.0, 0.0, 0.0, 5.0, //
            0.0, 1.0, 0.0, 6.0, //
            0.0, 0.0, 1.0, 7.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        assert_eq!(Mat4::from_rows_slice(&rows), Mat4::translation(5.0, 6.0, 7.0));
        let m = Mat4::translation(5.0, 6.0, 7.0);
        assert_eq!(Mat4::from_cols_slice(&m.to_cols_array()), m);
        assert_eq!(m.transpose().transpose(), m);
    }

    // ── builders ──────────────────────────────────────────────────────────

    #[test]
    fn rotation_about_z_is_counter_clockwise() {
        let r = Mat4::rotation(core::f32::consts::FRAC_PI_2, 0.0, 0.0, 1.0);
        assert!(approx(r.transform([1.0, 0.0, 0.0, 1.0]), [0.0, 1.0, 0.0, 1.0]));
    }

    #[test]
    fn rotation_normalizes_axis() {
        let a = Mat4::rotation(0.7, 0.0, 3.0, 0.0);
        let b = Mat4::rotation(0.7, 0.0, 1.0, 0.0);
        assert!(approx_mat(&a, &b));
        assert_eq!(Mat4::rotation(1.0, 0.0, 0.0, 0.0), Mat4::IDENTITY);
    }

    #[test]
    fn ortho_maps_box_corners_to_ndc() {
        let m = Mat4::ortho(0.0, 640.0, 480.0, 0.0, -1.0, 1.0);
        let p = project(&m, [0.0, 0.0, 0.0]);
        assert!((p[0] + 1.0).abs() < EPS && (p[1] - 1.0).abs() < EPS);
        let p = project(&m, [640.0, 480.0, 0.0]);
        assert!((p[0] - 1.0).abs() < EPS && (p[1] + 1.0).abs() < EPS);
    }

    #[test]
    fn perspective_maps_near_and_far_planes() {
        let m = Mat4::perspective(1.0, 1.5, 0.5, 50.0);
        assert!((project(&m, [0.0, 0.0, -0.5])[2] + 1.0).abs() < EPS);
        assert!((project(&m, [0.0, 0.0, -50.0])[2] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn perspective_matches_symmetric_frustum() {
        let (fov, aspect, n, f) = (0.9_f32, 16.0 / 9.0, 0.1, 100.0);
        let t = n * (fov * 0.5).tan();
        let r = t * aspect;
        assert!(approx_mat(
            &Mat4::perspective(fov, aspect, n, f),
            &Mat4::frustum(-r, r, -t, t, n, f)
        ));
    }

    #[test]
    fn look_at_moves_eye_to_origin() {
        let v = Mat4::look_at([0.0, 0.0, 5.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert!(approx(v.transform([0.0, 0.0, 0.0, 1.0]), [0.0, 0.0, -5.0, 1.0]));
        assert!(approx(v.transform([0.0, 0.0, 5.0, 1.0]), [0.0, 0.0, 0.0, 1.0]));
        // World +X stays to the right.
        assert!(approx(v.transform([1.0, 0.0, 0.0, 1.0]), [1.0, 0.0, -5.0, 1.0]));
    }

    #[test]
    fn look_at_then_frustum_lands_target_in_view() {
        let proj = Mat4::frustum(-0.1, 0.1, -0.1, 0.1, 0.1, 100.0);
        let view = Mat4::look_at([3.0, 4.0, 5.0], [1.0, 1.0, 1.0], [0.0, 1.0, 0.0]);
        let p = project(&(proj * view), [1.0, 1.0, 1.0]);
        assert!(p[0].abs() < EPS && p[1].abs() < EPS);
        assert!(p[2] > -1.0 && p[2] < 1.0);
    }
}
