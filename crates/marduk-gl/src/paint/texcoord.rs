/// Largest supported integer part, in bits, of a fixed-point texture coordinate.
pub const MAX_TEXCOORD_BITS: u32 = 15;

/// `2^15`: the fixed-point unit for a coordinate with zero integer bits.
const FIXED_ONE: f32 = (1u32 << 15) as f32;

/// Per-axis scale for packing texture coordinates into `i16`.
///
/// With `bits` integer bits the representable range is `[-2^bits, 2^bits)` and
/// the quantization step is `2^bits / 2^15`. The shader multiplies the raw
/// integers by [`descale`](Self::descale) to recover the float value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TexcoordScale {
    u: f32,
    v: f32,
}

impl Default for TexcoordScale {
    fn default() -> Self {
        Self { u: 1.0, v: 1.0 }
    }
}

impl TexcoordScale {
    /// Bits above `MAX_TEXCOORD_BITS` are clamped.
    pub fn from_int_bits(u_bits: u32, v_bits: u32) -> Self {
        let u_bits = u_bits.min(MAX_TEXCOORD_BITS);
        let v_bits = v_bits.min(MAX_TEXCOORD_BITS);
        Self {
            u: (1u32 << u_bits) as f32,
            v: (1u32 << v_bits) as f32,
        }
    }

    /// `[2^u_bits, 2^v_bits]`
    #[inline]
    pub fn scale(self) -> [f32; 2] {
        [self.u, self.v]
    }

    /// Factor that converts a packed coordinate back to its float value.
    #[inline]
    pub fn descale(self) -> [f32; 2] {
        [self.u / FIXED_ONE, self.v / FIXED_ONE]
    }

    #[inline]
    pub fn pack(self, u: f32, v: f32) -> [i16; 2] {
        [pack_axis(u, self.u), pack_axis(v, self.v)]
    }

    #[inline]
    pub fn unpack(self, uv: [i16; 2]) -> [f32; 2] {
        let [du, dv] = self.descale();
        [uv[0] as f32 * du, uv[1] as f32 * dv]
    }
}

/// `round(value * 2^15 / scale)`, saturated to the `i16` range.
#[inline]
fn pack_axis(value: f32, scale: f32) -> i16 {
    let q = (value * FIXED_ONE / scale).round();
    q.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
