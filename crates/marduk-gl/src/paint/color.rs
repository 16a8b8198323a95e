/// Straight-alpha RGBA color with `f32` channels in `[0, 1]`.
///
/// Vertices store colors packed into one `u32` (see [`pack_rgba8`]); this type is
/// the float-side view used by the `c4f` family of entry points.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Packed opaque white, the initial paint color.
pub const WHITE: u32 = 0xFFFF_FFFF;

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Quantizes each channel with `round(clamp(c, 0, 1) * 255)`.
    #[inline]
    pub fn pack(self) -> u32 {
        pack_rgba8(unorm8(self.r), unorm8(self.g), unorm8(self.b), unorm8(self.a))
    }

    #[inline]
    pub fn from_packed(rgba: u32) -> Self {
        let [r, g, b, a] = unpack_rgba8(rgba);
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }
}

/// Packs bytes into the vertex color word. Red lands in the lowest byte so the
/// in-memory order is `r, g, b, a` on little-endian targets.
#[inline]
pub const fn pack_rgba8(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (a as u32) << 24 | (b as u32) << 16 | (g as u32) << 8 | r as u32
}

#[inline]
pub const fn unpack_rgba8(rgba: u32) -> [u8; 4] {
    [
        rgba as u8,
        (rgba >> 8) as u8,
        (rgba >> 16) as u8,
        (rgba >> 24) as u8,
    ]
}

/// Float channel to byte. NaN maps to 0.
#[inline]
pub fn unorm8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}
