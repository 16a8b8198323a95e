/// Axis-aligned rectangle in framebuffer pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    /// `true`: `y` counts down from the top edge. `false`: up from the bottom edge.
    pub origin_top_left: bool,
}

impl PixelRect {
    #[inline]
    pub const fn new(x: i32, y: i32, w: i32, h: i32, origin_top_left: bool) -> Self {
        Self { x, y, w, h, origin_top_left }
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Re-expresses the rect with a top-left origin for a target `target_height` pixels tall.
    #[inline]
    pub fn to_top_left(self, target_height: u32) -> Self {
        if self.origin_top_left {
            return self;
        }
        let y = target_height as i32 - (self.y + self.h);
        Self { y, origin_top_left: true, ..self }
    }

    /// Intersects a top-left rect with `[0, width) × [0, height)`.
    ///
    /// Returns `(x, y, w, h)`; the size may be zero when the rect lies outside the target.
    pub fn clamp_to(self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        debug_assert!(self.origin_top_left, "clamp_to expects a top-left rect");
        let (tw, th) = (width as i64, height as i64);
        let x0 = (self.x as i64).clamp(0, tw);
        let y0 = (self.y as i64).clamp(0, th);
        let x1 = (self.x as i64 + self.w.max(0) as i64).clamp(0, tw);
        let y1 = (self.y as i64 + self.h.max(0) as i64).clamp(0, th);
        (x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
    }
}
