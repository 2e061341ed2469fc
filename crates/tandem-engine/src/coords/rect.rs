use super::Vec2;

/// Axis-aligned rectangle in logical pixels (top-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    #[inline]
    pub fn translated(self, by: Vec2) -> Self {
        Self { origin: self.origin + by, size: self.size }
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        let max = self.max();
        p.x >= self.origin.x && p.y >= self.origin.y && p.x < max.x && p.y < max.y
    }

    /// Scales into physical pixels and clips to `bounds` (exclusive max).
    ///
    /// Returns `(x0, y0, x1, y1)` or `None` when nothing is left.
    pub fn to_pixel_span(self, scale: f32, bounds: (u32, u32)) -> Option<(u32, u32, u32, u32)> {
        if self.is_empty() || !self.origin.is_finite() || !self.size.is_finite() {
            return None;
        }
        let max = self.max();
        let clamp = |v: f32, hi: u32| (v * scale).round().clamp(0.0, hi as f32) as u32;

        let x0 = clamp(self.origin.x, bounds.0);
        let y0 = clamp(self.origin.y, bounds.1);
        let x1 = clamp(max.x, bounds.0);
        let y1 = clamp(max.y, bounds.1);

        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Vec2::new(0.0, 0.0)));
        assert!(r.contains(Vec2::new(9.9, 9.9)));
        assert!(!r.contains(Vec2::new(10.0, 5.0)));
    }

    #[test]
    fn translated_keeps_size() {
        let r = Rect::new(5.0, 5.0, 2.0, 3.0).translated(Vec2::new(-5.0, 1.0));
        assert_eq!(r, Rect::new(0.0, 6.0, 2.0, 3.0));
    }

    #[test]
    fn pixel_span_scales_and_clips() {
        let r = Rect::new(-4.0, 10.0, 20.0, 200.0);
        assert_eq!(r.to_pixel_span(2.0, (100, 100)), Some((0, 20, 32, 100)));
    }

    #[test]
    fn pixel_span_outside_is_none() {
        assert_eq!(Rect::new(200.0, 0.0, 5.0, 5.0).to_pixel_span(1.0, (100, 100)), None);
        assert_eq!(Rect::new(0.0, 0.0, 0.0, 5.0).to_pixel_span(1.0, (100, 100)), None);
    }
}
