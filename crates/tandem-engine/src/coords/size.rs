use std::fmt;

/// Size in logical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Size of a frame target in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `logical × scale`, rounded to the nearest pixel. Negative or NaN
    /// inputs collapse to zero.
    pub fn from_logical(size: Size, scale: f32) -> Self {
        let px = |v: f32| {
            let p = (v * scale).round();
            if p.is_finite() && p > 0.0 { p as u32 } else { 0 }
        };
        Self::new(px(size.width), px(size.height))
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for PixelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Presentation area as reported by the host window system.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Geometry {
    /// Logical size of the area the view occupies.
    pub size: Size,
    pub device_pixel_ratio: f32,
}

impl Geometry {
    #[inline]
    pub const fn new(size: Size, device_pixel_ratio: f32) -> Self {
        Self { size, device_pixel_ratio }
    }

    /// Size the frame target must have for this geometry.
    #[inline]
    pub fn pixel_size(self) -> PixelSize {
        PixelSize::from_logical(self.size, self.device_pixel_ratio)
    }

    /// True once there is at least one physical pixel to render into.
    #[inline]
    pub fn is_presentable(self) -> bool {
        !self.pixel_size().is_empty()
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(Size::zero(), 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_size_scales_by_ratio() {
        let g = Geometry::new(Size::new(500.0, 300.0), 2.0);
        assert_eq!(g.pixel_size(), PixelSize::new(1000, 600));
    }

    #[test]
    fn fractional_ratio_rounds() {
        let g = Geometry::new(Size::new(333.0, 101.0), 1.5);
        assert_eq!(g.pixel_size(), PixelSize::new(500, 152));
    }

    #[test]
    fn zero_size_is_not_presentable() {
        assert!(!Geometry::default().is_presentable());
        assert!(!Geometry::new(Size::new(100.0, 0.0), 1.0).is_presentable());
        assert!(Geometry::new(Size::new(1.0, 1.0), 1.0).is_presentable());
    }

    #[test]
    fn negative_and_nan_collapse_to_zero() {
        assert_eq!(PixelSize::from_logical(Size::new(-5.0, f32::NAN), 1.0), PixelSize::new(0, 0));
    }
}
