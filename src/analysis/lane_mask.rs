// src/analysis/lane_mask.rs

use crate::types::LaneBounds;
use imageproc::rect::Rect;
use tracing::warn;

/// Rectangular region of interest in pixel coordinates.
///
/// Rows `y0..y1`, columns `x0..x1` (half-open). A mask whose bounds are
/// inverted or collapse on small frames covers zero pixels; analysis then
/// reports no motion instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneMask {
    bounds: LaneBounds,
    frame_width: usize,
    frame_height: usize,
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
}

impl LaneMask {
    pub fn from_bounds(bounds: LaneBounds, frame_width: usize, frame_height: usize) -> Self {
        let b = bounds.clamped();
        let row = |pct: f32| ((frame_height as f32 * pct / 100.0) as usize).min(frame_height);
        let col = |pct: f32| ((frame_width as f32 * pct / 100.0) as usize).min(frame_width);

        let (mut y0, mut y1) = (row(b.top), row(b.bottom));
        let (mut x0, mut x1) = (col(b.left), col(b.right));
        if y1 <= y0 || x1 <= x0 {
            warn!(
                "Lane bounds top={:.1} bottom={:.1} left={:.1} right={:.1} cover no pixels of a {}x{} frame",
                b.top, b.bottom, b.left, b.right, frame_width, frame_height
            );
            y0 = 0;
            y1 = 0;
            x0 = 0;
            x1 = 0;
        }

        Self {
            bounds: b,
            frame_width,
            frame_height,
            x0,
            x1,
            y0,
            y1,
        }
    }

    pub fn bounds(&self) -> LaneBounds {
        self.bounds
    }

    pub fn frame_size(&self) -> (usize, usize) {
        (self.frame_width, self.frame_height)
    }

    /// (x0, y0, x1, y1), half-open
    pub fn rect(&self) -> (usize, usize, usize, usize) {
        (self.x0, self.y0, self.x1, self.y1)
    }

    /// The covered area as an imageproc rectangle; `None` when degenerate.
    pub fn region(&self) -> Option<Rect> {
        if self.is_empty() {
            return None;
        }
        Some(
            Rect::at(self.x0 as i32, self.y0 as i32)
                .of_size((self.x1 - self.x0) as u32, (self.y1 - self.y0) as u32),
        )
    }

    pub fn pixel_count(&self) -> usize {
        (self.x1 - self.x0) * (self.y1 - self.y0)
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds_cover_bottom_half() {
        let mask = LaneMask::from_bounds(LaneBounds::default(), 100, 80);
        assert_eq!(mask.rect(), (0, 40, 100, 80));
        assert_eq!(mask.pixel_count(), 100 * 40);
        let region = mask.region().unwrap();
        assert_eq!((region.left(), region.top()), (0, 40));
        assert_eq!((region.width(), region.height()), (100, 40));
    }

    #[test]
    fn test_out_of_range_bounds_are_clamped() {
        let mask = LaneMask::from_bounds(LaneBounds::new(-20.0, 150.0, -5.0, 300.0), 50, 50);
        assert_eq!(mask.rect(), (0, 0, 50, 50));
    }

    #[test]
    fn test_equal_top_and_bottom_is_degenerate() {
        let mask = LaneMask::from_bounds(LaneBounds::new(40.0, 40.0, 0.0, 100.0), 64, 64);
        assert!(mask.is_empty());
        assert!(mask.region().is_none());
    }

    #[test]
    fn test_inverted_bounds_are_degenerate() {
        let mask = LaneMask::from_bounds(LaneBounds::new(80.0, 20.0, 0.0, 100.0), 64, 64);
        assert_eq!(mask.pixel_count(), 0);
    }

    #[test]
    fn test_sub_pixel_band_on_tiny_frame_is_degenerate() {
        // 10%..15% of 4 rows truncates to row 0..0
        let mask = LaneMask::from_bounds(LaneBounds::new(10.0, 15.0, 0.0, 100.0), 4, 4);
        assert!(mask.is_empty());
    }
}
