// src/analysis/frame.rs
//
// Pixel buffers the analyzer works on.
//
// `FrameView` borrows caller-owned bytes for the duration of one call.
// `OwnedFrame` is the analyzer's private copy of the reference image.
// Grayscale work happens on `image::GrayImage` crops of the lane.

use crate::error::{SignalError, SignalResult};
use image::RgbImage;

// ============================================================================
// BORROWED FRAME
// ============================================================================

/// Read-only view over a packed, row-major frame (1, 3 or 4 channels).
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    channels: usize,
}

impl<'a> FrameView<'a> {
    /// Wrap packed pixel bytes. The buffer length must match the declared
    /// geometry; a 0x0 view is structurally valid but `is_empty`.
    pub fn new(data: &'a [u8], width: usize, height: usize, channels: usize) -> SignalResult<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(SignalError::InvalidFrame(format!(
                "unsupported channel count {}",
                channels
            )));
        }
        if data.len() != width * height * channels {
            return Err(SignalError::InvalidFrame(format!(
                "buffer holds {} bytes, expected {}x{}x{} = {}",
                data.len(),
                width,
                height,
                channels,
                width * height * channels
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    pub fn from_rgb_image(image: &'a RgbImage) -> SignalResult<Self> {
        Self::new(
            image.as_raw(),
            image.width() as usize,
            image.height() as usize,
            3,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `InvalidFrame` for empty views, so callers can `?` it.
    pub fn ensure_not_empty(&self) -> SignalResult<()> {
        if self.is_empty() {
            return Err(SignalError::InvalidFrame(format!(
                "empty frame ({}x{})",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn rgb(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * self.channels;
        match self.channels {
            1 => [self.data[i]; 3],
            _ => [self.data[i], self.data[i + 1], self.data[i + 2]],
        }
    }

    /// ITU-R BT.601 luma
    #[inline]
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        if self.channels == 1 {
            return self.data[y * self.width + x];
        }
        let [r, g, b] = self.rgb(x, y);
        (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) as u8
    }

    pub fn to_owned_frame(&self) -> OwnedFrame {
        OwnedFrame {
            data: self.data.to_vec(),
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }

    /// Expand into an RGB image regardless of the source channel count.
    pub fn to_rgb_image(&self) -> RgbImage {
        let mut out = RgbImage::new(self.width as u32, self.height as u32);
        for (x, y, px) in out.enumerate_pixels_mut() {
            px.0 = self.rgb(x as usize, y as usize);
        }
        out
    }
}

// ============================================================================
// OWNED FRAME
// ============================================================================

#[derive(Debug, Clone)]
pub struct OwnedFrame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl OwnedFrame {
    pub fn view(&self) -> SignalResult<FrameView<'_>> {
        FrameView::new(&self.data, self.width, self.height, self.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_view_is_flagged() {
        let view = FrameView::new(&[], 0, 0, 3).unwrap();
        assert!(view.is_empty());
        let err = view.ensure_not_empty().unwrap_err();
        assert!(matches!(err, SignalError::InvalidFrame(_)));
    }

    #[test]
    fn test_zero_width_with_bytes_is_rejected() {
        assert!(FrameView::new(&[1, 2, 3], 0, 1, 3).is_err());
    }

    #[test]
    fn test_rejects_short_buffer() {
        let data = vec![0u8; 10];
        assert!(FrameView::new(&data, 4, 4, 3).is_err());
    }

    #[test]
    fn test_rejects_two_channels() {
        let data = vec![0u8; 32];
        assert!(FrameView::new(&data, 4, 4, 2).is_err());
    }

    #[test]
    fn test_luma_of_gray_and_rgb_agree() {
        let gray = vec![120u8; 4];
        let rgb = vec![120u8; 12];
        let g = FrameView::new(&gray, 2, 2, 1).unwrap();
        let c = FrameView::new(&rgb, 2, 2, 3).unwrap();
        assert_eq!(g.luma(1, 1), 120);
        assert!((c.luma(1, 1) as i32 - 120).abs() <= 1);
    }

    #[test]
    fn test_rgba_ignores_alpha() {
        let rgba = vec![10, 20, 30, 255, 40, 50, 60, 0];
        let f = FrameView::new(&rgba, 2, 1, 4).unwrap();
        assert_eq!(f.rgb(1, 0), [40, 50, 60]);
    }
}
