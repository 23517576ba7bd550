// src/analysis/motion_analyzer.rs
//
// Per-lane traffic density from raw frames.
//
// Signal flow for one call to `analyze`:
//   frame → lane crop (luma) → blur → background model → foreground mask
//         → open → close → motion level
//                        → outer contours → size/shape filter → vehicle count
//   vehicle count + motion level → density
//
// Everything after the crop works in lane-local coordinates.
//
// One analyzer owns one lane's background model. `analyze` takes
// `&mut self`, so a lane is never analyzed concurrently; separate lanes
// use separate analyzers and can live on separate threads.

use super::background::{BackgroundConfig, BackgroundModel};
use super::frame::{FrameView, OwnedFrame};
use super::lane_mask::LaneMask;
use super::overlay;
use crate::error::SignalResult;
use crate::types::{AnalyzerConfig, LaneBounds, MotionMetrics};
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::contour_area;
use imageproc::morphology::{close, open};
use imageproc::point::Point;
use tracing::{debug, info, warn};

/// Share of density driven by the vehicle count.
const COUNT_WEIGHT: f32 = 60.0;
/// Share of density driven by raw motion.
const MOTION_WEIGHT: f32 = 0.4;
/// Roughly a 5x5 Gaussian kernel.
const BLUR_SIGMA: f32 = 1.1;

struct LaneSetup {
    mask: LaneMask,
    background: BackgroundModel,
    reference: OwnedFrame,
}

pub struct FrameMotionAnalyzer {
    config: AnalyzerConfig,
    lane: Option<LaneSetup>,
    frames_analyzed: u64,
}

impl FrameMotionAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            lane: None,
            frames_analyzed: 0,
        }
    }

    /// Build the lane mask from percentage bounds over `frame`'s size and
    /// keep a copy of `frame` as the reference image.
    ///
    /// Percentages outside [0, 100] are clamped. Bounds that cover no
    /// pixels are accepted; such a lane always reports zero motion.
    /// Reconfiguring discards everything the background model learned.
    pub fn configure_lane(&mut self, frame: &FrameView<'_>, bounds: LaneBounds) -> SignalResult<()> {
        frame.ensure_not_empty()?;

        let mask = LaneMask::from_bounds(bounds, frame.width(), frame.height());
        let (x0, y0, x1, y1) = mask.rect();
        let background = BackgroundModel::new(
            (x1 - x0) as u32,
            (y1 - y0) as u32,
            BackgroundConfig {
                history: self.config.background_history,
                var_threshold: self.config.background_var_threshold,
            },
        );

        info!(
            "🚦 Lane configured on {}x{} frame: rows {}..{}, cols {}..{} ({} px)",
            frame.width(),
            frame.height(),
            y0,
            y1,
            x0,
            x1,
            mask.pixel_count()
        );

        self.lane = Some(LaneSetup {
            mask,
            background,
            reference: frame.to_owned_frame(),
        });
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.lane.is_some()
    }

    pub fn lane_mask(&self) -> Option<&LaneMask> {
        self.lane.as_ref().map(|l| &l.mask)
    }

    /// Frame captured by the last `configure_lane`.
    pub fn reference_frame(&self) -> Option<&OwnedFrame> {
        self.lane.as_ref().map(|l| &l.reference)
    }

    pub fn frames_analyzed(&self) -> u64 {
        self.frames_analyzed
    }

    /// Analyze one frame and return the annotated copy plus its metrics.
    ///
    /// Not idempotent: every call trains the background model, so feeding
    /// the same frame twice can give different results.
    pub fn analyze(&mut self, frame: &FrameView<'_>) -> SignalResult<(RgbImage, MotionMetrics)> {
        frame.ensure_not_empty()?;

        let needs_setup = match &self.lane {
            None => {
                debug!("No lane configured, using default bounds");
                Some(self.config.default_lane)
            }
            Some(lane) if lane.mask.frame_size() != (frame.width(), frame.height()) => {
                let (w, h) = lane.mask.frame_size();
                warn!(
                    "Frame size changed from {}x{} to {}x{}, rebuilding lane",
                    w,
                    h,
                    frame.width(),
                    frame.height()
                );
                Some(lane.mask.bounds())
            }
            Some(_) => None,
        };
        if let Some(bounds) = needs_setup {
            self.configure_lane(frame, bounds)?;
        }

        let Some(lane) = self.lane.as_mut() else {
            return Ok((frame.to_rgb_image(), MotionMetrics::empty()));
        };
        self.frames_analyzed += 1;

        if lane.mask.is_empty() {
            let metrics = MotionMetrics::empty();
            let annotated = overlay::render_annotations(frame, &lane.mask, &[], &metrics);
            return Ok((annotated, metrics));
        }

        let gray = lane_luma(frame, &lane.mask);
        let blurred = gaussian_blur_f32(&gray, BLUR_SIGMA);
        let foreground = lane.background.apply(&blurred)?;
        let cleaned = clean_foreground(&foreground, self.config.morph_kernel_size);

        let motion_level = motion_level(&cleaned);

        let contours = find_contours::<i32>(&cleaned);
        let config = &self.config;
        let vehicles: Vec<&Contour<i32>> = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && is_vehicle_shaped(&c.points, config))
            .collect();
        let vehicle_count = vehicles.len() as u32;

        let density = density(vehicle_count, motion_level, config.road_capacity);
        let metrics = MotionMetrics {
            vehicle_count,
            density,
            motion_level,
        };

        debug!(
            "Frame {}: {} contours, {} vehicles, motion={:.1}%, density={:.1}",
            self.frames_analyzed,
            contours.len(),
            vehicle_count,
            motion_level,
            density
        );

        let annotated = overlay::render_annotations(frame, &lane.mask, &vehicles, &metrics);
        Ok((annotated, metrics))
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Luma of the lane rectangle, cropped out of the frame.
fn lane_luma(frame: &FrameView<'_>, mask: &LaneMask) -> GrayImage {
    let (x0, y0, x1, y1) = mask.rect();
    GrayImage::from_fn((x1 - x0) as u32, (y1 - y0) as u32, |x, y| {
        Luma([frame.luma(x0 + x as usize, y0 + y as usize)])
    })
}

/// Opening first drops speckle, closing second reconnects the fragments of
/// one vehicle. Square structuring element of side `kernel_size` (odd sizes
/// are exact, even ones round down).
pub fn clean_foreground(mask: &GrayImage, kernel_size: usize) -> GrayImage {
    let k = (kernel_size / 2).min(u8::MAX as usize) as u8;
    close(&open(mask, Norm::LInf, k), Norm::LInf, k)
}

/// Large enough, and neither a thin horizontal streak nor a tall sliver.
fn is_vehicle_shaped(points: &[Point<i32>], config: &AnalyzerConfig) -> bool {
    if contour_area(points) <= config.min_contour_area {
        return false;
    }
    let Some((width, height)) = bounding_size(points) else {
        return false;
    };
    let aspect = width as f32 / height as f32;
    aspect > config.min_aspect_ratio && aspect < config.max_aspect_ratio
}

/// Width and height of the pixel box enclosing `points`, both inclusive.
fn bounding_size(points: &[Point<i32>]) -> Option<(i32, i32)> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    Some((max_x - min_x + 1, max_y - min_y + 1))
}

/// Foreground share of the lane crop in percent.
fn motion_level(foreground: &GrayImage) -> f32 {
    let lane_pixels = foreground.width() as usize * foreground.height() as usize;
    if lane_pixels == 0 {
        return 0.0;
    }
    let moving = foreground.pixels().filter(|p| p[0] != 0).count();
    100.0 * moving as f32 / lane_pixels as f32
}

/// Blend of discrete vehicle count (weighted 60) and motion share
/// (weighted 0.4), capped at 100.
pub fn density(vehicle_count: u32, motion_level: f32, road_capacity: f32) -> f32 {
    let capacity = road_capacity.max(f32::EPSILON);
    (vehicle_count as f32 / capacity * COUNT_WEIGHT + motion_level * MOTION_WEIGHT).min(100.0)
}
