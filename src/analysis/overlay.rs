// src/analysis/overlay.rs
//
// Display-only annotation of analyzed frames: translucent lane tint,
// outlines of the blobs counted as vehicles, and a metrics readout.
// Text uses the DejaVu Sans face bundled under assets/fonts.

use super::frame::FrameView;
use super::lane_mask::LaneMask;
use crate::types::MotionMetrics;
use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::contours::Contour;
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::map::map_colors2;
use imageproc::rect::Rect;
use tracing::warn;

const FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

const LANE_TINT: Rgb<u8> = Rgb([0, 200, 0]);
const LANE_TINT_ALPHA: f32 = 0.3;
const VEHICLE_OUTLINE: Rgb<u8> = Rgb([255, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_BG: Rgb<u8> = Rgb([20, 20, 20]);
const TEXT_SCALE: f32 = 14.0;
const LINE_HEIGHT: i32 = 18;
const TEXT_MARGIN: i32 = 4;

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Annotated RGB copy of `frame`. Contour points are relative to the lane
/// rectangle's top-left corner.
pub fn render_annotations(
    frame: &FrameView<'_>,
    mask: &LaneMask,
    vehicles: &[&Contour<i32>],
    metrics: &MotionMetrics,
) -> RgbImage {
    let mut out = frame.to_rgb_image();
    if let Some(region) = mask.region() {
        out = tint_region(&out, region);
    }

    let (x0, y0, _, _) = mask.rect();
    for contour in vehicles {
        outline_contour(&mut out, contour, (x0 as f32, y0 as f32));
    }

    let lines = [
        format!("VEHICLES: {}", metrics.vehicle_count),
        format!("DENSITY: {:.1}%", metrics.density),
        format!("MOTION: {:.1}%", metrics.motion_level),
    ];
    draw_info_box(&mut out, &lines);
    out
}

// ============================================================================
// PRIMITIVES
// ============================================================================

/// out = base * (1 - alpha) + filled * alpha, with the fill limited to `region`
fn tint_region(base: &RgbImage, region: Rect) -> RgbImage {
    let mut filled = base.clone();
    draw_filled_rect_mut(&mut filled, region, LANE_TINT);
    map_colors2(base, &filled, |a: Rgb<u8>, b: Rgb<u8>| {
        let mut px = a;
        for c in 0..3 {
            let blended =
                a.0[c] as f32 * (1.0 - LANE_TINT_ALPHA) + b.0[c] as f32 * LANE_TINT_ALPHA;
            px.0[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
        px
    })
}

fn outline_contour(img: &mut RgbImage, contour: &Contour<i32>, offset: (f32, f32)) {
    let points: Vec<(f32, f32)> = contour
        .points
        .iter()
        .map(|p| (p.x as f32 + offset.0, p.y as f32 + offset.1))
        .collect();
    match points.as_slice() {
        [] => {}
        [only] => draw_line_segment_mut(img, *only, *only, VEHICLE_OUTLINE),
        _ => {
            for (i, &start) in points.iter().enumerate() {
                let end = points[(i + 1) % points.len()];
                draw_line_segment_mut(img, start, end, VEHICLE_OUTLINE);
            }
        }
    }
}

fn draw_info_box(img: &mut RgbImage, lines: &[String]) {
    let font = match FontRef::try_from_slice(FONT_DATA) {
        Ok(font) => font,
        Err(e) => {
            warn!("Overlay font unusable, skipping text: {}", e);
            return;
        }
    };
    let scale = PxScale::from(TEXT_SCALE);

    let widest = lines
        .iter()
        .map(|line| text_size(scale, &font, line).0)
        .max()
        .unwrap_or(0);
    let box_width = widest + 2 * TEXT_MARGIN as u32;
    let box_height = lines.len() as u32 * LINE_HEIGHT as u32 + TEXT_MARGIN as u32;
    draw_filled_rect_mut(
        img,
        Rect::at(0, 0).of_size(box_width.max(1), box_height.max(1)),
        TEXT_BG,
    );

    for (i, line) in lines.iter().enumerate() {
        let y = TEXT_MARGIN + i as i32 * LINE_HEIGHT;
        draw_text_mut(img, TEXT_COLOR, TEXT_MARGIN, y, scale, &font, line);
    }
}
