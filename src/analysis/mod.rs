// src/analysis/mod.rs
//
// Video-derived lane density.
//
// Signal flow:
//   FrameView ─→ lane_mask (crop) ─→ luma + imageproc blur
//             ─→ background ─→ imageproc open/close + contours
//             ─→ motion_analyzer (MotionMetrics) ─→ overlay (annotated frame)
//
// Orchestrated by motion_analyzer::FrameMotionAnalyzer.

pub mod background;
pub mod frame;
pub mod lane_mask;
pub mod motion_analyzer;
pub mod overlay;

pub use frame::{FrameView, OwnedFrame};
pub use lane_mask::LaneMask;
pub use motion_analyzer::FrameMotionAnalyzer;
