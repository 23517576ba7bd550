// src/analysis/background.rs
//
// Adaptive background model.
//
// Each pixel carries a running Gaussian (mean, variance) of its intensity.
// A pixel is foreground when its squared distance from the mean exceeds
// `var_threshold` variances. Every call also folds the new frame into the
// model, so the scene's static appearance is learned continuously and
// parked vehicles eventually fade into the background.
//
// Learning rate is 1/n for the first `history` frames (an exact running
// average) and 1/history afterwards.
//
// The model covers the lane rectangle only, not the whole camera frame.

use crate::error::{SignalError, SignalResult};
use image::GrayImage;

const VAR_INIT: f32 = 15.0;
const VAR_MIN: f32 = 4.0;
const VAR_MAX: f32 = 75.0;

#[derive(Debug, Clone)]
pub struct BackgroundConfig {
    pub history: u32,
    pub var_threshold: f32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            history: 500,
            var_threshold: 16.0,
        }
    }
}

/// Per-lane statistical model of the static scene. Not shared.
#[derive(Debug, Clone)]
pub struct BackgroundModel {
    config: BackgroundConfig,
    mean: Vec<f32>,
    variance: Vec<f32>,
    width: u32,
    height: u32,
    frames_seen: u32,
}

impl BackgroundModel {
    pub fn new(width: u32, height: u32, config: BackgroundConfig) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            config,
            mean: vec![0.0; pixels],
            variance: vec![VAR_INIT; pixels],
            width,
            height,
            frames_seen: 0,
        }
    }

    pub fn frames_seen(&self) -> u32 {
        self.frames_seen
    }

    fn learning_rate(&self) -> f32 {
        let n = self.frames_seen.min(self.config.history.max(1)).max(1);
        1.0 / n as f32
    }

    /// Classify `gray` against the model and update it.
    ///
    /// Returns the foreground mask: 255 for foreground pixels, 0 otherwise.
    /// `gray` must match the model's size.
    pub fn apply(&mut self, gray: &GrayImage) -> SignalResult<GrayImage> {
        if gray.dimensions() != (self.width, self.height) {
            return Err(SignalError::InvalidFrame(format!(
                "background model is {}x{}, got {}x{}",
                self.width,
                self.height,
                gray.width(),
                gray.height()
            )));
        }

        let mut out = GrayImage::new(self.width, self.height);
        self.frames_seen = self.frames_seen.saturating_add(1);
        let alpha = self.learning_rate();
        let threshold = self.config.var_threshold;
        let first = self.frames_seen == 1;

        for ((&px, o), (mean, var)) in gray
            .as_raw()
            .iter()
            .zip(out.iter_mut())
            .zip(self.mean.iter_mut().zip(self.variance.iter_mut()))
        {
            let value = px as f32;
            if first {
                *mean = value;
                *o = 0;
                continue;
            }

            let diff = value - *mean;
            let dist2 = diff * diff;
            *o = if dist2 > threshold * *var { 255 } else { 0 };

            *mean += alpha * diff;
            *var = (*var + alpha * (dist2 - *var)).clamp(VAR_MIN, VAR_MAX);
        }
        Ok(out)
    }
}
