// src/smoother.rs

use std::collections::VecDeque;

/// Temporal smoother for lane density using a sliding window
///
/// Frame-to-frame density jumps whenever a car enters or leaves the lane
/// mask; feeding the raw value into the timing policy would make green
/// times jitter. The median over the last few frames ignores single-frame
/// spikes without lagging as much as a long average.
pub struct DensitySmoother {
    history: VecDeque<f32>,
    window_size: usize,
}

impl DensitySmoother {
    /// Create a new smoother with specified window size
    ///
    /// # Arguments
    /// * `window_size` - Number of frames to use for smoothing (e.g., 5 frames)
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            history: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    /// Push the latest density and return the smoothed value
    ///
    /// Non-finite samples are dropped; until three samples exist the raw
    /// value is passed through.
    pub fn smooth(&mut self, density: f32) -> f32 {
        if !density.is_finite() {
            return self.current().unwrap_or(0.0);
        }

        self.history.push_back(density);

        // Maintain window size
        if self.history.len() > self.window_size {
            self.history.pop_front();
        }

        if self.history.len() < 3 {
            return density;
        }

        self.median()
    }

    /// Median of the current window, if any samples exist
    pub fn current(&self) -> Option<f32> {
        if self.history.is_empty() {
            None
        } else {
            Some(self.median())
        }
    }

    fn median(&self) -> f32 {
        let mut values: Vec<f32> = self.history.iter().copied().collect();
        values.sort_by(f32::total_cmp);
        values[values.len() / 2]
    }

    /// Get the number of frames currently in the history
    pub fn history_size(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_until_three_samples() {
        let mut smoother = DensitySmoother::new(5);
        assert_eq!(smoother.smooth(10.0), 10.0);
        assert_eq!(smoother.smooth(50.0), 50.0);
        assert_eq!(smoother.smooth(20.0), 20.0);
    }

    #[test]
    fn test_median_ignores_spike() {
        let mut smoother = DensitySmoother::new(5);

        // Densities with one spike: [20, 22, 21, 95 (spike), 23]
        let mut last = 0.0;
        for d in [20.0, 22.0, 21.0, 95.0, 23.0] {
            last = smoother.smooth(d);
        }

        assert_eq!(last, 22.0);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut smoother = DensitySmoother::new(3);
        for d in [90.0, 90.0, 90.0, 10.0, 10.0] {
            smoother.smooth(d);
        }
        assert_eq!(smoother.history_size(), 3);
        assert_eq!(smoother.current(), Some(10.0));
    }

    #[test]
    fn test_non_finite_samples_are_dropped() {
        let mut smoother = DensitySmoother::new(5);
        assert_eq!(smoother.smooth(f32::NAN), 0.0);
        smoother.smooth(40.0);
        assert_eq!(smoother.smooth(f32::INFINITY), 40.0);
        assert_eq!(smoother.history_size(), 1);
    }
}
