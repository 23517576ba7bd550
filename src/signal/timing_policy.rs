// src/signal/timing_policy.rs
//
// Density → phase durations.
//
// Two linear ramps joined at density 30:
//   [0, 30)   green 20s → 40s   (light traffic gains slowly)
//   [30, 100] green 40s → 120s  (heavy traffic gains fast)
// Yellow is fixed; red mirrors the opposing phase (green + yellow).

use crate::types::{SignalTiming, TimingConfig};

const KNEE_DENSITY: f32 = 30.0;
const KNEE_GAIN_SECS: f32 = 20.0;

#[derive(Debug, Clone)]
pub struct SignalTimingPolicy {
    min_green: f32,
    max_green: f32,
    yellow: f32,
}

impl Default for SignalTimingPolicy {
    fn default() -> Self {
        Self::new(&TimingConfig::default())
    }
}

impl SignalTimingPolicy {
    pub fn new(config: &TimingConfig) -> Self {
        Self {
            min_green: config.min_green_secs,
            max_green: config.max_green_secs,
            yellow: config.yellow_secs,
        }
    }

    /// Pure and deterministic. Density is clamped to [0, 100], infinities
    /// included; NaN counts as empty road.
    pub fn compute(&self, density: f32) -> SignalTiming {
        let d = if density.is_nan() {
            0.0
        } else {
            density.clamp(0.0, 100.0)
        };

        let green = if d < KNEE_DENSITY {
            self.min_green + (d / KNEE_DENSITY) * KNEE_GAIN_SECS
        } else {
            let span = self.max_green - self.min_green - KNEE_GAIN_SECS;
            self.min_green + KNEE_GAIN_SECS + ((d - KNEE_DENSITY) / (100.0 - KNEE_DENSITY)) * span
        };
        let green = green.max(self.min_green).min(self.max_green);

        SignalTiming {
            green,
            yellow: self.yellow,
            red: green + self.yellow,
        }
    }
}

/// `SignalTimingPolicy::default().compute(density)`
pub fn compute_timing(density: f32) -> SignalTiming {
    SignalTimingPolicy::default().compute(density)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_values() {
        assert_eq!(compute_timing(0.0).green, 20.0);
        assert_eq!(compute_timing(30.0).green, 40.0);
        assert_eq!(compute_timing(100.0).green, 120.0);
    }

    #[test]
    fn test_light_traffic_ramp() {
        assert_eq!(compute_timing(15.0).green, 30.0);
    }

    #[test]
    fn test_heavy_traffic_ramp() {
        assert_eq!(compute_timing(65.0).green, 80.0);
    }

    #[test]
    fn test_red_is_green_plus_yellow_everywhere() {
        for i in 0..=1000 {
            let d = i as f32 / 10.0;
            let t = compute_timing(d);
            assert!(t.green >= 0.0 && t.green <= 120.0, "green {} at {}", t.green, d);
            assert_eq!(t.yellow, 5.0);
            assert_eq!(t.red, t.green + 5.0);
        }
    }

    #[test]
    fn test_monotonic_in_density() {
        let mut last = compute_timing(-10.0).green;
        for i in -100..=1100 {
            let g = compute_timing(i as f32 / 10.0).green;
            assert!(g >= last, "green dropped from {} to {} at {}", last, g, i);
            last = g;
        }
    }

    #[test]
    fn test_out_of_range_density_is_clamped() {
        assert_eq!(compute_timing(-5.0).green, 20.0);
        assert_eq!(compute_timing(250.0).green, 120.0);
        assert_eq!(compute_timing(f32::NAN).green, 20.0);
    }

    #[test]
    fn test_infinite_density_saturates() {
        assert_eq!(compute_timing(f32::INFINITY).green, 120.0);
        assert_eq!(compute_timing(f32::NEG_INFINITY).green, 20.0);
        assert!(compute_timing(f32::INFINITY).green >= compute_timing(250.0).green);
    }

    #[test]
    fn test_custom_limits_clamp_green() {
        let policy = SignalTimingPolicy::new(&TimingConfig {
            min_green_secs: 10.0,
            max_green_secs: 25.0,
            yellow_secs: 3.0,
        });
        let t = policy.compute(100.0);
        assert_eq!(t.green, 25.0);
        assert_eq!(t.red, 28.0);
        assert_eq!(policy.compute(0.0).green, 10.0);
    }
}
