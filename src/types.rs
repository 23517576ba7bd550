// src/types.rs

use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Vehicles a lane holds at full density
    pub road_capacity: f32,
    /// Contours at or below this area (px²) are ignored
    pub min_contour_area: f64,
    /// Exclusive lower bound on bounding-box width/height
    pub min_aspect_ratio: f32,
    /// Exclusive upper bound on bounding-box width/height
    pub max_aspect_ratio: f32,
    /// Side of the square structuring element used for opening/closing
    pub morph_kernel_size: usize,
    /// Frames after which the background learning rate stops decaying
    pub background_history: u32,
    /// Squared Mahalanobis distance above which a pixel is foreground
    pub background_var_threshold: f32,
    /// Bounds applied when `analyze` runs before `configure_lane`
    pub default_lane: LaneBounds,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            road_capacity: 20.0,
            min_contour_area: 400.0,
            min_aspect_ratio: 0.4,
            max_aspect_ratio: 3.0,
            morph_kernel_size: 5,
            background_history: 500,
            background_var_threshold: 16.0,
            default_lane: LaneBounds::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub min_green_secs: f32,
    pub max_green_secs: f32,
    pub yellow_secs: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_green_secs: 20.0,
            max_green_secs: 120.0,
            yellow_secs: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub num_lanes: usize,
    /// Green time for a lane with a pending emergency; other lanes get half
    pub full_cycle_secs: f64,
    pub yellow_secs: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_lanes: 4,
            full_cycle_secs: 30.0,
            yellow_secs: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub input_dir: String,
    /// Annotated frames are written here when set
    pub output_dir: Option<String>,
    pub frame_interval_ms: u64,
    /// Window of the per-lane density median
    pub smoother_window_size: usize,
    /// Simulated detector feed, replayed through the emergency sink
    pub emergencies: Vec<ScriptedEmergency>,
}

/// "Emergency vehicle on `lane`" delivered before frame `at_frame`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedEmergency {
    pub at_frame: u64,
    pub lane: i64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            input_dir: "frames".to_string(),
            output_dir: None,
            frame_interval_ms: 100,
            smoother_window_size: 5,
            emergencies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// DOMAIN TYPES
// ============================================================================

/// Lane region of interest as percentages of frame height/width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneBounds {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for LaneBounds {
    /// Bottom half of the frame.
    fn default() -> Self {
        Self {
            top: 50.0,
            bottom: 100.0,
            left: 0.0,
            right: 100.0,
        }
    }
}

impl LaneBounds {
    pub fn new(top: f32, bottom: f32, left: f32, right: f32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Clamp every offset into [0, 100]. NaN collapses to 0.
    pub fn clamped(&self) -> Self {
        let c = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) };
        Self {
            top: c(self.top),
            bottom: c(self.bottom),
            left: c(self.left),
            right: c(self.right),
        }
    }
}

/// Per-frame output of the motion analyzer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionMetrics {
    pub vehicle_count: u32,
    /// Composite traffic load, 0-100
    pub density: f32,
    /// Foreground share of the lane, 0-100
    pub motion_level: f32,
}

impl MotionMetrics {
    pub fn empty() -> Self {
        Self {
            vehicle_count: 0,
            density: 0.0,
            motion_level: 0.0,
        }
    }
}

/// Phase durations in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalTiming {
    pub green: f32,
    pub yellow: f32,
    pub red: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Red,
    Green,
    Yellow,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Red => "RED",
            Phase::Green => "GREEN",
            Phase::Yellow => "YELLOW",
        }
    }
}
