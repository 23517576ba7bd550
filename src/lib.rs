// src/lib.rs
//
// Adaptive traffic-signal core.
//
// `analysis` turns camera frames into per-lane density, `signal` turns
// density into phase timings and cycles the lanes, preempting for
// emergency vehicles. `frame_source` and `smoother` serve the runner
// binary.

pub mod analysis;
pub mod config;
pub mod error;
pub mod frame_source;
pub mod metrics;
pub mod signal;
pub mod smoother;
pub mod types;

pub use analysis::{FrameMotionAnalyzer, FrameView};
pub use error::{SignalError, SignalResult};
pub use metrics::{IntersectionMetrics, MetricsSummary};
pub use signal::{
    compute_timing, EmergencyReportSink, LaneScheduler, SchedulerHandle, SchedulerSnapshot,
    SignalTimingPolicy,
};
pub use smoother::DensitySmoother;
pub use types::{Config, LaneBounds, MotionMetrics, Phase, SignalTiming};
