// src/signal/mod.rs
//
// Signal control: density → timing policy, the lane visiting ring, and
// the preemptible phase scheduler that drives it.

pub mod emergency;
pub mod lane_ring;
pub mod scheduler;
pub mod timing_policy;

pub use emergency::EmergencyReportSink;
pub use lane_ring::LaneRing;
pub use scheduler::{LaneScheduler, SchedulerHandle, SchedulerSnapshot};
pub use timing_policy::{compute_timing, SignalTimingPolicy};
