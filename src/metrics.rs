// src/metrics.rs
//
// Intersection counters. Cheap to clone; every clone shares the same
// atomics, so analyzers, the scheduler worker and detector callers can
// all record into one set.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct IntersectionMetrics {
    pub frames_analyzed: Arc<AtomicU64>,
    pub frames_skipped: Arc<AtomicU64>,
    pub vehicles_counted: Arc<AtomicU64>,
    pub cycles_completed: Arc<AtomicU64>,
    pub emergency_cycles: Arc<AtomicU64>,
    pub emergency_reports: Arc<AtomicU64>,
    pub preemptions: Arc<AtomicU64>,
    pub rejected_reports: Arc<AtomicU64>,
    pub analysis_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl Default for IntersectionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl IntersectionMetrics {
    pub fn new() -> Self {
        Self {
            frames_analyzed: Arc::new(AtomicU64::new(0)),
            frames_skipped: Arc::new(AtomicU64::new(0)),
            vehicles_counted: Arc::new(AtomicU64::new(0)),
            cycles_completed: Arc::new(AtomicU64::new(0)),
            emergency_cycles: Arc::new(AtomicU64::new(0)),
            emergency_reports: Arc::new(AtomicU64::new(0)),
            preemptions: Arc::new(AtomicU64::new(0)),
            rejected_reports: Arc::new(AtomicU64::new(0)),
            analysis_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.frames_analyzed.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            frames_analyzed: self.frames_analyzed.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            fps: self.fps(),
            vehicles_counted: self.vehicles_counted.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            emergency_cycles: self.emergency_cycles.load(Ordering::Relaxed),
            emergency_reports: self.emergency_reports.load(Ordering::Relaxed),
            preemptions: self.preemptions.load(Ordering::Relaxed),
            rejected_reports: self.rejected_reports.load(Ordering::Relaxed),
            last_analysis_us: self.analysis_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub frames_analyzed: u64,
    pub frames_skipped: u64,
    pub fps: f64,
    pub vehicles_counted: u64,
    pub cycles_completed: u64,
    pub emergency_cycles: u64,
    pub emergency_reports: u64,
    pub preemptions: u64,
    pub rejected_reports: u64,
    pub last_analysis_us: u64,
    pub elapsed_secs: f64,
}
