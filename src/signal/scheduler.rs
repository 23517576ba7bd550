// src/signal/scheduler.rs
//
// Round-robin lane scheduler with emergency preemption.
//
// One worker task walks the lane ring: GREEN for the head lane, then
// YELLOW, then rotate (the lane drops back to RED at the tail). A lane
// with a pending emergency gets its full green cycle; every other lane
// gets half of it.
//
// All shared state sits behind a single mutex. Critical sections only
// touch indices and flags; phase waits happen outside the lock, so
// emergency reports never wait on a phase. A stop request is latched at
// the next phase boundary: the phase in progress always runs to its end.

use super::lane_ring::LaneRing;
use crate::error::{SignalError, SignalResult};
use crate::metrics::IntersectionMetrics;
use crate::types::{Phase, SchedulerConfig, SignalTiming};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

// ============================================================================
// SHARED STATE
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct ActivePhase {
    lane: usize,
    phase: Phase,
    deadline: Instant,
}

#[derive(Debug)]
struct ScheduleState {
    ring: LaneRing,
    emergency: Vec<bool>,
    full_cycle: Vec<Duration>,
    yellow: Vec<Duration>,
    active: Option<ActivePhase>,
    rotations: u64,
}

impl ScheduleState {
    fn new(config: &SchedulerConfig) -> Self {
        let n = config.num_lanes;
        Self {
            ring: LaneRing::new(n),
            emergency: vec![false; n],
            full_cycle: vec![secs(config.full_cycle_secs); n],
            yellow: vec![secs(config.yellow_secs); n],
            active: None,
            rotations: 0,
        }
    }

    /// Fresh visiting order and flags; per-lane timings are kept.
    fn reset(&mut self) {
        let n = self.emergency.len();
        self.ring = LaneRing::new(n);
        self.emergency = vec![false; n];
        self.active = None;
        self.rotations = 0;
    }
}

struct Shared {
    lanes: usize,
    state: Mutex<ScheduleState>,
    metrics: IntersectionMetrics,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ScheduleState> {
        // every critical section leaves the state consistent, so a panic
        // elsewhere while holding the lock does not invalidate it
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Point-in-time view for displays and telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerSnapshot {
    pub active_lane: Option<usize>,
    pub phase: Phase,
    pub remaining: Duration,
    /// Visiting order, head (active or next-up lane) first
    pub queue: Vec<usize>,
    pub emergency_flags: Vec<bool>,
    pub rotations: u64,
}

// ============================================================================
// HANDLE
// ============================================================================

/// Cloneable, thread-safe access to a scheduler's state.
///
/// Detector threads hold one of these to report emergencies while the
/// `LaneScheduler` itself stays with whoever starts and stops it.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    pub fn lanes(&self) -> usize {
        self.shared.lanes
    }

    pub fn metrics(&self) -> &IntersectionMetrics {
        &self.shared.metrics
    }

    /// Flag `lane` and move it right behind the current head.
    ///
    /// Reporting the current head only sets its flag; its next visit then
    /// gets a full cycle. Out-of-range ids are rejected and change nothing.
    pub fn report_emergency(&self, lane: usize) -> SignalResult<()> {
        if lane >= self.shared.lanes {
            return Err(self.reject(lane as i64));
        }

        let (head, moved) = {
            let mut state = self.shared.lock();
            state.emergency[lane] = true;
            let head = state.ring.head();
            let moved = lane != head && state.ring.move_after(lane, head);
            (head, moved)
        };

        let metrics = &self.shared.metrics;
        metrics.inc(&metrics.emergency_reports);
        if moved {
            metrics.inc(&metrics.preemptions);
            info!("🚑 Emergency on lane {}: moved up to follow lane {}", lane, head);
        } else {
            info!("🚑 Emergency on lane {} (currently served)", lane);
        }
        Ok(())
    }

    pub(crate) fn reject(&self, lane_id: i64) -> SignalError {
        let metrics = &self.shared.metrics;
        metrics.inc(&metrics.rejected_reports);
        warn!(
            "Ignoring emergency report for lane {} (valid lanes 0..{})",
            lane_id, self.shared.lanes
        );
        SignalError::InvalidLaneId {
            lane_id,
            lanes: self.shared.lanes,
        }
    }

    /// Use `timing` for `lane` from its next green onwards.
    ///
    /// `timing.green` becomes the lane's full cycle (emergency visits);
    /// regular visits get half of it.
    pub fn set_lane_timing(&self, lane: usize, timing: &SignalTiming) -> SignalResult<()> {
        if lane >= self.shared.lanes {
            return Err(SignalError::InvalidLaneId {
                lane_id: lane as i64,
                lanes: self.shared.lanes,
            });
        }
        let mut state = self.shared.lock();
        state.full_cycle[lane] = secs(timing.green as f64);
        state.yellow[lane] = secs(timing.yellow as f64);
        Ok(())
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        let now = Instant::now();
        let state = self.shared.lock();
        let (active_lane, phase, remaining) = match state.active {
            Some(a) => (
                Some(a.lane),
                a.phase,
                a.deadline.saturating_duration_since(now),
            ),
            None => (None, Phase::Red, Duration::ZERO),
        };
        SchedulerSnapshot {
            active_lane,
            phase,
            remaining,
            queue: state.ring.order(),
            emergency_flags: state.emergency.clone(),
            rotations: state.rotations,
        }
    }

    // ------------------------------------------------------------------
    // worker-side transitions
    // ------------------------------------------------------------------

    /// Head lane goes GREEN. Returns (lane, had_emergency, green deadline).
    fn begin_green(&self, start: Instant) -> (usize, bool, Instant) {
        let mut state = self.shared.lock();
        let lane = state.ring.head();
        let emergency = std::mem::replace(&mut state.emergency[lane], false);
        let full = state.full_cycle[lane];
        let dwell = if emergency { full } else { full / 2 };
        let deadline = start + dwell;
        state.active = Some(ActivePhase {
            lane,
            phase: Phase::Green,
            deadline,
        });
        (lane, emergency, deadline)
    }

    fn begin_yellow(&self, lane: usize, start: Instant) -> Instant {
        let mut state = self.shared.lock();
        let deadline = start + state.yellow[lane];
        state.active = Some(ActivePhase {
            lane,
            phase: Phase::Yellow,
            deadline,
        });
        deadline
    }

    /// Lane drops to RED and moves to the tail.
    fn finish_cycle(&self) -> usize {
        let mut state = self.shared.lock();
        state.active = None;
        state.rotations += 1;
        state.ring.rotate()
    }

    fn clear_active(&self) {
        self.shared.lock().active = None;
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

pub struct LaneScheduler {
    handle: SchedulerHandle,
    worker: Option<JoinHandle<()>>,
    shutdown: Option<watch::Sender<bool>>,
    has_run: bool,
}

impl LaneScheduler {
    pub fn new(config: &SchedulerConfig) -> SignalResult<Self> {
        Self::with_metrics(config, IntersectionMetrics::new())
    }

    pub fn with_metrics(config: &SchedulerConfig, metrics: IntersectionMetrics) -> SignalResult<Self> {
        if config.num_lanes == 0 {
            return Err(SignalError::NoLanes);
        }
        Ok(Self {
            handle: SchedulerHandle {
                shared: Arc::new(Shared {
                    lanes: config.num_lanes,
                    state: Mutex::new(ScheduleState::new(config)),
                    metrics,
                }),
            },
            worker: None,
            shutdown: None,
            has_run: false,
        })
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn lanes(&self) -> usize {
        self.handle.lanes()
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Spawn the phase loop on the current Tokio runtime.
    ///
    /// A no-op while already running. Starting again after `stop()` resets
    /// the visiting order and every emergency flag.
    pub fn start(&mut self) -> SignalResult<()> {
        if self.is_running() {
            debug!("Scheduler already running");
            return Ok(());
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SignalError::NoRuntime)?;

        if self.has_run {
            self.handle.shared.lock().reset();
        }
        self.has_run = true;

        let (tx, rx) = watch::channel(false);
        self.shutdown = Some(tx);
        self.worker = Some(runtime.spawn(run_phases(self.handle.clone(), rx)));
        info!("🚦 Scheduler started with {} lanes", self.lanes());
        Ok(())
    }

    /// Ask the worker to exit once the current phase completes and wait
    /// for it. Safe to call when not running.
    pub async fn stop(&mut self) {
        // Held until the join: a closed channel means "scheduler dropped"
        // to the worker, which abandons the phase instead of finishing it.
        let shutdown = self.shutdown.take();
        if let Some(tx) = &shutdown {
            // the worker may already be gone
            let _ = tx.send(true);
        }
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                error!("Scheduler worker ended abnormally: {}", e);
                self.handle.clear_active();
            }
            info!("🛑 Scheduler stopped");
        }
        drop(shutdown);
    }

    pub fn report_emergency(&self, lane: usize) -> SignalResult<()> {
        self.handle.report_emergency(lane)
    }

    pub fn set_lane_timing(&self, lane: usize, timing: &SignalTiming) -> SignalResult<()> {
        self.handle.set_lane_timing(lane, timing)
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.handle.snapshot()
    }
}

// ============================================================================
// WORKER
// ============================================================================

async fn run_phases(handle: SchedulerHandle, mut shutdown: watch::Receiver<bool>) {
    let metrics = handle.metrics().clone();
    // Deadlines chain from one another so phase lengths do not drift with
    // scheduling latency.
    let mut cycle_start = Instant::now();

    loop {
        if stop_requested(&shutdown) {
            break;
        }

        let (lane, emergency, green_end) = handle.begin_green(cycle_start);
        if emergency {
            metrics.inc(&metrics.emergency_cycles);
        }
        debug!(
            "Lane {} GREEN for {:.1}s{}",
            lane,
            (green_end - cycle_start).as_secs_f64(),
            if emergency { " (emergency)" } else { "" }
        );
        if !dwell(&mut shutdown, green_end).await || stop_requested(&shutdown) {
            break;
        }

        let yellow_end = handle.begin_yellow(lane, green_end);
        debug!("Lane {} YELLOW", lane);
        if !dwell(&mut shutdown, yellow_end).await {
            break;
        }

        let next = handle.finish_cycle();
        metrics.inc(&metrics.cycles_completed);
        info!("Lane {} cycle complete, lane {} up next", lane, next);
        cycle_start = yellow_end;
    }

    handle.clear_active();
    debug!("Scheduler worker exiting");
}

/// Sleep until `deadline`. A stop request does not cut the phase short;
/// only a dropped scheduler (closed channel) does, returning false.
async fn dwell(shutdown: &mut watch::Receiver<bool>, deadline: Instant) -> bool {
    let timer = sleep_until(deadline);
    tokio::pin!(timer);
    loop {
        tokio::select! {
            _ = &mut timer => return true,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    return false;
                }
                debug!("Stop requested, finishing current phase");
            }
        }
    }
}

fn stop_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Seconds to `Duration`, treating negative or non-finite input as zero.
fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}
