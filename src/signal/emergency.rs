// src/signal/emergency.rs
//
// Inbound channel for emergency-vehicle detectors.
//
// Detectors speak raw integer lane ids (possibly negative or out of range,
// depending on how they were configured); the sink validates them before
// anything touches the schedule.

use super::scheduler::{LaneScheduler, SchedulerHandle};
use crate::error::SignalResult;

/// Receives "an emergency vehicle is waiting on lane N" reports.
///
/// Implementations must be callable from any thread while the scheduler
/// is running.
pub trait EmergencyReportSink: Send + Sync {
    fn report(&self, lane_id: i64) -> SignalResult<()>;
}

impl EmergencyReportSink for SchedulerHandle {
    fn report(&self, lane_id: i64) -> SignalResult<()> {
        match usize::try_from(lane_id) {
            Ok(lane) => self.report_emergency(lane),
            Err(_) => Err(self.reject(lane_id)),
        }
    }
}

impl EmergencyReportSink for LaneScheduler {
    fn report(&self, lane_id: i64) -> SignalResult<()> {
        self.handle().report(lane_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SignalError;
    use crate::types::SchedulerConfig;
    use std::sync::Arc;

    fn scheduler(lanes: usize) -> LaneScheduler {
        LaneScheduler::new(&SchedulerConfig {
            num_lanes: lanes,
            ..SchedulerConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_negative_lane_is_rejected() {
        let scheduler = scheduler(4);
        let before = scheduler.snapshot();
        assert_eq!(
            scheduler.report(-1),
            Err(SignalError::InvalidLaneId { lane_id: -1, lanes: 4 })
        );
        assert_eq!(scheduler.snapshot(), before);
    }

    #[test]
    fn test_lane_equal_to_count_is_rejected() {
        let scheduler = scheduler(4);
        let before = scheduler.snapshot();
        assert!(scheduler.report(4).is_err());
        assert_eq!(scheduler.snapshot(), before);
        assert_eq!(scheduler.handle().metrics().summary().rejected_reports, 1);
    }

    #[test]
    fn test_valid_report_reorders() {
        let scheduler = scheduler(4);
        scheduler.report(2).unwrap();
        assert_eq!(scheduler.snapshot().queue, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_sink_is_usable_as_trait_object() {
        let scheduler = scheduler(3);
        let sink: Arc<dyn EmergencyReportSink> = Arc::new(scheduler.handle());
        let worker = {
            let sink = Arc::clone(&sink);
            std::thread::spawn(move || sink.report(1))
        };
        worker.join().unwrap().unwrap();
        assert_eq!(scheduler.snapshot().emergency_flags, vec![false, true, false]);
    }
}
