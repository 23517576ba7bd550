// src/error.rs

use thiserror::Error;

/// Failures surfaced by the analysis and scheduling core.
///
/// None of these are fatal: frame errors mean "skip this frame", lane id
/// errors mean "ignore this report".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("invalid lane id {lane_id} (intersection has {lanes} lanes)")]
    InvalidLaneId { lane_id: i64, lanes: usize },

    #[error("scheduler needs at least one lane")]
    NoLanes,

    #[error("scheduler must be started from within a Tokio runtime")]
    NoRuntime,
}

pub type SignalResult<T> = std::result::Result<T, SignalError>;
