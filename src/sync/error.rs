//! Error types for the synchronization engine.

use crate::schedule::{InstructorId, Schedule, ScheduleId, ValidationError};
use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Which denormalized write failed after the authoritative commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationStage {
    SubjectCopy,
    SectionCopy,
}

impl fmt::Display for PropagationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropagationStage::SubjectCopy => f.write_str("subject copy"),
            PropagationStage::SectionCopy => f.write_str("section copy"),
        }
    }
}

/// Errors produced by a schedule-change request.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Input problem; nothing was written, resubmit corrected data.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Business-rule rejection, not a fault: the candidate overlaps the
    /// listed schedules. Nothing was written.
    #[error("schedule conflicts with {} existing slot(s)", conflicts.len())]
    Conflict { conflicts: Vec<Schedule> },

    /// A replace targeted a schedule id the instructor does not have.
    #[error("instructor {instructor_id} has no schedule {schedule_id}")]
    UnknownSchedule {
        instructor_id: InstructorId,
        schedule_id: ScheduleId,
    },

    /// The authoritative write succeeded but a denormalized copy write
    /// exhausted its retries. The operation is partially successful:
    /// `committed` already exists at the authoritative layer and must not
    /// be resubmitted; the reconciliation pass will converge the copies.
    #[error("schedule {} committed but the {stage} write failed: {source}", committed.id)]
    Propagation {
        stage: PropagationStage,
        committed: Box<Schedule>,
        source: StoreError,
    },

    /// Store failure before the commit point; nothing was written.
    #[error(transparent)]
    Store(#[from] StoreError),
}
