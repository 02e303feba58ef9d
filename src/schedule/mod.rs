/// Schedule entity model: the canonical value type for a weekly class slot
/// plus the validation rules applied before anything is persisted.
mod types;

pub use types::*;

use thiserror::Error;

/// Caller-correctable input problems, surfaced before any write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("start time {start} is not before end time {end}")]
    InvalidTimeRange { start: TimeOfDay, end: TimeOfDay },

    #[error("a schedule needs at least one weekday")]
    EmptyDays,

    #[error("a schedule needs a room to be schedulable")]
    MissingRoom,
}

impl Schedule {
    /// Checks the structural invariants of a single schedule value.
    ///
    /// Pure; conflict checking against other schedules is a separate
    /// concern (see [`crate::conflict`]).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start_time >= self.end_time {
            return Err(ValidationError::InvalidTimeRange {
                start: self.start_time,
                end: self.end_time,
            });
        }
        if self.days.is_empty() {
            return Err(ValidationError::EmptyDays);
        }
        if self.room_name.trim().is_empty() {
            return Err(ValidationError::MissingRoom);
        }
        Ok(())
    }

    /// Two schedules describe the same logical slot when days, time range,
    /// and term scope are equal, independent of id.
    pub fn same_slot(&self, other: &Schedule) -> bool {
        self.days == other.days
            && self.start_time == other.start_time
            && self.end_time == other.end_time
            && self.scope.matches(&other.scope)
    }
}
