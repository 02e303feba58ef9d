//! Record shapes exchanged with the document store.

use crate::schedule::{InstructorId, Schedule, ScheduleId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque revision token for an instructor document, used for
/// compare-and-swap writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An instructor's authoritative schedule list as read from the
/// `teachers` collection.
///
/// `revision` is `None` when the instructor has no document yet; a
/// subsequent write then expects the document to still be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorSchedules {
    pub schedules: Vec<Schedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<Revision>,
}

/// A denormalized schedule copy stored under a subject or section
/// document.
///
/// Copies are mirrors, never a second source of truth: they carry the
/// originating schedule (with its id), the owning instructor, and the
/// time the copy was written, and are always replaced whole by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCopy {
    pub schedule: Schedule,
    pub instructor_id: InstructorId,
    pub copied_at: String,
}

impl ScheduleCopy {
    pub fn new(schedule: Schedule, instructor_id: InstructorId) -> Self {
        Self {
            schedule,
            instructor_id,
            copied_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Id of the originating schedule, the replace-by-id key.
    pub fn schedule_id(&self) -> &ScheduleId {
        &self.schedule.id
    }
}
