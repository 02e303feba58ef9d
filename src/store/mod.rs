/// Data access facade over the document store collections (`teachers`,
/// `subjects`, `sections`).
///
/// The synchronization engine only ever talks to the store through the
/// [`DocumentStore`] trait; backends are the in-memory store (dev/tests)
/// and the REST client against the remote document store.
mod memory;
mod rest;
mod types;

pub use memory::MemoryStore;
pub use rest::RestStore;
pub use types::{InstructorSchedules, Revision, ScheduleCopy};

use crate::schedule::{InstructorId, Schedule, ScheduleId, SectionId, SubjectId};
use std::future::Future;
use thiserror::Error;

/// Failures reported by a store backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Transient network/availability failure; worth retrying.
    #[error("document store unavailable: {message}")]
    Unavailable { message: String },

    /// Compare-and-swap write lost against a concurrent writer.
    #[error("instructor document changed since it was read")]
    RevisionMismatch,

    /// The store returned data this core cannot interpret.
    #[error("malformed store document: {message}")]
    MalformedDocument { message: String },

    /// The backend was configured with unusable parameters.
    #[error("store configuration error: {message}")]
    Configuration { message: String },
}

impl StoreError {
    /// Returns true if this error is potentially transient and retryable.
    ///
    /// A `RevisionMismatch` is deliberately not retryable here: retrying
    /// the same write would race again; the engine must re-read and
    /// re-run the conflict check instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Unavailable {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::MalformedDocument {
            message: err.to_string(),
        }
    }
}

/// Abstract read/write interface over the document store.
///
/// Every method is a suspension point; none of them assume the store
/// offers locks or transactions. Writes to denormalized locations are
/// replace-by-id and idempotent so a retried call converges instead of
/// duplicating copies.
pub trait DocumentStore: Send + Sync {
    /// Reads an instructor's authoritative schedule list. Unknown
    /// instructors yield an empty list with no revision.
    fn instructor_schedules(
        &self,
        instructor: &InstructorId,
    ) -> impl Future<Output = Result<InstructorSchedules, StoreError>> + Send;

    /// Replaces an instructor's schedule list whole.
    ///
    /// `expected` must be the revision returned by the preceding read
    /// (`None` when the document was absent); a stale expectation fails
    /// with [`StoreError::RevisionMismatch`] and nothing is written.
    fn write_instructor_schedules(
        &self,
        instructor: &InstructorId,
        schedules: &[Schedule],
        expected: Option<&Revision>,
    ) -> impl Future<Output = Result<Revision, StoreError>> + Send;

    /// Lists the denormalized schedule copies held by a subject.
    fn subject_schedule_copies(
        &self,
        subject: &SubjectId,
    ) -> impl Future<Output = Result<Vec<ScheduleCopy>, StoreError>> + Send;

    /// Inserts or replaces (by originating schedule id) one copy in a
    /// subject's copy set, leaving unrelated entries alone.
    fn upsert_subject_schedule_copy(
        &self,
        subject: &SubjectId,
        copy: &ScheduleCopy,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes the copy with the given schedule id from a subject.
    /// A no-op when the copy is already gone.
    fn remove_subject_schedule_copy(
        &self,
        subject: &SubjectId,
        schedule: &ScheduleId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Sets or clears a section's single schedule copy.
    fn set_section_schedule(
        &self,
        section: &SectionId,
        copy: Option<&ScheduleCopy>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Backend selected at startup from configuration.
pub enum StoreBackend {
    Memory(MemoryStore),
    Rest(RestStore),
}

impl DocumentStore for StoreBackend {
    async fn instructor_schedules(
        &self,
        instructor: &InstructorId,
    ) -> Result<InstructorSchedules, StoreError> {
        match self {
            StoreBackend::Memory(s) => s.instructor_schedules(instructor).await,
            StoreBackend::Rest(s) => s.instructor_schedules(instructor).await,
        }
    }

    async fn write_instructor_schedules(
        &self,
        instructor: &InstructorId,
        schedules: &[Schedule],
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        match self {
            StoreBackend::Memory(s) => {
                s.write_instructor_schedules(instructor, schedules, expected).await
            }
            StoreBackend::Rest(s) => {
                s.write_instructor_schedules(instructor, schedules, expected).await
            }
        }
    }

    async fn subject_schedule_copies(
        &self,
        subject: &SubjectId,
    ) -> Result<Vec<ScheduleCopy>, StoreError> {
        match self {
            StoreBackend::Memory(s) => s.subject_schedule_copies(subject).await,
            StoreBackend::Rest(s) => s.subject_schedule_copies(subject).await,
        }
    }

    async fn upsert_subject_schedule_copy(
        &self,
        subject: &SubjectId,
        copy: &ScheduleCopy,
    ) -> Result<(), StoreError> {
        match self {
            StoreBackend::Memory(s) => s.upsert_subject_schedule_copy(subject, copy).await,
            StoreBackend::Rest(s) => s.upsert_subject_schedule_copy(subject, copy).await,
        }
    }

    async fn remove_subject_schedule_copy(
        &self,
        subject: &SubjectId,
        schedule: &ScheduleId,
    ) -> Result<(), StoreError> {
        match self {
            StoreBackend::Memory(s) => s.remove_subject_schedule_copy(subject, schedule).await,
            StoreBackend::Rest(s) => s.remove_subject_schedule_copy(subject, schedule).await,
        }
    }

    async fn set_section_schedule(
        &self,
        section: &SectionId,
        copy: Option<&ScheduleCopy>,
    ) -> Result<(), StoreError> {
        match self {
            StoreBackend::Memory(s) => s.set_section_schedule(section, copy).await,
            StoreBackend::Rest(s) => s.set_section_schedule(section, copy).await,
        }
    }
}
