#![allow(dead_code)]

use classreg::schedule::{
    InstructorId, Schedule, ScheduleDraft, ScheduleId, SectionId, SubjectId, TermScope, Weekday,
};
use classreg::store::{
    DocumentStore, InstructorSchedules, MemoryStore, Revision, ScheduleCopy, StoreError,
};
use classreg::sync::{EngineConfig, PropagationJournal, RetryPolicy, SyncEngine};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn draft(
    days: &[Weekday],
    start: &str,
    end: &str,
    room: &str,
    subject: &str,
    section: Option<&str>,
) -> ScheduleDraft {
    ScheduleDraft {
        days: days.iter().copied().collect(),
        start_time: start.parse().unwrap(),
        end_time: end.parse().unwrap(),
        room_name: room.to_string(),
        subject_id: SubjectId::new(subject),
        section_id: section.map(SectionId::new),
        scope: TermScope::default(),
    }
}

pub fn scoped(mut d: ScheduleDraft, semester: &str) -> ScheduleDraft {
    d.scope.semester = Some(semester.to_string());
    d
}

/// Engine with millisecond backoff so retry-path tests stay fast.
pub fn fast_engine<S: DocumentStore>(store: S) -> SyncEngine<S> {
    let journal = Arc::new(PropagationJournal::in_memory().unwrap());
    SyncEngine::with_config(
        store,
        journal,
        EngineConfig {
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
            },
            cas_attempts: 3,
        },
    )
}

pub fn teacher(id: &str) -> InstructorId {
    InstructorId::new(id)
}

pub fn subject(id: &str) -> SubjectId {
    SubjectId::new(id)
}

pub fn section(id: &str) -> SectionId {
    SectionId::new(id)
}

/// Store wrapper that fails a configured number of calls per write kind
/// with a transient error, then recovers.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    instructor_write_mismatches: AtomicU32,
    subject_upsert_failures: AtomicU32,
    subject_remove_failures: AtomicU32,
    section_write_failures: AtomicU32,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` instructor writes lose their compare-and-swap,
    /// as if a concurrent writer had moved the document.
    pub fn fail_instructor_writes(&self, n: u32) {
        self.instructor_write_mismatches.store(n, Ordering::SeqCst);
    }

    pub fn fail_subject_upserts(&self, n: u32) {
        self.subject_upsert_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_subject_removes(&self, n: u32) {
        self.subject_remove_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_section_writes(&self, n: u32) {
        self.section_write_failures.store(n, Ordering::SeqCst);
    }

    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn outage() -> StoreError {
        StoreError::Unavailable {
            message: "injected outage".to_string(),
        }
    }
}

impl DocumentStore for FlakyStore {
    async fn instructor_schedules(
        &self,
        instructor: &InstructorId,
    ) -> Result<InstructorSchedules, StoreError> {
        self.inner.instructor_schedules(instructor).await
    }

    async fn write_instructor_schedules(
        &self,
        instructor: &InstructorId,
        schedules: &[Schedule],
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        if Self::take(&self.instructor_write_mismatches) {
            return Err(StoreError::RevisionMismatch);
        }
        self.inner
            .write_instructor_schedules(instructor, schedules, expected)
            .await
    }

    async fn subject_schedule_copies(
        &self,
        subject: &SubjectId,
    ) -> Result<Vec<ScheduleCopy>, StoreError> {
        self.inner.subject_schedule_copies(subject).await
    }

    async fn upsert_subject_schedule_copy(
        &self,
        subject: &SubjectId,
        copy: &ScheduleCopy,
    ) -> Result<(), StoreError> {
        if Self::take(&self.subject_upsert_failures) {
            return Err(Self::outage());
        }
        self.inner.upsert_subject_schedule_copy(subject, copy).await
    }

    async fn remove_subject_schedule_copy(
        &self,
        subject: &SubjectId,
        schedule: &ScheduleId,
    ) -> Result<(), StoreError> {
        if Self::take(&self.subject_remove_failures) {
            return Err(Self::outage());
        }
        self.inner
            .remove_subject_schedule_copy(subject, schedule)
            .await
    }

    async fn set_section_schedule(
        &self,
        section: &SectionId,
        copy: Option<&ScheduleCopy>,
    ) -> Result<(), StoreError> {
        if Self::take(&self.section_write_failures) {
            return Err(Self::outage());
        }
        self.inner.set_section_schedule(section, copy).await
    }
}
