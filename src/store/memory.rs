//! In-memory store backend.
//!
//! Backs the development mode and the test suites. Mirrors the remote
//! store's semantics exactly: revisioned compare-and-swap on instructor
//! documents, replace-by-id copy sets on subjects, a single nullable copy
//! per section.

use super::types::{InstructorSchedules, Revision, ScheduleCopy};
use super::StoreError;
use crate::schedule::{InstructorId, Schedule, ScheduleId, SectionId, SubjectId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

struct TeacherDoc {
    schedules: Vec<Schedule>,
    revision: Revision,
}

#[derive(Default)]
pub struct MemoryStore {
    teachers: DashMap<InstructorId, TeacherDoc>,
    subjects: DashMap<SubjectId, Vec<ScheduleCopy>>,
    sections: DashMap<SectionId, Option<ScheduleCopy>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current schedule copy of a section, for inspection in dev mode and
    /// tests. Not part of the facade the engine consumes.
    pub fn section_schedule(&self, section: &SectionId) -> Option<ScheduleCopy> {
        self.sections
            .get(section)
            .and_then(|entry| entry.value().clone())
    }

    /// Revision of the serialized schedule list.
    ///
    /// The digest is over content, not a counter, so re-writing an
    /// identical list yields the same token.
    fn digest(schedules: &[Schedule]) -> Result<Revision, StoreError> {
        let encoded = serde_json::to_vec(schedules)?;
        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        let result = hasher.finalize();
        Ok(Revision::new(hex::encode(&result[..16])))
    }
}

impl super::DocumentStore for MemoryStore {
    async fn instructor_schedules(
        &self,
        instructor: &InstructorId,
    ) -> Result<InstructorSchedules, StoreError> {
        Ok(self
            .teachers
            .get(instructor)
            .map(|doc| InstructorSchedules {
                schedules: doc.schedules.clone(),
                revision: Some(doc.revision.clone()),
            })
            .unwrap_or_default())
    }

    async fn write_instructor_schedules(
        &self,
        instructor: &InstructorId,
        schedules: &[Schedule],
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        let next = Self::digest(schedules)?;

        match self.teachers.entry(instructor.clone()) {
            Entry::Occupied(mut entry) => {
                if expected != Some(&entry.get().revision) {
                    return Err(StoreError::RevisionMismatch);
                }
                entry.insert(TeacherDoc {
                    schedules: schedules.to_vec(),
                    revision: next.clone(),
                });
            }
            Entry::Vacant(entry) => {
                if expected.is_some() {
                    return Err(StoreError::RevisionMismatch);
                }
                entry.insert(TeacherDoc {
                    schedules: schedules.to_vec(),
                    revision: next.clone(),
                });
            }
        }

        Ok(next)
    }

    async fn subject_schedule_copies(
        &self,
        subject: &SubjectId,
    ) -> Result<Vec<ScheduleCopy>, StoreError> {
        Ok(self
            .subjects
            .get(subject)
            .map(|copies| copies.value().clone())
            .unwrap_or_default())
    }

    async fn upsert_subject_schedule_copy(
        &self,
        subject: &SubjectId,
        copy: &ScheduleCopy,
    ) -> Result<(), StoreError> {
        let mut copies = self.subjects.entry(subject.clone()).or_default();
        copies.retain(|existing| existing.schedule_id() != copy.schedule_id());
        copies.push(copy.clone());
        Ok(())
    }

    async fn remove_subject_schedule_copy(
        &self,
        subject: &SubjectId,
        schedule: &ScheduleId,
    ) -> Result<(), StoreError> {
        if let Some(mut copies) = self.subjects.get_mut(subject) {
            copies.retain(|existing| existing.schedule_id() != schedule);
        }
        Ok(())
    }

    async fn set_section_schedule(
        &self,
        section: &SectionId,
        copy: Option<&ScheduleCopy>,
    ) -> Result<(), StoreError> {
        self.sections.insert(section.clone(), copy.cloned());
        Ok(())
    }
}

/// Helper module for hex encoding (avoiding extra dependency).
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{ScheduleId, SubjectId, TermScope, Weekday};
    use crate::store::DocumentStore;

    fn slot(id: &str) -> Schedule {
        Schedule {
            id: ScheduleId::new(id),
            days: [Weekday::Monday].into_iter().collect(),
            start_time: "08:00".parse().unwrap(),
            end_time: "09:00".parse().unwrap(),
            room_name: "A-101".to_string(),
            subject_id: SubjectId::new("MATH101"),
            section_id: None,
            scope: TermScope::default(),
        }
    }

    #[tokio::test]
    async fn test_unknown_instructor_reads_empty() {
        let store = MemoryStore::new();
        let page = store
            .instructor_schedules(&InstructorId::new("t1"))
            .await
            .unwrap();
        assert!(page.schedules.is_empty());
        assert!(page.revision.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let store = MemoryStore::new();
        let teacher = InstructorId::new("t1");

        let rev = store
            .write_instructor_schedules(&teacher, &[slot("a")], None)
            .await
            .unwrap();

        let page = store.instructor_schedules(&teacher).await.unwrap();
        assert_eq!(page.schedules.len(), 1);
        assert_eq!(page.revision, Some(rev));
    }

    #[tokio::test]
    async fn test_stale_revision_is_rejected() {
        let store = MemoryStore::new();
        let teacher = InstructorId::new("t1");

        let first = store
            .write_instructor_schedules(&teacher, &[slot("a")], None)
            .await
            .unwrap();
        store
            .write_instructor_schedules(&teacher, &[slot("a"), slot("b")], Some(&first))
            .await
            .unwrap();

        // Writing again with the first revision must lose.
        let err = store
            .write_instructor_schedules(&teacher, &[slot("c")], Some(&first))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RevisionMismatch));
    }

    #[tokio::test]
    async fn test_create_expects_absent_document() {
        let store = MemoryStore::new();
        let teacher = InstructorId::new("t1");
        store
            .write_instructor_schedules(&teacher, &[slot("a")], None)
            .await
            .unwrap();

        let err = store
            .write_instructor_schedules(&teacher, &[slot("b")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RevisionMismatch));
    }

    #[tokio::test]
    async fn test_subject_upsert_replaces_by_id() {
        let store = MemoryStore::new();
        let subject = SubjectId::new("MATH101");
        let teacher = InstructorId::new("t1");

        let copy = ScheduleCopy::new(slot("a"), teacher.clone());
        store.upsert_subject_schedule_copy(&subject, &copy).await.unwrap();
        store.upsert_subject_schedule_copy(&subject, &copy).await.unwrap();

        let copies = store.subject_schedule_copies(&subject).await.unwrap();
        assert_eq!(copies.len(), 1);

        let other = ScheduleCopy::new(slot("b"), teacher);
        store.upsert_subject_schedule_copy(&subject, &other).await.unwrap();
        assert_eq!(store.subject_schedule_copies(&subject).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_missing_copy_is_a_no_op() {
        let store = MemoryStore::new();
        let subject = SubjectId::new("MATH101");
        store
            .remove_subject_schedule_copy(&subject, &ScheduleId::new("ghost"))
            .await
            .unwrap();
    }
}
