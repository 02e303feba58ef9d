/// Synchronization engine.
///
/// Applies an accepted schedule change to the authoritative instructor
/// document and propagates the denormalized copies into the subject and
/// section documents, keeping the single-source invariant: the
/// instructor's list is truth, every copy is a mirror that converges.
///
/// Per request the flow is `Validated -> InstructorWritten -> Propagating
/// -> Settled`, with `Rejected` before the commit point (validation or
/// conflict, no writes) and `PartiallyFailed` after it (authoritative
/// write stands, journal row stays pending until reconciliation).
mod error;
mod journal;
mod retry;

pub use error::{PropagationStage, ScheduleError};
pub use journal::{PendingPropagation, PropagationAction, PropagationJournal};
pub use retry::RetryPolicy;

use crate::conflict::{check_conflict, ConflictResult};
use crate::schedule::{InstructorId, Schedule, ScheduleDraft, ScheduleId, SubjectId};
use crate::store::{DocumentStore, ScheduleCopy, StoreError};
use dashmap::DashMap;
use retry::with_retry;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retry policy for the denormalized-copy writes.
    pub retry: RetryPolicy,
    /// How many times a losing compare-and-swap write reloads the
    /// instructor list and re-runs the conflict check before giving up.
    pub cas_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            cas_attempts: 3,
        }
    }
}

pub struct SyncEngine<S> {
    store: S,
    journal: Arc<PropagationJournal>,
    config: EngineConfig,
    /// Per-instructor locks serializing schedule changes in this process.
    instructor_locks: DashMap<InstructorId, Arc<Mutex<()>>>,
}

impl<S: DocumentStore> SyncEngine<S> {
    pub fn new(store: S, journal: Arc<PropagationJournal>) -> Self {
        Self::with_config(store, journal, EngineConfig::default())
    }

    pub fn with_config(store: S, journal: Arc<PropagationJournal>, config: EngineConfig) -> Self {
        Self {
            store,
            journal,
            config,
            instructor_locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn journal(&self) -> &PropagationJournal {
        &self.journal
    }

    /// Gets or creates the write lock for the given instructor.
    fn instructor_lock(&self, instructor: &InstructorId) -> Arc<Mutex<()>> {
        self.instructor_locks
            .entry(instructor.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Reads an instructor's current authoritative schedule list.
    pub async fn instructor_schedules(
        &self,
        instructor: &InstructorId,
    ) -> Result<Vec<Schedule>, ScheduleError> {
        Ok(self.store.instructor_schedules(instructor).await?.schedules)
    }

    /// Side-effect-free conflict preview for form validation.
    ///
    /// `exclude` names the schedule being edited so it is not compared
    /// against its own prior version.
    pub async fn check_candidate(
        &self,
        instructor: &InstructorId,
        draft: ScheduleDraft,
        exclude: Option<&ScheduleId>,
    ) -> Result<ConflictResult, ScheduleError> {
        let candidate =
            draft.into_schedule(exclude.cloned().unwrap_or_else(ScheduleId::generate));
        candidate.validate()?;
        let page = self.store.instructor_schedules(instructor).await?;
        Ok(check_conflict(&candidate, &page.schedules, exclude))
    }

    /// Adds a new schedule to an instructor.
    ///
    /// Conflict checking happens before any write; a rejected candidate
    /// has no persisted effect. Once the instructor document write
    /// succeeds the schedule exists, even if copy propagation then fails.
    pub async fn add_schedule(
        &self,
        instructor: &InstructorId,
        draft: ScheduleDraft,
    ) -> Result<Schedule, ScheduleError> {
        let candidate = draft.into_schedule(ScheduleId::generate());
        candidate.validate()?;

        let lock = self.instructor_lock(instructor);
        let _guard = lock.lock().await;

        let (committed, _) = self.commit_to_instructor(instructor, candidate, None).await?;
        info!(
            instructor = %instructor,
            schedule = %committed.id,
            "schedule committed to instructor document"
        );

        let copy = ScheduleCopy::new(committed.clone(), instructor.clone());
        self.journal_pending(instructor, &committed, PropagationAction::Upsert);
        self.propagate_upsert(&copy).await?;
        self.journal_settled(&committed.id);

        Ok(committed)
    }

    /// Replaces an existing schedule in place.
    ///
    /// The replacement is validated as if new, with the edited schedule
    /// excluded from the conflict set; its id is preserved so section
    /// references stay valid across edits.
    pub async fn replace_schedule(
        &self,
        instructor: &InstructorId,
        schedule_id: &ScheduleId,
        draft: ScheduleDraft,
    ) -> Result<Schedule, ScheduleError> {
        let candidate = draft.into_schedule(schedule_id.clone());
        candidate.validate()?;

        let lock = self.instructor_lock(instructor);
        let _guard = lock.lock().await;

        let (committed, previous) = self
            .commit_to_instructor(instructor, candidate, Some(schedule_id))
            .await?;
        info!(
            instructor = %instructor,
            schedule = %committed.id,
            "schedule replaced in instructor document"
        );

        // Stale references first: if the edit moved the schedule to a
        // different subject or section, the old locations must not keep a
        // copy that the authoritative list no longer backs. The journal
        // marker is Remove(previous) until the old locations are clean, so
        // an interrupted edit leaves a missing copy at worst, never a
        // wrongly-present one.
        if let Some(previous) = &previous {
            let moved = previous.subject_id != committed.subject_id
                || previous.section_id != committed.section_id;
            if moved {
                self.journal_pending(instructor, previous, PropagationAction::Remove);
            }
            if previous.subject_id != committed.subject_id {
                with_retry(&self.config.retry, "subject copy remove", || {
                    self.store
                        .remove_subject_schedule_copy(&previous.subject_id, &previous.id)
                })
                .await
                .map_err(|source| {
                    self.propagation_failure(PropagationStage::SubjectCopy, &committed, source)
                })?;
            }
            if let Some(old_section) = &previous.section_id {
                if previous.section_id != committed.section_id {
                    with_retry(&self.config.retry, "section copy clear", || {
                        self.store.set_section_schedule(old_section, None)
                    })
                    .await
                    .map_err(|source| {
                        self.propagation_failure(PropagationStage::SectionCopy, &committed, source)
                    })?;
                }
            }
        }

        let copy = ScheduleCopy::new(committed.clone(), instructor.clone());
        self.journal_pending(instructor, &committed, PropagationAction::Upsert);
        self.propagate_upsert(&copy).await?;
        self.journal_settled(&committed.id);

        Ok(committed)
    }

    /// Removes a schedule: authoritative deletion first, then idempotent
    /// cleanup of every denormalized copy.
    ///
    /// Removing an id the instructor no longer has is a success, so a
    /// retried delete converges instead of erroring.
    pub async fn remove_schedule(
        &self,
        instructor: &InstructorId,
        schedule_id: &ScheduleId,
    ) -> Result<(), ScheduleError> {
        let lock = self.instructor_lock(instructor);
        let _guard = lock.lock().await;

        let mut attempt = 0u32;
        let removed = loop {
            attempt += 1;
            let page = self.store.instructor_schedules(instructor).await?;
            let Some(position) = page.schedules.iter().position(|s| s.id == *schedule_id)
            else {
                break None;
            };

            let mut schedules = page.schedules;
            let removed = schedules.remove(position);
            match self
                .store
                .write_instructor_schedules(instructor, &schedules, page.revision.as_ref())
                .await
            {
                Ok(_) => break Some(removed),
                Err(StoreError::RevisionMismatch) if attempt < self.config.cas_attempts => {
                    warn!(
                        instructor = %instructor,
                        attempt,
                        "instructor document moved during delete, re-reading"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        };

        let Some(removed) = removed else {
            debug!(
                instructor = %instructor,
                schedule = %schedule_id,
                "schedule already absent, delete treated as settled"
            );
            return Ok(());
        };
        info!(
            instructor = %instructor,
            schedule = %removed.id,
            "schedule removed from instructor document"
        );

        self.journal_pending(instructor, &removed, PropagationAction::Remove);
        self.cleanup_copies(&removed).await?;
        self.journal_settled(&removed.id);

        Ok(())
    }

    /// Moves a subject's denormalized copies from one instructor to
    /// another when its roster changes.
    ///
    /// Only the old instructor's contributions are dropped; copies owned
    /// by unaffected instructors survive the rebuild.
    pub async fn reassign_instructor(
        &self,
        subject: &SubjectId,
        old_instructor: &InstructorId,
        new_instructor: &InstructorId,
    ) -> Result<(), ScheduleError> {
        let copies = self.store.subject_schedule_copies(subject).await?;
        let new_page = self.store.instructor_schedules(new_instructor).await?;

        let stale: Vec<&ScheduleCopy> = copies
            .iter()
            .filter(|copy| copy.instructor_id == *old_instructor)
            .collect();
        let additions: Vec<ScheduleCopy> = new_page
            .schedules
            .iter()
            .filter(|schedule| schedule.subject_id == *subject)
            .map(|schedule| ScheduleCopy::new(schedule.clone(), new_instructor.clone()))
            .collect();

        // The removals are independent of each other, as are the upserts.
        let removals = stale.iter().map(|copy| {
            with_retry(&self.config.retry, "subject copy remove", move || {
                self.store
                    .remove_subject_schedule_copy(subject, copy.schedule_id())
            })
        });
        for result in futures::future::join_all(removals).await {
            result?;
        }

        let upserts = additions.iter().map(|copy| {
            with_retry(&self.config.retry, "subject copy upsert", move || {
                self.store.upsert_subject_schedule_copy(subject, copy)
            })
        });
        for result in futures::future::join_all(upserts).await {
            result?;
        }

        info!(
            subject = %subject,
            old_instructor = %old_instructor,
            new_instructor = %new_instructor,
            removed = stale.len(),
            added = additions.len(),
            "subject schedule copies reassigned"
        );
        Ok(())
    }

    /// Replays outstanding journal markers, retrying propagation for
    /// sagas that failed or were interrupted. Returns how many settled.
    pub async fn reconcile(&self) -> usize {
        const BATCH: usize = 50;

        let outstanding = match self.journal.outstanding(BATCH) {
            Ok(rows) => rows,
            Err(err) => {
                warn!(error = %err, "could not read propagation journal");
                return 0;
            }
        };

        let mut settled = 0usize;
        for pending in outstanding {
            let replayed = match pending.action {
                PropagationAction::Upsert => {
                    let copy =
                        ScheduleCopy::new(pending.schedule.clone(), pending.instructor_id.clone());
                    self.propagate_upsert(&copy).await
                }
                PropagationAction::Remove => self.cleanup_copies(&pending.schedule).await,
            };

            match replayed {
                Ok(()) => {
                    self.journal_settled(&pending.schedule.id);
                    info!(
                        schedule = %pending.schedule.id,
                        attempts = pending.attempts,
                        "outstanding propagation settled"
                    );
                    settled += 1;
                }
                Err(err) => {
                    if let Err(journal_err) = self.journal.bump_attempts(&pending.schedule.id) {
                        warn!(error = %journal_err, "could not bump journal attempts");
                    }
                    warn!(
                        schedule = %pending.schedule.id,
                        error = %err,
                        "outstanding propagation still failing"
                    );
                }
            }
        }
        settled
    }

    /// Conflict-checks and writes the instructor document, re-reading on
    /// compare-and-swap losses up to the configured bound.
    ///
    /// `replace` switches between append (add) and replace-by-id (edit);
    /// for a replace the displaced schedule is returned alongside the
    /// committed one.
    async fn commit_to_instructor(
        &self,
        instructor: &InstructorId,
        candidate: Schedule,
        replace: Option<&ScheduleId>,
    ) -> Result<(Schedule, Option<Schedule>), ScheduleError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            // The conflict-check read is never retried; only a CAS loss
            // triggers a re-read.
            let page = self.store.instructor_schedules(instructor).await?;

            let result = check_conflict(&candidate, &page.schedules, replace);
            if result.has_conflict {
                return Err(ScheduleError::Conflict {
                    conflicts: result.conflicts,
                });
            }

            let mut schedules = page.schedules;
            let previous = match replace {
                Some(id) => {
                    let Some(position) = schedules.iter().position(|s| s.id == *id) else {
                        return Err(ScheduleError::UnknownSchedule {
                            instructor_id: instructor.clone(),
                            schedule_id: id.clone(),
                        });
                    };
                    Some(std::mem::replace(&mut schedules[position], candidate.clone()))
                }
                None => {
                    schedules.push(candidate.clone());
                    None
                }
            };

            match self
                .store
                .write_instructor_schedules(instructor, &schedules, page.revision.as_ref())
                .await
            {
                Ok(_) => return Ok((candidate, previous)),
                Err(StoreError::RevisionMismatch) if attempt < self.config.cas_attempts => {
                    warn!(
                        instructor = %instructor,
                        attempt,
                        "instructor document moved, re-reading and re-checking"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Writes the schedule's copy into its subject and, when the schedule
    /// is tied to a section, into that section. Replace-by-id on both
    /// sides keeps the step idempotent.
    async fn propagate_upsert(&self, copy: &ScheduleCopy) -> Result<(), ScheduleError> {
        with_retry(&self.config.retry, "subject copy upsert", || {
            self.store
                .upsert_subject_schedule_copy(&copy.schedule.subject_id, copy)
        })
        .await
        .map_err(|source| {
            self.propagation_failure(PropagationStage::SubjectCopy, &copy.schedule, source)
        })?;

        if let Some(section) = &copy.schedule.section_id {
            with_retry(&self.config.retry, "section copy write", || {
                self.store.set_section_schedule(section, Some(copy))
            })
            .await
            .map_err(|source| {
                self.propagation_failure(PropagationStage::SectionCopy, &copy.schedule, source)
            })?;
        }

        Ok(())
    }

    /// Removes the schedule's copies from its subject and section.
    /// Tolerant of partial prior cleanup: missing copies are not errors.
    async fn cleanup_copies(&self, removed: &Schedule) -> Result<(), ScheduleError> {
        with_retry(&self.config.retry, "subject copy remove", || {
            self.store
                .remove_subject_schedule_copy(&removed.subject_id, &removed.id)
        })
        .await
        .map_err(|source| {
            self.propagation_failure(PropagationStage::SubjectCopy, removed, source)
        })?;

        if let Some(section) = &removed.section_id {
            with_retry(&self.config.retry, "section copy clear", || {
                self.store.set_section_schedule(section, None)
            })
            .await
            .map_err(|source| {
                self.propagation_failure(PropagationStage::SectionCopy, removed, source)
            })?;
        }

        Ok(())
    }

    fn propagation_failure(
        &self,
        stage: PropagationStage,
        committed: &Schedule,
        source: StoreError,
    ) -> ScheduleError {
        error!(
            schedule = %committed.id,
            stage = %stage,
            error = %source,
            "propagation failed after authoritative write; reconciliation will retry"
        );
        ScheduleError::Propagation {
            stage,
            committed: Box::new(committed.clone()),
            source,
        }
    }

    fn journal_pending(
        &self,
        instructor: &InstructorId,
        schedule: &Schedule,
        action: PropagationAction,
    ) {
        if let Err(err) = self.journal.record_pending(instructor, schedule, action) {
            warn!(
                schedule = %schedule.id,
                error = %err,
                "could not record propagation marker"
            );
        }
    }

    fn journal_settled(&self, schedule: &ScheduleId) {
        if let Err(err) = self.journal.mark_settled(schedule) {
            warn!(
                schedule = %schedule,
                error = %err,
                "could not settle propagation marker"
            );
        }
    }
}
