//! Durable pending-propagation journal.
//!
//! The store offers no cross-collection transaction, so each schedule
//! change is a small saga: authoritative write, then copy writes. The
//! journal records which sagas are still in flight; a crash or exhausted
//! retry leaves the row behind for the reconciliation pass to replay.

use crate::schedule::{InstructorId, Schedule, ScheduleId};
use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("../../sql/init_propagation.sql");

/// What the outstanding saga still has to do downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationAction {
    /// Write the schedule's copy into its subject (and section, if any).
    Upsert,
    /// Remove the schedule's copies from its subject and section.
    Remove,
}

impl PropagationAction {
    fn as_str(&self) -> &'static str {
        match self {
            PropagationAction::Upsert => "upsert",
            PropagationAction::Remove => "remove",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "upsert" => Some(PropagationAction::Upsert),
            "remove" => Some(PropagationAction::Remove),
            _ => None,
        }
    }
}

/// An outstanding propagation read back from the journal.
#[derive(Debug, Clone)]
pub struct PendingPropagation {
    pub schedule: Schedule,
    pub instructor_id: InstructorId,
    pub action: PropagationAction,
    pub attempts: i64,
}

pub struct PropagationJournal {
    db: Mutex<Connection>,
}

impl PropagationJournal {
    /// Opens (creating if needed) the journal database at `path`.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// In-memory journal; markers do not survive the process. Used by the
    /// memory store mode and tests.
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow::anyhow!("propagation journal lock poisoned"))
    }

    /// Records (or resets) the marker for a schedule entering propagation.
    pub fn record_pending(
        &self,
        instructor: &InstructorId,
        schedule: &Schedule,
        action: PropagationAction,
    ) -> anyhow::Result<()> {
        let payload = serde_json::to_string(schedule)?;
        let db = self.lock()?;
        db.execute(
            "INSERT INTO pending_propagations(
                schedule_id, instructor_id, action, payload, attempts, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 0, ?5)
            ON CONFLICT(schedule_id) DO UPDATE SET
                instructor_id = excluded.instructor_id,
                action = excluded.action,
                payload = excluded.payload,
                attempts = 0,
                updated_at = excluded.updated_at",
            (
                schedule.id.as_str(),
                instructor.as_str(),
                action.as_str(),
                payload,
                Utc::now().to_rfc3339(),
            ),
        )?;
        Ok(())
    }

    /// Deletes the marker once every copy write has landed. A marker that
    /// is already gone is fine (retried settles are expected).
    pub fn mark_settled(&self, schedule: &ScheduleId) -> anyhow::Result<()> {
        let db = self.lock()?;
        db.execute(
            "DELETE FROM pending_propagations WHERE schedule_id = ?",
            [schedule.as_str()],
        )?;
        Ok(())
    }

    /// Bumps the attempt counter after a failed replay.
    pub fn bump_attempts(&self, schedule: &ScheduleId) -> anyhow::Result<()> {
        let db = self.lock()?;
        db.execute(
            "UPDATE pending_propagations
             SET attempts = attempts + 1, updated_at = ?2
             WHERE schedule_id = ?1",
            (schedule.as_str(), Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    /// Oldest outstanding markers, up to `limit`.
    pub fn outstanding(&self, limit: usize) -> anyhow::Result<Vec<PendingPropagation>> {
        let db = self.lock()?;
        let mut stmt = db.prepare(
            "SELECT schedule_id, instructor_id, action, payload, attempts
             FROM pending_propagations
             ORDER BY updated_at
             LIMIT ?",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut pending = Vec::new();
        for row in rows {
            let (instructor, action, payload, attempts) = row?;
            let Some(action) = PropagationAction::parse(&action) else {
                anyhow::bail!("unrecognized journal action {action:?}");
            };
            let schedule: Schedule = serde_json::from_str(&payload)?;
            pending.push(PendingPropagation {
                schedule,
                instructor_id: InstructorId::new(instructor),
                action,
                attempts,
            });
        }
        Ok(pending)
    }

    /// Number of markers still outstanding.
    pub fn pending_count(&self) -> anyhow::Result<usize> {
        let db = self.lock()?;
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM pending_propagations",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
