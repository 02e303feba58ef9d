//! Conflict detection for an instructor's schedule list.
//!
//! Pure functions only: same inputs always produce the same result, and
//! nothing here touches the store. The synchronization engine runs this
//! check before any write, so a rejected candidate has no persisted effect.

use crate::schedule::{Schedule, ScheduleId};
use serde::Serialize;

/// Outcome of checking a candidate against an instructor's current list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResult {
    pub has_conflict: bool,
    /// Every existing schedule the candidate overlaps, in list order, so
    /// the operator can see exactly which slots to resolve.
    pub conflicts: Vec<Schedule>,
}

impl ConflictResult {
    fn clear() -> Self {
        Self {
            has_conflict: false,
            conflicts: Vec::new(),
        }
    }
}

/// Decides whether `candidate` may join `existing`.
///
/// `exclude` names the schedule being edited, so a slot is never compared
/// against its own prior version.
///
/// A candidate conflicts with an existing schedule when all of these hold:
/// the term scopes are equal, the day sets intersect, and the half-open
/// minute ranges overlap. One shared day with overlapping times is enough;
/// per-day pairings are not enumerated.
pub fn check_conflict(
    candidate: &Schedule,
    existing: &[Schedule],
    exclude: Option<&ScheduleId>,
) -> ConflictResult {
    let mut result = ConflictResult::clear();

    for other in existing {
        if exclude.is_some_and(|id| *id == other.id) {
            continue;
        }
        if overlaps(candidate, other) {
            result.conflicts.push(other.clone());
        }
    }

    result.has_conflict = !result.conflicts.is_empty();
    result
}

/// True when two schedules collide: same scope, shared day, overlapping
/// time windows.
pub fn overlaps(a: &Schedule, b: &Schedule) -> bool {
    a.scope.matches(&b.scope) && shares_day(a, b) && times_overlap(a, b)
}

fn shares_day(a: &Schedule, b: &Schedule) -> bool {
    a.days.iter().any(|day| b.days.contains(day))
}

/// Half-open interval test on minutes since midnight: `[s1,e1)` and
/// `[s2,e2)` overlap iff `s1 < e2 && s2 < e1`. A class ending at 10:00
/// does not collide with one starting at 10:00.
fn times_overlap(a: &Schedule, b: &Schedule) -> bool {
    a.start_time.minutes() < b.end_time.minutes()
        && b.start_time.minutes() < a.end_time.minutes()
}
