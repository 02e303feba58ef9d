//! Core value types for a weekly class schedule slot.

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of an instructor document in the `teachers` collection.
    InstructorId
);
string_id!(
    /// Identifier of a subject document in the `subjects` collection.
    SubjectId
);
string_id!(
    /// Identifier of a section document in the `sections` collection.
    SectionId
);
string_id!(
    /// Opaque schedule identifier, stable once assigned and unique within
    /// an instructor's schedule list.
    ScheduleId
);

impl ScheduleId {
    /// Generates a fresh schedule id from a timestamp and random suffix.
    pub fn generate() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros();
        let random: u32 = rand::thread_rng().gen();
        Self(format!("sch-{:x}-{:08x}", timestamp, random))
    }
}

/// Day of the week a schedule occurs on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized weekday name: {0:?}")]
pub struct ParseWeekdayError(pub String);

impl FromStr for Weekday {
    type Err = ParseWeekdayError;

    /// Accepts full names ("Monday") and three-letter abbreviations
    /// ("Mon"), case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Weekday::ALL
            .iter()
            .find(|day| {
                let name = day.as_str().to_lowercase();
                name == lower || name[..3] == lower
            })
            .copied()
            .ok_or_else(|| ParseWeekdayError(s.to_string()))
    }
}

// Compiled once; anchors reject stray prefixes/suffixes like "08:00pm".
static TIME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]?\d|2[0-3]):([0-5]\d)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected 24-hour HH:MM wall-clock time, got {0:?}")]
pub struct ParseTimeError(pub String);

/// Wall-clock time of day, stored as minutes since midnight.
///
/// Parsed from and serialized as `HH:MM` (24-hour), the format the
/// surrounding application stores in its schedule documents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Builds a time from minutes since midnight; `None` past 23:59.
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes < 24 * 60 {
            Some(Self(minutes))
        } else {
            None
        }
    }

    /// Minutes since midnight, the unit the overlap check computes in.
    pub fn minutes(&self) -> u16 {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TIME_REGEX
            .captures(s.trim())
            .ok_or_else(|| ParseTimeError(s.to_string()))?;
        let hours: u16 = caps[1].parse().map_err(|_| ParseTimeError(s.to_string()))?;
        let minutes: u16 = caps[2].parse().map_err(|_| ParseTimeError(s.to_string()))?;
        Ok(Self(hours * 60 + minutes))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ParseTimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Semester/academic-year scoping tags.
///
/// Schedules whose scopes differ belong to different terms and never
/// conflict, even with identical days and times.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
}

impl TermScope {
    pub fn matches(&self, other: &TermScope) -> bool {
        self == other
    }
}

/// A single weekly class slot owned by exactly one instructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: ScheduleId,
    /// Weekdays the slot recurs on; deduplicated by construction.
    pub days: BTreeSet<Weekday>,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub room_name: String,
    pub subject_id: SubjectId,
    /// Section the slot is tied to, when one exists for it yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
    #[serde(flatten)]
    pub scope: TermScope,
}

/// A candidate schedule as submitted by the application, before an id has
/// been assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDraft {
    pub days: BTreeSet<Weekday>,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub room_name: String,
    pub subject_id: SubjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
    #[serde(flatten)]
    pub scope: TermScope,
}

impl ScheduleDraft {
    /// Binds the draft to an id, producing a full schedule value.
    pub fn into_schedule(self, id: ScheduleId) -> Schedule {
        Schedule {
            id,
            days: self.days,
            start_time: self.start_time,
            end_time: self.end_time,
            room_name: self.room_name,
            subject_id: self.subject_id,
            section_id: self.section_id,
            scope: self.scope,
        }
    }
}
