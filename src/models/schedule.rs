//! Schedule (solution) model.
//!
//! A schedule is the set of [`ScheduleEntry`] rows produced by a run,
//! plus the session units that could not be placed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::{CourseRecord, SessionType};
use crate::grid::{duration_hours, minutes_to_time, Day, TimeRange};

/// Identifier of a schedule entry, unique within one schedule.
pub type EntryId = u64;

/// One taught session in one room at one time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Entry identifier.
    pub id: EntryId,
    /// Course taught.
    pub course_id: String,
    /// Room used. Only a pin without a room leaves this empty.
    pub classroom_id: Option<String>,
    /// Day of the week.
    pub day: Day,
    /// Start minute.
    pub start: u32,
    /// End minute (exclusive).
    pub end: u32,
    /// Session type taught.
    pub session_type: SessionType,
    /// Hours of the session requirement this entry covers.
    pub session_hours: u32,
    /// Pinned by an administrator; never moved by the search.
    pub is_hardcoded: bool,
}

impl ScheduleEntry {
    /// Creates an entry with id 0; [`Schedule::insert`] assigns the real id.
    pub fn new(
        course_id: impl Into<String>,
        day: Day,
        range: TimeRange,
        session_type: SessionType,
        session_hours: u32,
    ) -> Self {
        Self {
            id: 0,
            course_id: course_id.into(),
            classroom_id: None,
            day,
            start: range.start,
            end: range.end,
            session_type,
            session_hours,
            is_hardcoded: false,
        }
    }

    /// Sets the id.
    pub fn with_id(mut self, id: EntryId) -> Self {
        self.id = id;
        self
    }

    /// Sets the classroom.
    pub fn in_classroom(mut self, classroom_id: impl Into<String>) -> Self {
        self.classroom_id = Some(classroom_id.into());
        self
    }

    /// Marks the entry as pinned.
    pub fn hardcoded(mut self) -> Self {
        self.is_hardcoded = true;
        self
    }

    /// Time range.
    #[inline]
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    /// Start as `"HH:MM"`.
    pub fn start_time(&self) -> String {
        minutes_to_time(self.start)
    }

    /// End as `"HH:MM"`.
    pub fn end_time(&self) -> String {
        minutes_to_time(self.end)
    }

    /// Wall-clock hours occupied (partial hours round up).
    pub fn duration_hours(&self) -> u32 {
        duration_hours(self.start, self.end)
    }

    /// Whether two entries are on the same day with overlapping ranges.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.day == other.day && self.range().overlaps(&other.range())
    }

    /// Whether the entry occupies `classroom_id`.
    pub fn uses_classroom(&self, classroom_id: &str) -> bool {
        self.classroom_id.as_deref() == Some(classroom_id)
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} in {}",
            self.course_id,
            self.session_type.as_str(),
            self.day,
            self.range(),
            self.classroom_id.as_deref().unwrap_or("-")
        )
    }
}

/// Why a session unit was left out of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscheduledReason {
    /// The teacher had no free slot.
    NoTeacherSlot,
    /// No compatible classroom was free.
    NoClassroom,
    /// No compatible classroom was large enough.
    Capacity,
    /// The time budget ran out before the unit was tried.
    Timeout,
}

impl UnscheduledReason {
    /// snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnscheduledReason::NoTeacherSlot => "no_teacher_slot",
            UnscheduledReason::NoClassroom => "no_classroom",
            UnscheduledReason::Capacity => "capacity",
            UnscheduledReason::Timeout => "timeout",
        }
    }
}

/// A session unit that could not be placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnscheduledUnit {
    /// Course identifier.
    #[serde(rename = "id")]
    pub course_id: String,
    /// Session type of the unit.
    pub session_type: SessionType,
    /// Hours of the unit.
    pub hours: u32,
    /// Failure category.
    pub reason: UnscheduledReason,
    /// Human-readable detail.
    pub detail: String,
}

/// A set of schedule entries with id allocation.
///
/// Serializes as `{"entries": [...]}`. After loading, new ids continue
/// above the largest stored one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "ScheduleDocument")]
pub struct Schedule {
    /// Entries in insertion order.
    pub entries: Vec<ScheduleEntry>,
    #[serde(skip_serializing)]
    next_id: EntryId,
}

#[derive(Deserialize)]
struct ScheduleDocument {
    #[serde(default)]
    entries: Vec<ScheduleEntry>,
}

impl From<ScheduleDocument> for Schedule {
    fn from(document: ScheduleDocument) -> Self {
        let next_id = document.entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        Self {
            entries: document.entries,
            next_id,
        }
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Adds an entry, assigning it a fresh id.
    pub fn insert(&mut self, mut entry: ScheduleEntry) -> EntryId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        entry.id = id;
        self.entries.push(entry);
        id
    }

    /// Removes an entry by id.
    pub fn remove(&mut self, id: EntryId) -> Option<ScheduleEntry> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Finds an entry by id.
    pub fn get(&self, id: EntryId) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the schedule is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of a course.
    pub fn entries_for_course(&self, course_id: &str) -> Vec<&ScheduleEntry> {
        self.entries
            .iter()
            .filter(|e| e.course_id == course_id)
            .collect()
    }

    /// Entries held in a classroom.
    pub fn entries_for_classroom(&self, classroom_id: &str) -> Vec<&ScheduleEntry> {
        self.entries
            .iter()
            .filter(|e| e.uses_classroom(classroom_id))
            .collect()
    }

    /// Non-pinned hours scheduled per (course, session type).
    pub fn placed_hours(&self) -> HashMap<(String, SessionType), u32> {
        let mut hours = HashMap::new();
        for e in self.entries.iter().filter(|e| !e.is_hardcoded) {
            *hours
                .entry((e.course_id.clone(), e.session_type))
                .or_insert(0) += e.session_hours;
        }
        hours
    }

    /// Pairs of entries double-booking a classroom.
    pub fn classroom_conflicts(&self) -> Vec<(EntryId, EntryId)> {
        let mut conflicts = Vec::new();
        for (i, a) in self.entries.iter().enumerate() {
            for b in &self.entries[i + 1..] {
                if a.classroom_id.is_some() && a.classroom_id == b.classroom_id && a.overlaps(b) {
                    conflicts.push((a.id, b.id));
                }
            }
        }
        conflicts
    }

    /// Consumes the schedule, returning its entries.
    pub fn into_entries(self) -> Vec<ScheduleEntry> {
        self.entries
    }
}

/// `(placed, required)` hours per (course, session type) of active
/// courses. Pins are excluded; entries of unknown courses are ignored.
pub fn session_coverage<'c>(
    courses: &'c [CourseRecord],
    schedule: &'c [ScheduleEntry],
) -> HashMap<(&'c str, SessionType), (u32, u32)> {
    let mut coverage: HashMap<(&str, SessionType), (u32, u32)> = HashMap::new();
    for course in courses.iter().filter(|c| c.active) {
        for session in &course.sessions {
            coverage
                .entry((course.id.as_str(), session.session_type))
                .or_insert((0, 0))
                .1 += session.hours;
        }
    }
    for entry in schedule.iter().filter(|e| !e.is_hardcoded) {
        if let Some(cell) = coverage.get_mut(&(entry.course_id.as_str(), entry.session_type)) {
            cell.0 += entry.session_hours;
        }
    }
    coverage
}
