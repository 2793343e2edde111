//! Availability and conflict validation.
//!
//! Two layers of checks:
//! - [`validate_input`]: structural integrity of the records before a run
//!   (duplicate IDs, pins naming unknown classrooms, malformed pin times).
//! - [`ConstraintValidator`]: hard-constraint checks for one proposed
//!   (day, time range) against the entries placed so far.
//!
//! The per-slot checks never fail with an error. Every problem, including
//! unusable availability data, is reported as a [`ValidationError`] inside
//! a [`ValidationOutcome`].

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::grid::{Day, TimeRange};
use crate::models::{
    Availability, ClassroomRecord, CourseRecord, EntryId, ScheduleEntry, SessionType,
};

/// Result of the structural input check.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A pin references a classroom that doesn't exist.
    UnknownClassroom,
    /// A pin has an unparsable or empty time range.
    InvalidTime,
    /// Availability data is missing or unparsable (warning).
    MalformedAvailability,
    /// The slot lies outside the teacher's working hours.
    TeacherUnavailable,
    /// The teacher already teaches at an overlapping time.
    TeacherConflict,
    /// No classroom was given.
    ClassroomMissing,
    /// The classroom is inactive.
    ClassroomInactive,
    /// The slot lies outside the classroom's opening hours.
    ClassroomUnavailable,
    /// The classroom is already booked at an overlapping time.
    ClassroomConflict,
    /// The room's type or size cannot host the session.
    ClassroomUnsuitable,
    /// The course already has an overlapping session.
    CourseConflict,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether this is a degraded-data warning rather than a hard violation.
    pub fn is_warning(&self) -> bool {
        self.kind == ValidationErrorKind::MalformedAvailability
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Outcome of a single slot check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    /// Whether the slot may be used.
    pub valid: bool,
    /// Every problem found.
    pub errors: Vec<ValidationError>,
}

impl ValidationOutcome {
    /// A passing outcome.
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    fn push(&mut self, kind: ValidationErrorKind, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError::new(kind, message));
    }

    /// Whether any error has the given kind.
    pub fn has(&self, kind: ValidationErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    /// Folds another outcome into this one.
    pub fn merge(&mut self, other: ValidationOutcome) {
        self.valid &= other.valid;
        self.errors.extend(other.errors);
    }
}

/// A teacher with parsed working hours.
#[derive(Debug, Clone, PartialEq)]
pub struct Teacher {
    /// Teacher identifier.
    pub id: String,
    /// Working hours.
    pub availability: Availability,
}

impl Teacher {
    /// Creates a teacher.
    pub fn new(id: impl Into<String>, availability: Availability) -> Self {
        Self {
            id: id.into(),
            availability,
        }
    }

    /// Parses the teacher of a course, if it has one.
    pub fn from_course(course: &CourseRecord) -> Option<Self> {
        let id = course.teacher_id.as_ref()?;
        Some(Self::new(
            id.clone(),
            Availability::for_teacher(course.teacher_working_hours.as_ref()),
        ))
    }
}

/// A classroom with parsed opening hours.
#[derive(Debug, Clone)]
pub struct Classroom<'a> {
    /// The input record.
    pub record: &'a ClassroomRecord,
    /// Opening hours.
    pub availability: Availability,
}

impl<'a> Classroom<'a> {
    /// Parses a classroom record.
    pub fn parse(record: &'a ClassroomRecord) -> Self {
        Self {
            record,
            availability: Availability::for_classroom(record.available_hours.as_ref()),
        }
    }

    /// Classroom id.
    pub fn id(&self) -> &str {
        &self.record.id
    }
}

/// Hard-constraint checks against already placed entries.
///
/// Knows which teacher teaches each course, so a teacher's double-booking
/// can be detected from entries that only carry a course id.
#[derive(Debug, Clone, Default)]
pub struct ConstraintValidator {
    course_teachers: HashMap<String, String>,
}

impl ConstraintValidator {
    /// Builds the course → teacher index.
    pub fn new(courses: &[CourseRecord]) -> Self {
        let course_teachers = courses
            .iter()
            .filter_map(|c| c.teacher_id.as_ref().map(|t| (c.id.clone(), t.clone())))
            .collect();
        Self { course_teachers }
    }

    /// Teacher of a course.
    pub fn teacher_of(&self, course_id: &str) -> Option<&str> {
        self.course_teachers.get(course_id).map(|s| s.as_str())
    }

    /// Checks a teacher's availability and double-booking.
    ///
    /// `None` means the session has no teacher constraint and is always valid.
    /// The entry whose id equals `exclude_id` is ignored, so an existing
    /// entry can be re-validated at a new position.
    pub fn validate_teacher(
        &self,
        teacher: Option<&Teacher>,
        day: Day,
        range: TimeRange,
        existing: &[ScheduleEntry],
        exclude_id: Option<EntryId>,
    ) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::ok();
        let Some(teacher) = teacher else {
            return outcome;
        };

        match &teacher.availability {
            Availability::Unrestricted => {}
            Availability::Declared(calendar) => {
                if !calendar.covers(day, range) {
                    outcome.push(
                        ValidationErrorKind::TeacherUnavailable,
                        format!("Teacher '{}' is not available on {day} {range}", teacher.id),
                    );
                }
            }
            Availability::Malformed(warning) => {
                outcome.push(
                    ValidationErrorKind::MalformedAvailability,
                    format!("Teacher '{}' working hours unusable: {warning}", teacher.id),
                );
            }
        }

        for entry in existing {
            if Some(entry.id) == exclude_id || entry.day != day || !entry.range().overlaps(&range) {
                continue;
            }
            if self.teacher_of(&entry.course_id) == Some(teacher.id.as_str()) {
                outcome.push(
                    ValidationErrorKind::TeacherConflict,
                    format!(
                        "Teacher '{}' already teaches '{}' on {day} {}",
                        teacher.id,
                        entry.course_id,
                        entry.range()
                    ),
                );
            }
        }

        outcome
    }

    /// Checks a classroom's opening hours and double-booking.
    ///
    /// A classroom is mandatory: `None` is invalid.
    pub fn validate_classroom(
        &self,
        classroom: Option<&Classroom<'_>>,
        day: Day,
        range: TimeRange,
        existing: &[ScheduleEntry],
        exclude_id: Option<EntryId>,
    ) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::ok();
        let Some(classroom) = classroom else {
            outcome.push(ValidationErrorKind::ClassroomMissing, "No classroom given");
            return outcome;
        };

        if !classroom.record.active {
            outcome.push(
                ValidationErrorKind::ClassroomInactive,
                format!("Classroom '{}' is inactive", classroom.id()),
            );
        }

        match &classroom.availability {
            Availability::Unrestricted => {}
            Availability::Declared(calendar) => {
                if !calendar.covers(day, range) {
                    outcome.push(
                        ValidationErrorKind::ClassroomUnavailable,
                        format!("Classroom '{}' is closed on {day} {range}", classroom.id()),
                    );
                }
            }
            Availability::Malformed(warning) => {
                outcome.push(
                    ValidationErrorKind::MalformedAvailability,
                    format!("Classroom '{}' opening hours unusable: {warning}", classroom.id()),
                );
            }
        }

        for entry in existing {
            if Some(entry.id) == exclude_id || entry.day != day || !entry.range().overlaps(&range) {
                continue;
            }
            if entry.uses_classroom(classroom.id()) {
                outcome.push(
                    ValidationErrorKind::ClassroomConflict,
                    format!(
                        "Classroom '{}' already holds '{}' on {day} {}",
                        classroom.id(),
                        entry.course_id,
                        entry.range()
                    ),
                );
            }
        }

        outcome
    }

    /// Checks that a room's type and effective capacity suit a course session.
    pub fn validate_room_fit(
        &self,
        course: &CourseRecord,
        classroom: &ClassroomRecord,
        session_type: SessionType,
    ) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::ok();
        if !classroom.room_type.accepts(session_type) {
            outcome.push(
                ValidationErrorKind::ClassroomUnsuitable,
                format!(
                    "Classroom '{}' cannot host {} sessions",
                    classroom.id,
                    session_type.as_str()
                ),
            );
        }
        let seats = classroom.effective_capacity(course.capacity_margin);
        if seats < course.student_count() {
            outcome.push(
                ValidationErrorKind::ClassroomUnsuitable,
                format!(
                    "Classroom '{}' seats {seats}, course '{}' has {} students",
                    classroom.id,
                    course.id,
                    course.student_count()
                ),
            );
        }
        outcome
    }

    /// Checks that a course does not attend two sessions at once.
    pub fn validate_course_overlap(
        &self,
        course_id: &str,
        day: Day,
        range: TimeRange,
        existing: &[ScheduleEntry],
        exclude_id: Option<EntryId>,
    ) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::ok();
        for entry in existing {
            if Some(entry.id) == exclude_id || entry.course_id != course_id {
                continue;
            }
            if entry.day == day && entry.range().overlaps(&range) {
                outcome.push(
                    ValidationErrorKind::CourseConflict,
                    format!("Course '{course_id}' already meets on {day} {}", entry.range()),
                );
            }
        }
        outcome
    }
}

/// Validates the input records before scheduling.
///
/// Checks:
/// 1. No duplicate course IDs
/// 2. No duplicate classroom IDs
/// 3. Every pinned classroom exists
/// 4. Every pinned time range parses and is non-empty
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(courses: &[CourseRecord], classrooms: &[ClassroomRecord]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut classroom_ids = HashSet::new();
    for room in classrooms {
        if !classroom_ids.insert(room.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate classroom ID: {}", room.id),
            ));
        }
    }

    let mut course_ids = HashSet::new();
    for course in courses {
        if !course_ids.insert(course.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate course ID: {}", course.id),
            ));
        }

        for pin in &course.hardcoded {
            if let Some(room_id) = &pin.classroom_id {
                if !classroom_ids.contains(room_id.as_str()) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::UnknownClassroom,
                        format!(
                            "Course '{}' pins unknown classroom '{}'",
                            course.id, room_id
                        ),
                    ));
                }
            }
            match pin.range() {
                Ok(range) if range.is_valid() => {}
                Ok(range) => errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidTime,
                    format!("Course '{}' pins empty range {range}", course.id),
                )),
                Err(e) => errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidTime,
                    format!("Course '{}' pin time: {e}", course.id),
                )),
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HardcodedPlacement, SessionType, WeeklyAvailability};
    use serde_json::json;

    fn monday_9_to_11() -> Teacher {
        Teacher::new(
            "T1",
            Availability::Declared(WeeklyAvailability::new().with_window(Day::Monday, 540, 660)),
        )
    }

    fn courses() -> Vec<CourseRecord> {
        vec![
            CourseRecord::new("C1").with_teacher("T1"),
            CourseRecord::new("C2").with_teacher("T1"),
            CourseRecord::new("C3").with_teacher("T2"),
        ]
    }

    fn entry(id: EntryId, course: &str, room: &str, day: Day, start: u32, end: u32) -> ScheduleEntry {
        ScheduleEntry::new(course, day, TimeRange::new(start, end), SessionType::Theoretical, 1)
            .in_classroom(room)
            .with_id(id)
    }

    #[test]
    fn test_null_teacher_always_valid() {
        let v = ConstraintValidator::new(&courses());
        let existing = vec![entry(1, "C1", "A", Day::Monday, 540, 600)];
        let out = v.validate_teacher(None, Day::Monday, TimeRange::new(540, 600), &existing, None);
        assert!(out.valid);
        assert!(out.errors.is_empty());
    }

    #[test]
    fn test_teacher_outside_hours() {
        let v = ConstraintValidator::new(&courses());
        let t = monday_9_to_11();
        let ok = v.validate_teacher(Some(&t), Day::Monday, TimeRange::new(540, 600), &[], None);
        assert!(ok.valid);

        let wed = v.validate_teacher(Some(&t), Day::Wednesday, TimeRange::new(540, 600), &[], None);
        assert!(!wed.valid);
        assert!(wed.has(ValidationErrorKind::TeacherUnavailable));

        // Partially outside
        let late = v.validate_teacher(Some(&t), Day::Monday, TimeRange::new(630, 690), &[], None);
        assert!(!late.valid);
    }

    #[test]
    fn test_teacher_double_booking() {
        let v = ConstraintValidator::new(&courses());
        let t = monday_9_to_11();
        let existing = vec![
            entry(1, "C1", "A", Day::Monday, 540, 600),
            entry(2, "C3", "B", Day::Monday, 600, 660),
        ];

        // C1 (same teacher) overlaps 09:30
        let out = v.validate_teacher(Some(&t), Day::Monday, TimeRange::new(570, 630), &existing, None);
        assert!(!out.valid);
        assert!(out.has(ValidationErrorKind::TeacherConflict));
        assert!(!out.has(ValidationErrorKind::TeacherUnavailable));

        // C3 belongs to T2: no conflict at 10:00
        let out = v.validate_teacher(Some(&t), Day::Monday, TimeRange::new(600, 660), &existing, None);
        assert!(out.valid);
    }

    #[test]
    fn test_exclude_id_prevents_self_conflict() {
        let v = ConstraintValidator::new(&courses());
        let t = monday_9_to_11();
        let existing = vec![entry(7, "C1", "A", Day::Monday, 540, 600)];
        let room_record = ClassroomRecord::new("A", 30);
        let room = Classroom::parse(&room_record);
        let range = TimeRange::new(570, 630);

        let out = v.validate_teacher(Some(&t), Day::Monday, range, &existing, Some(7));
        assert!(out.valid);
        let out = v.validate_classroom(Some(&room), Day::Monday, range, &existing, Some(7));
        assert!(out.valid);
        let out = v.validate_course_overlap("C1", Day::Monday, range, &existing, Some(7));
        assert!(out.valid);

        // Without the exclusion all three conflict
        assert!(!v.validate_teacher(Some(&t), Day::Monday, range, &existing, None).valid);
        assert!(!v.validate_classroom(Some(&room), Day::Monday, range, &existing, None).valid);
        assert!(!v.validate_course_overlap("C1", Day::Monday, range, &existing, None).valid);
    }

    #[test]
    fn test_malformed_teacher_hours_degrade() {
        let v = ConstraintValidator::new(&courses());
        let course = CourseRecord::new("C1")
            .with_teacher("T1")
            .with_working_hours(json!("{broken"));
        let t = Teacher::from_course(&course).unwrap();
        let out = v.validate_teacher(Some(&t), Day::Monday, TimeRange::new(540, 600), &[], None);
        assert!(!out.valid);
        assert!(out.errors[0].is_warning());

        // Missing map is also a warning
        let t = Teacher::from_course(&CourseRecord::new("C2").with_teacher("T1")).unwrap();
        let out = v.validate_teacher(Some(&t), Day::Monday, TimeRange::new(540, 600), &[], None);
        assert!(out.has(ValidationErrorKind::MalformedAvailability));

        assert!(Teacher::from_course(&CourseRecord::new("C4")).is_none());
    }

    #[test]
    fn test_classroom_rules() {
        let v = ConstraintValidator::new(&courses());
        let range = TimeRange::new(540, 600);

        let missing = v.validate_classroom(None, Day::Monday, range, &[], None);
        assert!(!missing.valid);
        assert!(missing.has(ValidationErrorKind::ClassroomMissing));

        let open = ClassroomRecord::new("A", 30);
        assert!(v
            .validate_classroom(Some(&Classroom::parse(&open)), Day::Sunday, range, &[], None)
            .valid);

        let limited = ClassroomRecord::new("B", 30).with_available_hours(json!({"monday": ["08:00-10:00"]}));
        let limited = Classroom::parse(&limited);
        assert!(v.validate_classroom(Some(&limited), Day::Monday, range, &[], None).valid);
        let closed = v.validate_classroom(Some(&limited), Day::Tuesday, range, &[], None);
        assert!(closed.has(ValidationErrorKind::ClassroomUnavailable));

        let inactive = ClassroomRecord::new("C", 30).inactive();
        let out = v.validate_classroom(Some(&Classroom::parse(&inactive)), Day::Monday, range, &[], None);
        assert!(out.has(ValidationErrorKind::ClassroomInactive));
    }

    #[test]
    fn test_classroom_conflict_only_same_room() {
        let v = ConstraintValidator::new(&courses());
        let existing = vec![entry(1, "C1", "A", Day::Monday, 540, 600)];
        let a = ClassroomRecord::new("A", 30);
        let b = ClassroomRecord::new("B", 30);
        let range = TimeRange::new(540, 600);

        let out = v.validate_classroom(Some(&Classroom::parse(&a)), Day::Monday, range, &existing, None);
        assert!(out.has(ValidationErrorKind::ClassroomConflict));
        let out = v.validate_classroom(Some(&Classroom::parse(&b)), Day::Monday, range, &existing, None);
        assert!(out.valid);
        // Touching is fine
        let out = v.validate_classroom(
            Some(&Classroom::parse(&a)),
            Day::Monday,
            TimeRange::new(600, 660),
            &existing,
            None,
        );
        assert!(out.valid);
    }

    #[test]
    fn test_room_fit() {
        let validator = ConstraintValidator::new(&courses());
        let course = CourseRecord::new("C1")
            .with_department("CS", 60)
            .with_capacity_margin(25);
        let lecture = ClassroomRecord::new("A", 50);
        let lab = ClassroomRecord::new("L", 50).with_type(crate::models::RoomType::Lab);

        // 50 seats + 25% margin = 62 >= 60
        assert!(validator.validate_room_fit(&course, &lecture, SessionType::Theoretical).valid);
        let wrong_type = validator.validate_room_fit(&course, &lab, SessionType::Theoretical);
        assert!(wrong_type.has(ValidationErrorKind::ClassroomUnsuitable));

        let crowded = course.clone().with_department("EE", 10);
        assert!(!validator.validate_room_fit(&crowded, &lecture, SessionType::Theoretical).valid);
    }

    #[test]
    fn test_valid_input() {
        let courses = vec![CourseRecord::new("C1").with_hardcoded(
            HardcodedPlacement::new(SessionType::Theoretical, Day::Monday, "09:00", "10:00")
                .in_classroom("A"),
        )];
        let rooms = vec![ClassroomRecord::new("A", 30)];
        assert!(validate_input(&courses, &rooms).is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let courses = vec![CourseRecord::new("C1"), CourseRecord::new("C1")];
        let rooms = vec![ClassroomRecord::new("A", 30), ClassroomRecord::new("A", 40)];
        let errors = validate_input(&courses, &rooms).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.kind == ValidationErrorKind::DuplicateId)
                .count(),
            2
        );
        assert!(errors.iter().any(|e| e.message.contains("classroom")));
    }

    #[test]
    fn test_pin_errors() {
        let courses = vec![CourseRecord::new("C1")
            .with_hardcoded(
                HardcodedPlacement::new(SessionType::Lab, Day::Monday, "09:00", "10:00")
                    .in_classroom("NOPE"),
            )
            .with_hardcoded(HardcodedPlacement::new(
                SessionType::Lab,
                Day::Monday,
                "10:00",
                "09:00",
            ))
            .with_hardcoded(HardcodedPlacement::new(SessionType::Lab, Day::Monday, "9am", "10:00"))];
        let errors = validate_input(&courses, &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownClassroom));
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.kind == ValidationErrorKind::InvalidTime)
                .count(),
            2
        );
    }
}
