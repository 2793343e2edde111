//! Course model.
//!
//! A course is the unit the timetable is built for: it declares weekly
//! teaching hours per session type, who teaches it, which departments
//! attend it, and any slots an administrator has pinned by hand.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::grid::{Day, TimeParseError, TimeRange};

/// Kind of teaching session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    /// Lecture.
    Theoretical,
    /// Laboratory practice.
    Lab,
    /// Mixed lecture and practice.
    Combined,
}

impl SessionType {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Theoretical => "theoretical",
            SessionType::Lab => "lab",
            SessionType::Combined => "combined",
        }
    }
}

/// Weekly hour requirement for one session type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session type.
    pub session_type: SessionType,
    /// Required hours per week.
    pub hours: u32,
}

/// Students a department sends to a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentShare {
    /// Department name.
    pub department: String,
    /// Enrolled students from this department.
    pub student_count: u32,
}

/// An administrator-pinned slot. Copied into the schedule verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardcodedPlacement {
    /// Session type taught in the slot.
    pub session_type: SessionType,
    /// Day of the week.
    pub day: Day,
    /// Start time, `"HH:MM"`.
    pub start: String,
    /// End time, `"HH:MM"`.
    pub end: String,
    /// Classroom, if the pin names one.
    #[serde(default)]
    pub classroom_id: Option<String>,
}

impl HardcodedPlacement {
    /// Creates a pin.
    pub fn new(
        session_type: SessionType,
        day: Day,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            session_type,
            day,
            start: start.into(),
            end: end.into(),
            classroom_id: None,
        }
    }

    /// Pins the classroom as well.
    pub fn in_classroom(mut self, classroom_id: impl Into<String>) -> Self {
        self.classroom_id = Some(classroom_id.into());
        self
    }

    /// Parsed time range.
    pub fn range(&self) -> Result<TimeRange, TimeParseError> {
        TimeRange::parse(&self.start, &self.end)
    }
}

fn default_active() -> bool {
    true
}

/// A course as supplied by the data layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Unique course identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Teacher identifier. `None` = no teacher constraint.
    #[serde(default)]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub faculty: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub semester: String,
    /// Declared total weekly hours.
    #[serde(default)]
    pub total_hours: u32,
    /// Allowed over-enrollment of a room, in percent of its capacity.
    #[serde(default)]
    pub capacity_margin: u32,
    /// Hour requirements per session type.
    #[serde(default)]
    pub sessions: Vec<Session>,
    /// Attending departments.
    #[serde(default)]
    pub departments: Vec<DepartmentShare>,
    /// Teacher working hours (raw JSON, possibly serialized text).
    #[serde(default)]
    pub teacher_working_hours: Option<Value>,
    /// Pinned slots.
    #[serde(default)]
    pub hardcoded: Vec<HardcodedPlacement>,
    /// Inactive courses are ignored.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl CourseRecord {
    /// Creates an active course with no sessions.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            teacher_id: None,
            faculty: String::new(),
            level: String::new(),
            category: String::new(),
            semester: String::new(),
            total_hours: 0,
            capacity_margin: 0,
            sessions: Vec::new(),
            departments: Vec::new(),
            teacher_working_hours: None,
            hardcoded: Vec::new(),
            active: true,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the teacher.
    pub fn with_teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.teacher_id = Some(teacher_id.into());
        self
    }

    /// Adds a session requirement and counts it toward `total_hours`.
    pub fn with_session(mut self, session_type: SessionType, hours: u32) -> Self {
        self.sessions.push(Session {
            session_type,
            hours,
        });
        self.total_hours += hours;
        self
    }

    /// Adds an attending department.
    pub fn with_department(mut self, department: impl Into<String>, student_count: u32) -> Self {
        self.departments.push(DepartmentShare {
            department: department.into(),
            student_count,
        });
        self
    }

    /// Sets the capacity margin (percent).
    pub fn with_capacity_margin(mut self, percent: u32) -> Self {
        self.capacity_margin = percent;
        self
    }

    /// Sets the teacher's working hours.
    pub fn with_working_hours(mut self, hours: Value) -> Self {
        self.teacher_working_hours = Some(hours);
        self
    }

    /// Adds a pinned slot.
    pub fn with_hardcoded(mut self, placement: HardcodedPlacement) -> Self {
        self.hardcoded.push(placement);
        self
    }

    /// Marks the course inactive.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Total enrolled students across departments.
    pub fn student_count(&self) -> u32 {
        self.departments.iter().map(|d| d.student_count).sum()
    }

    /// Sum of session hours.
    pub fn required_hours(&self) -> u32 {
        self.sessions.iter().map(|s| s.hours).sum()
    }

    /// Department sending the most students, if any.
    pub fn main_department(&self) -> Option<&str> {
        self.departments
            .iter()
            .max_by_key(|d| d.student_count)
            .map(|d| d.department.as_str())
    }

    /// Whether a department attends this course.
    pub fn has_department(&self, department: &str) -> bool {
        self.departments.iter().any(|d| d.department == department)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_builder() {
        let course = CourseRecord::new("C1")
            .with_teacher("T1")
            .with_session(SessionType::Theoretical, 3)
            .with_session(SessionType::Lab, 2)
            .with_department("CS", 40)
            .with_department("EE", 15);

        assert_eq!(course.teacher_id.as_deref(), Some("T1"));
        assert_eq!(course.required_hours(), 5);
        assert_eq!(course.total_hours, 5);
        assert_eq!(course.student_count(), 55);
        assert_eq!(course.main_department(), Some("CS"));
        assert!(course.has_department("EE"));
        assert!(course.active);
    }

    #[test]
    fn test_course_deserialize_defaults() {
        let course: CourseRecord = serde_json::from_str(
            r#"{
                "id": "C9",
                "sessions": [{"session_type": "lab", "hours": 2}],
                "hardcoded": [{"session_type": "lab", "day": "monday",
                               "start": "09:00", "end": "10:00"}]
            }"#,
        )
        .unwrap();
        assert!(course.active);
        assert!(course.teacher_id.is_none());
        assert_eq!(course.sessions[0].session_type, SessionType::Lab);
        assert_eq!(course.hardcoded[0].range().unwrap(), TimeRange::new(540, 600));
        assert!(course.hardcoded[0].classroom_id.is_none());
    }
}
