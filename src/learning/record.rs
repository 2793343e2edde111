//! Learning record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::models::{session_coverage, ClassroomRecord, CourseRecord, ScheduleEntry, SessionType};

/// Size summary of a scheduling input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputShape {
    /// Active courses.
    pub course_count: usize,
    /// Active classrooms.
    pub classroom_count: usize,
    /// Declared session hours across active courses.
    pub required_hours: u32,
    /// Lab share of `required_hours`.
    pub lab_hours: u32,
    /// Enrolled students across active courses.
    pub student_count: u32,
}

impl InputShape {
    /// Summarizes the active part of an input.
    pub fn of(courses: &[CourseRecord], classrooms: &[ClassroomRecord]) -> Self {
        let active: Vec<&CourseRecord> = courses.iter().filter(|c| c.active).collect();
        Self {
            course_count: active.len(),
            classroom_count: classrooms.iter().filter(|r| r.active).count(),
            required_hours: active.iter().map(|c| c.required_hours()).sum(),
            lab_hours: active
                .iter()
                .flat_map(|c| c.sessions.iter())
                .filter(|s| s.session_type == SessionType::Lab)
                .map(|s| s.hours)
                .sum(),
            student_count: active.iter().map(|c| c.student_count()).sum(),
        }
    }

    /// Whether course and classroom counts of `self` are within
    /// `tolerance` (a fraction, e.g. 0.5) of `current`.
    pub fn is_comparable(&self, current: &InputShape, tolerance: f64) -> bool {
        within(self.course_count, current.course_count, tolerance)
            && within(self.classroom_count, current.classroom_count, tolerance)
    }
}

fn within(value: usize, reference: usize, tolerance: f64) -> bool {
    if reference == 0 {
        return value == 0;
    }
    (value as f64 - reference as f64).abs() <= tolerance * reference as f64
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeMetrics {
    /// Placed fraction of required session hours.
    pub success_rate: f64,
    pub avg_capacity_margin: f64,
    pub max_capacity_waste: u32,
    pub teacher_load_std_dev: f64,
    pub objective: f64,
    pub duration_ms: u64,
    pub scheduled_hours: u32,
    pub required_hours: u32,
}

/// Placed versus required session hours, pins excluded.
///
/// Over-placement of one session type never compensates for a shortfall
/// in another.
pub(crate) fn hour_coverage(courses: &[CourseRecord], schedule: &[ScheduleEntry]) -> (u32, u32) {
    session_coverage(courses, schedule)
        .values()
        .fold((0, 0), |(placed, need), &(p, n)| (placed + p.min(n), need + n))
}

/// One completed run. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRecord {
    /// Configuration the run used.
    pub config: Config,
    pub input: InputShape,
    pub outcome: OutcomeMetrics,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Day, TimeRange};

    #[test]
    fn test_input_shape() {
        let courses = vec![
            CourseRecord::new("C1")
                .with_session(SessionType::Theoretical, 3)
                .with_session(SessionType::Lab, 2)
                .with_department("CS", 30),
            CourseRecord::new("C2")
                .with_session(SessionType::Theoretical, 4)
                .inactive(),
        ];
        let rooms = vec![ClassroomRecord::new("A", 50), ClassroomRecord::new("B", 50).inactive()];
        let shape = InputShape::of(&courses, &rooms);
        assert_eq!(shape.course_count, 1);
        assert_eq!(shape.classroom_count, 1);
        assert_eq!(shape.required_hours, 5);
        assert_eq!(shape.lab_hours, 2);
        assert_eq!(shape.student_count, 30);
    }

    #[test]
    fn test_comparable_within_half() {
        let shape = |courses, rooms| InputShape {
            course_count: courses,
            classroom_count: rooms,
            required_hours: 0,
            lab_hours: 0,
            student_count: 0,
        };
        let current = shape(10, 4);
        assert!(shape(15, 6).is_comparable(&current, 0.5));
        assert!(shape(5, 2).is_comparable(&current, 0.5));
        assert!(!shape(16, 4).is_comparable(&current, 0.5));
        assert!(!shape(10, 7).is_comparable(&current, 0.5));
        assert!(shape(0, 0).is_comparable(&shape(0, 0), 0.5));
    }

    #[test]
    fn test_hour_coverage_ignores_pins_and_caps() {
        let courses = vec![
            CourseRecord::new("C1").with_session(SessionType::Theoretical, 2),
            CourseRecord::new("C2").with_session(SessionType::Lab, 2),
        ];
        let range = TimeRange::new(480, 600);
        let schedule = vec![
            ScheduleEntry::new("C1", Day::Monday, range, SessionType::Theoretical, 2),
            ScheduleEntry::new("C1", Day::Tuesday, range, SessionType::Theoretical, 2),
            ScheduleEntry::new("C2", Day::Monday, range, SessionType::Lab, 2).hardcoded(),
        ];
        assert_eq!(hour_coverage(&courses, &schedule), (2, 4));
    }
}
