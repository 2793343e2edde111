//! Completion status for progress reporting.

use serde::{Deserialize, Serialize};

use crate::models::{session_coverage, CourseRecord, ScheduleEntry};

/// How much of the declared teaching load a schedule covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStatus {
    pub total_active_courses: usize,
    /// Session requirements (course × session type) of active courses.
    pub total_active_sessions: usize,
    /// Requirements whose hours are fully placed.
    pub scheduled_sessions: usize,
    /// `scheduled / total · 100`; 100 when nothing is required.
    pub completion_percentage: f64,
}

/// Summarizes a schedule against the courses it was built for.
///
/// Pinned entries do not count toward declared hours.
///
/// # Example
/// ```
/// use u_timetable::grid::{Day, TimeRange};
/// use u_timetable::models::{CourseRecord, ScheduleEntry, SessionType};
/// use u_timetable::scheduler::schedule_status;
///
/// let courses = vec![
///     CourseRecord::new("C1").with_session(SessionType::Theoretical, 2),
///     CourseRecord::new("C2").with_session(SessionType::Theoretical, 2),
/// ];
/// let entries = vec![ScheduleEntry::new(
///     "C1", Day::Monday, TimeRange::new(480, 600), SessionType::Theoretical, 2,
/// )];
/// let status = schedule_status(&courses, &entries);
/// assert_eq!(status.scheduled_sessions, 1);
/// assert_eq!(status.completion_percentage, 50.0);
/// ```
pub fn schedule_status(courses: &[CourseRecord], entries: &[ScheduleEntry]) -> ScheduleStatus {
    let coverage = session_coverage(courses, entries);
    let total = coverage.len();
    let scheduled = coverage.values().filter(|(placed, need)| placed >= need).count();

    ScheduleStatus {
        total_active_courses: courses.iter().filter(|c| c.active).count(),
        total_active_sessions: total,
        scheduled_sessions: scheduled,
        completion_percentage: if total == 0 {
            100.0
        } else {
            scheduled as f64 / total as f64 * 100.0
        },
    }
}
