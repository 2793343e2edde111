//! Timetabling domain models.
//!
//! Input records ([`CourseRecord`], [`ClassroomRecord`]) are supplied by an
//! external data layer and treated as read-only. Output rows are
//! [`ScheduleEntry`] values collected in a [`Schedule`].
//!
//! # Domain Mappings
//!
//! | u-timetable | University | School | Training center |
//! |-------------|-----------|--------|-----------------|
//! | CourseRecord | Course | Subject class | Workshop |
//! | Session | Lecture / lab hours | Period block | Module |
//! | ClassroomRecord | Lecture hall / lab | Classroom | Training room |
//! | ScheduleEntry | Timetable slot | Period | Booking |

mod calendar;
mod classroom;
mod course;
mod schedule;

pub use calendar::{Availability, AvailabilityWarning, WeeklyAvailability};
pub use classroom::{ClassroomRecord, RoomType};
pub use course::{CourseRecord, DepartmentShare, HardcodedPlacement, Session, SessionType};
pub use schedule::{
    session_coverage, EntryId, Schedule, ScheduleEntry, UnscheduledReason, UnscheduledUnit,
};
