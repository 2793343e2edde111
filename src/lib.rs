//! Weekly academic timetabling engine.
//!
//! Assigns course sessions to (day, time block, classroom) slots so that no
//! teacher, classroom or course is double-booked, teachers teach only within
//! their working hours and rooms are used only while open.
//!
//! # Modules
//!
//! - **`grid`**: Days, `"HH:MM"` times, time ranges and the weekly block grid
//! - **`models`**: Input records (`CourseRecord`, `ClassroomRecord`),
//!   availability calendars and output `ScheduleEntry` rows
//! - **`validation`**: Input integrity and per-slot hard-constraint checks
//! - **`dispatching`**: Rule-based ranking of placement candidates
//! - **`scheduler`**: The `SchedulingEngine`, quality metrics and status queries
//! - **`learning`**: Run history and learned parameter recommendations
//! - **`config`**: Tunable parameters, presets and partial overrides
//! - **`timeout`**: Time budget tracking
//!
//! # Example
//!
//! ```
//! use u_timetable::config::Config;
//! use u_timetable::models::{ClassroomRecord, CourseRecord, RoomType, SessionType};
//! use u_timetable::{ScheduleRequest, SchedulingEngine};
//!
//! let courses = vec![
//!     CourseRecord::new("CS101")
//!         .with_session(SessionType::Theoretical, 2)
//!         .with_session(SessionType::Lab, 2)
//!         .with_department("CS", 40),
//! ];
//! let rooms = vec![
//!     ClassroomRecord::new("HALL", 50),
//!     ClassroomRecord::new("LAB", 45).with_type(RoomType::Lab),
//! ];
//!
//! let request = ScheduleRequest::new(courses, rooms).with_config(Config::fast().with_seed(1));
//! let outcome = SchedulingEngine::new().run(&request).unwrap();
//!
//! assert!(outcome.result.perfect);
//! assert!(outcome
//!     .result
//!     .schedule
//!     .iter()
//!     .filter(|e| e.session_type == SessionType::Lab)
//!     .all(|e| e.classroom_id.as_deref() == Some("LAB")));
//! ```
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"

pub mod config;
pub mod dispatching;
pub mod error;
pub mod grid;
pub mod learning;
pub mod models;
pub mod scheduler;
pub mod timeout;
pub mod validation;

pub use config::Config;
pub use error::ScheduleError;
pub use scheduler::{ScheduleOutcome, ScheduleRequest, ScheduleResult, SchedulingEngine};
