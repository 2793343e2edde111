//! Placement candidate ranking.
//!
//! A session unit usually fits many (day, time window, classroom) slots.
//! Placement rules score each [`Candidate`] and a [`RuleEngine`] orders
//! them, so the greedy pass tries the most promising slot first.
//!
//! # Usage
//!
//! ```
//! use u_timetable::dispatching::{rules, Candidate, PlacementContext, RuleEngine, TieBreaker};
//! use u_timetable::grid::{Day, TimeRange};
//!
//! let engine = RuleEngine::new()
//!     .with_rule(rules::CapacityFit)
//!     .with_rule(rules::TeacherDayLoad)
//!     .with_final_tie_breaker(TieBreaker::BySlot);
//!
//! let candidates = vec![
//!     Candidate::new(Day::Monday, TimeRange::new(480, 600), "BIG", 200),
//!     Candidate::new(Day::Monday, TimeRange::new(480, 600), "FIT", 50),
//! ];
//! let context = PlacementContext::for_students(40);
//! let order = engine.sort_indices(&candidates, &context);
//! assert_eq!(candidates[order[0]].classroom_id, "FIT");
//! ```
//!
//! # References
//!
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"
//! - Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

mod context;
mod engine;
pub mod rules;

pub use context::PlacementContext;
pub use engine::{RuleEngine, TieBreaker};

use std::fmt::Debug;

use crate::grid::{Day, TimeRange};

/// Score returned by a placement rule.
///
/// Lower scores = preferred (tried first).
pub type RuleScore = f64;

/// One slot a session unit could occupy.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Day of the week.
    pub day: Day,
    /// Span of consecutive blocks.
    pub range: TimeRange,
    /// Classroom id.
    pub classroom_id: String,
    /// Seats after the course's capacity margin is applied.
    pub capacity: u32,
    /// Department the room prefers.
    pub priority_department: Option<String>,
}

impl Candidate {
    /// Creates a candidate in a room with no department preference.
    pub fn new(day: Day, range: TimeRange, classroom_id: impl Into<String>, capacity: u32) -> Self {
        Self {
            day,
            range,
            classroom_id: classroom_id.into(),
            capacity,
            priority_department: None,
        }
    }

    /// Sets the room's priority department.
    pub fn with_priority_department(mut self, department: impl Into<String>) -> Self {
        self.priority_department = Some(department.into());
        self
    }
}

/// A rule that scores how good a candidate slot is for the unit in context.
///
/// # Score Convention
/// **Lower score = better slot.**
pub trait PlacementRule: Send + Sync + Debug {
    /// Rule name (e.g., "CAPACITY_FIT").
    fn name(&self) -> &'static str;

    /// Scores a candidate. Lower is better.
    fn evaluate(&self, candidate: &Candidate, context: &PlacementContext) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
