//! Timetable construction and quality evaluation.
//!
//! # Algorithm
//!
//! [`SchedulingEngine`] splits each course's weekly hours into session
//! units, places them greedily in descending difficulty using the
//! [`RuleEngine`](crate::dispatching::RuleEngine) to rank candidate slots,
//! then improves the result with hill climbing or simulated annealing over
//! relocate, swap and insert moves. Hard constraints are never violated;
//! units that cannot be placed are reported with a reason.
//!
//! # KPI
//!
//! [`QualityMetrics`] measures capacity fit, seat waste and teacher load
//! balance. [`schedule_status`] summarizes completion of a saved schedule.
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"
//! - Kirkpatrick et al. (1983), "Optimization by Simulated Annealing"

mod engine;
mod kpi;
mod placement;
mod problem;
mod search;
mod status;

pub use engine::{
    ScheduleOutcome, SchedulePhase, ScheduleRequest, ScheduleResult, SchedulingEngine,
};
pub use kpi::{capacity_fit, QualityMetrics};
pub use status::{schedule_status, ScheduleStatus};
