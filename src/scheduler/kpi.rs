//! Timetable quality metrics (KPIs) and the search objective.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Avg capacity margin | Mean fraction of seats left empty per session |
//! | Max capacity waste | Most empty seats in any single session |
//! | Teacher load std dev | Spread of teaching hours over (teacher, day) pairs |
//! | Objective | `w_fit · Σ fit − w_load · load variance − w_unsched · unscheduled` |
//!
//! The objective is a pure function of the entries, so local search can
//! compare candidate schedules by value.

use serde::{Deserialize, Serialize};

use super::problem::Problem;
use crate::config::CapacityBounds;
use crate::models::ScheduleEntry;

/// How well `students` fill a room of `capacity` seats, in `[0, 1]`.
///
/// 1.0 inside `[ideal_min, ideal_max]`; below the band the value falls
/// linearly to 0 at an empty room, above it to 0 at a full room.
///
/// # Example
/// ```
/// use u_timetable::config::CapacityBounds;
/// use u_timetable::scheduler::capacity_fit;
///
/// let bounds = CapacityBounds::default();
/// assert_eq!(capacity_fit(40, 50, &bounds), 1.0);
/// assert!(capacity_fit(10, 100, &bounds) < 0.5);
/// ```
pub fn capacity_fit(students: u32, capacity: u32, bounds: &CapacityBounds) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    let ratio = students as f64 / capacity as f64;
    if ratio < bounds.ideal_min {
        ratio / bounds.ideal_min
    } else if ratio <= bounds.ideal_max {
        1.0
    } else {
        let span = 1.0 - bounds.ideal_max;
        if span <= 0.0 {
            0.0
        } else {
            (1.0 - (ratio - bounds.ideal_max) / span).max(0.0)
        }
    }
}

/// Timetable quality indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Mean fraction of seats left empty (negative when rooms overflow).
    pub avg_capacity_margin: f64,
    /// Most empty seats in one session.
    pub max_capacity_waste: u32,
    /// Standard deviation of teaching hours per (teacher, day).
    pub teacher_load_std_dev: f64,
    /// Weighted objective value (higher is better).
    pub objective: f64,
}

impl QualityMetrics {
    /// Computes metrics for a set of entries.
    pub(crate) fn calculate(problem: &Problem, entries: &[ScheduleEntry], unscheduled: usize) -> Self {
        let bounds = &problem.config.capacity;
        let mut fit_sum = 0.0;
        let mut margin_sum = 0.0;
        let mut sized = 0usize;
        let mut max_waste = 0u32;

        for entry in entries {
            let Some(course) = problem.course_idx(&entry.course_id).map(|i| problem.courses[i]) else {
                continue;
            };
            let Some(room) = entry.classroom_id.as_deref().and_then(|id| problem.classroom(id)) else {
                continue;
            };
            let capacity = room.record.effective_capacity(course.capacity_margin);
            let students = course.student_count();
            fit_sum += capacity_fit(students, capacity, bounds);
            if capacity > 0 {
                margin_sum += (capacity as f64 - students as f64) / capacity as f64;
                sized += 1;
            }
            max_waste = max_waste.max(capacity.saturating_sub(students));
        }

        let variance = teacher_load_variance(problem, entries);
        let w = &problem.config.objective;
        let objective =
            w.capacity_fit * fit_sum - w.load_variance * variance - w.unscheduled * unscheduled as f64;

        Self {
            avg_capacity_margin: if sized == 0 {
                0.0
            } else {
                margin_sum / sized as f64
            },
            max_capacity_waste: max_waste,
            teacher_load_std_dev: variance.sqrt(),
            objective,
        }
    }

    /// Objective value only.
    pub(crate) fn objective(problem: &Problem, entries: &[ScheduleEntry], unscheduled: usize) -> f64 {
        Self::calculate(problem, entries, unscheduled).objective
    }

    /// Whether the timetable meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_waste: u32, max_load_std_dev: f64) -> bool {
        self.max_capacity_waste <= max_waste && self.teacher_load_std_dev <= max_load_std_dev
    }
}

/// Population variance of teaching hours over every (teacher, grid day).
fn teacher_load_variance(problem: &Problem, entries: &[ScheduleEntry]) -> f64 {
    let mut teachers: Vec<&str> = problem
        .teachers
        .iter()
        .flatten()
        .map(|t| t.id.as_str())
        .collect();
    teachers.sort_unstable();
    teachers.dedup();

    let days = &problem.grid.days;
    let cells = teachers.len() * days.len();
    if cells == 0 {
        return 0.0;
    }

    let mut loads = vec![0.0f64; cells];
    for entry in entries {
        let Some(teacher) = problem.validator.teacher_of(&entry.course_id) else {
            continue;
        };
        let (Ok(t), Some(d)) = (
            teachers.binary_search(&teacher),
            days.iter().position(|&d| d == entry.day),
        ) else {
            continue;
        };
        loads[t * days.len() + d] += entry.range().duration_min() as f64 / 60.0;
    }

    let mean = loads.iter().sum::<f64>() / cells as f64;
    loads.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / cells as f64
}
