//! Built-in placement rules.
//!
//! # Categories
//!
//! - **Room fit**: CAPACITY_FIT
//! - **Load**: TEACHER_DAY_LOAD
//! - **Preference**: PRIORITY_DEPARTMENT
//!
//! # Score Convention
//! All rules return lower scores for better candidates.

use super::{Candidate, PlacementContext, PlacementRule, RuleScore};
use crate::scheduler::capacity_fit;

/// Prefers rooms whose occupancy falls in the ideal band.
///
/// Score is `1 - fit`, where `fit` is 1.0 inside
/// `[ideal_min, ideal_max]` and decays linearly outside it.
#[derive(Debug, Clone, Copy)]
pub struct CapacityFit;

impl PlacementRule for CapacityFit {
    fn name(&self) -> &'static str {
        "CAPACITY_FIT"
    }

    fn evaluate(&self, candidate: &Candidate, context: &PlacementContext) -> RuleScore {
        1.0 - capacity_fit(context.students, candidate.capacity, &context.capacity_bounds)
    }

    fn description(&self) -> &'static str {
        "Best room occupancy first"
    }
}

/// Prefers days on which the teacher teaches least so far.
///
/// Spreads a teacher's sessions across the week.
#[derive(Debug, Clone, Copy)]
pub struct TeacherDayLoad;

impl PlacementRule for TeacherDayLoad {
    fn name(&self) -> &'static str {
        "TEACHER_DAY_LOAD"
    }

    fn evaluate(&self, candidate: &Candidate, context: &PlacementContext) -> RuleScore {
        context.teacher_load(candidate.day) as f64
    }

    fn description(&self) -> &'static str {
        "Least loaded teacher day first"
    }
}

/// Prefers rooms reserved for one of the attending departments.
///
/// Scores: own department's room 0, unreserved room 1, another
/// department's room 2.
#[derive(Debug, Clone, Copy)]
pub struct PriorityDepartment;

impl PlacementRule for PriorityDepartment {
    fn name(&self) -> &'static str {
        "PRIORITY_DEPARTMENT"
    }

    fn evaluate(&self, candidate: &Candidate, context: &PlacementContext) -> RuleScore {
        match &candidate.priority_department {
            Some(dept) if context.departments.iter().any(|d| d == dept) => 0.0,
            None => 1.0,
            Some(_) => 2.0,
        }
    }

    fn description(&self) -> &'static str {
        "Department's own rooms first"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CapacityBounds;
    use crate::grid::{Day, TimeRange};

    fn room(capacity: u32) -> Candidate {
        Candidate::new(Day::Monday, TimeRange::new(480, 540), "R", capacity)
    }

    #[test]
    fn test_capacity_fit_band() {
        let ctx = PlacementContext::for_students(30);
        // 30/40 = 0.75, inside the default band
        assert_eq!(CapacityFit.evaluate(&room(40), &ctx), 0.0);
        // 30/100 = 0.3 → fit 0.5
        assert!((CapacityFit.evaluate(&room(100), &ctx) - 0.5).abs() < 1e-9);
        // Full room is above ideal_max
        assert!(CapacityFit.evaluate(&room(30), &ctx) > 0.0);
    }

    #[test]
    fn test_capacity_fit_custom_bounds() {
        let ctx = PlacementContext::for_students(30).with_capacity_bounds(CapacityBounds {
            ideal_min: 0.2,
            ideal_max: 0.4,
        });
        assert_eq!(CapacityFit.evaluate(&room(100), &ctx), 0.0);
        assert!(CapacityFit.evaluate(&room(40), &ctx) > 0.0);
    }

    #[test]
    fn test_teacher_day_load() {
        let ctx = PlacementContext::for_students(10).with_teacher_load(Day::Monday, 180);
        assert_eq!(TeacherDayLoad.evaluate(&room(20), &ctx), 180.0);
        let tuesday = Candidate::new(Day::Tuesday, TimeRange::new(480, 540), "R", 20);
        assert_eq!(TeacherDayLoad.evaluate(&tuesday, &ctx), 0.0);
    }

    #[test]
    fn test_priority_department() {
        let ctx = PlacementContext::for_students(10)
            .with_department("CS")
            .with_department("MATH");
        assert_eq!(
            PriorityDepartment.evaluate(&room(20).with_priority_department("MATH"), &ctx),
            0.0
        );
        assert_eq!(PriorityDepartment.evaluate(&room(20), &ctx), 1.0);
        assert_eq!(
            PriorityDepartment.evaluate(&room(20).with_priority_department("LAW"), &ctx),
            2.0
        );
    }

    #[test]
    fn test_rule_names() {
        assert_eq!(CapacityFit.name(), "CAPACITY_FIT");
        assert_eq!(TeacherDayLoad.name(), "TEACHER_DAY_LOAD");
        assert_eq!(PriorityDepartment.name(), "PRIORITY_DEPARTMENT");
        assert_eq!(PriorityDepartment.description(), "Department's own rooms first");
    }
}
