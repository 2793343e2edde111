//! Per-unit context for placement rule evaluation.

use std::collections::HashMap;

use crate::config::CapacityBounds;
use crate::grid::Day;

/// What the rules need to know about the unit being placed.
#[derive(Debug, Clone, Default)]
pub struct PlacementContext {
    /// Students attending the unit.
    pub students: u32,
    /// Attending departments.
    pub departments: Vec<String>,
    /// Minutes the unit's teacher already teaches, per day.
    pub teacher_day_minutes: HashMap<Day, u32>,
    /// Ideal occupancy band.
    pub capacity_bounds: CapacityBounds,
}

impl PlacementContext {
    /// Creates a context for a unit with `students` attendees.
    pub fn for_students(students: u32) -> Self {
        Self {
            students,
            ..Default::default()
        }
    }

    /// Adds an attending department.
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.departments.push(department.into());
        self
    }

    /// Sets the teacher's load on a day.
    pub fn with_teacher_load(mut self, day: Day, minutes: u32) -> Self {
        self.teacher_day_minutes.insert(day, minutes);
        self
    }

    /// Sets the occupancy band.
    pub fn with_capacity_bounds(mut self, bounds: CapacityBounds) -> Self {
        self.capacity_bounds = bounds;
        self
    }

    /// Teacher minutes on a day (0 when unknown).
    pub fn teacher_load(&self, day: Day) -> u32 {
        self.teacher_day_minutes.get(&day).copied().unwrap_or(0)
    }
}
