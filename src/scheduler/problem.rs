//! Prepared scheduling input.
//!
//! Everything derived once per run: active courses with their parsed
//! teachers, active classrooms with parsed opening hours, the session units
//! to place, and each unit group's statically feasible candidate slots.

use std::collections::{HashMap, HashSet};

use crate::config::Config;
use crate::dispatching::{Candidate, PlacementContext};
use crate::grid::{Day, TimeGrid, TimeRange};
use crate::models::{
    ClassroomRecord, CourseRecord, EntryId, ScheduleEntry, SessionType, UnscheduledReason,
};
use crate::validation::{
    Classroom, ConstraintValidator, Teacher, ValidationError, ValidationErrorKind,
    ValidationOutcome,
};

/// One placeable piece of a course's weekly session hours.
#[derive(Debug, Clone)]
pub(crate) struct SessionUnit {
    /// Index into [`Problem::courses`].
    pub course: usize,
    pub session_type: SessionType,
    pub hours: u32,
    /// Consecutive grid blocks the unit occupies.
    pub blocks: usize,
    /// Units sharing course, type and length share candidates.
    pub group: usize,
    pub difficulty: f64,
}

/// Why a unit group has no static candidates.
#[derive(Debug, Clone)]
pub(crate) struct Infeasible {
    pub reason: UnscheduledReason,
    pub detail: String,
}

pub(crate) struct Problem<'a> {
    pub courses: Vec<&'a CourseRecord>,
    pub teachers: Vec<Option<Teacher>>,
    pub classrooms: Vec<Classroom<'a>>,
    pub validator: ConstraintValidator,
    pub config: &'a Config,
    pub grid: &'a TimeGrid,
    pub units: Vec<SessionUnit>,
    /// Static candidates per unit group, or why there are none.
    pub groups: Vec<Result<Vec<Candidate>, Infeasible>>,
    pub warnings: Vec<ValidationError>,
    course_index: HashMap<&'a str, usize>,
    classroom_index: HashMap<&'a str, usize>,
}

impl<'a> Problem<'a> {
    pub fn new(
        courses: &'a [CourseRecord],
        classrooms: &'a [ClassroomRecord],
        grid: &'a TimeGrid,
        config: &'a Config,
    ) -> Self {
        let active: Vec<&CourseRecord> = courses.iter().filter(|c| c.active).collect();
        let course_index = active
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.as_str(), i))
            .collect();

        let mut warnings = Vec::new();
        let mut warned_teachers = HashSet::new();
        let teachers: Vec<Option<Teacher>> = active
            .iter()
            .map(|c| {
                let teacher = Teacher::from_course(c)?;
                if let Some(w) = teacher.availability.warning() {
                    if warned_teachers.insert(teacher.id.clone()) {
                        warnings.push(ValidationError::new(
                            ValidationErrorKind::MalformedAvailability,
                            format!("Teacher '{}' (course '{}'): {w}", teacher.id, c.id),
                        ));
                    }
                }
                Some(teacher)
            })
            .collect();

        let rooms: Vec<Classroom> = classrooms
            .iter()
            .filter(|r| r.active)
            .map(Classroom::parse)
            .collect();
        for room in &rooms {
            if let Some(w) = room.availability.warning() {
                warnings.push(ValidationError::new(
                    ValidationErrorKind::MalformedAvailability,
                    format!("Classroom '{}': {w}", room.id()),
                ));
            }
        }
        let classroom_index = classrooms
            .iter()
            .filter(|r| r.active)
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();

        let mut problem = Self {
            courses: active,
            teachers,
            classrooms: rooms,
            validator: ConstraintValidator::new(courses),
            config,
            grid,
            units: Vec::new(),
            groups: Vec::new(),
            warnings,
            course_index,
            classroom_index,
        };
        problem.expand_units();
        problem
    }

    pub fn course_idx(&self, course_id: &str) -> Option<usize> {
        self.course_index.get(course_id).copied()
    }

    pub fn classroom(&self, classroom_id: &str) -> Option<&Classroom<'a>> {
        self.classroom_index
            .get(classroom_id)
            .map(|&i| &self.classrooms[i])
    }

    /// Splits every session into units of at most `max_unit_hours`.
    fn expand_units(&mut self) {
        let max_hours = self.config.placement.max_unit_hours.max(1);
        let mut group_keys: HashMap<(usize, SessionType, usize), usize> = HashMap::new();

        for course in 0..self.courses.len() {
            let record = self.courses[course];
            for session in &record.sessions {
                let mut remaining = session.hours;
                while remaining > 0 {
                    let hours = remaining.min(max_hours);
                    remaining -= hours;
                    let blocks = self.grid.blocks_for_hours(hours);
                    let key = (course, session.session_type, blocks);
                    let group = match group_keys.get(&key) {
                        Some(&g) => g,
                        None => {
                            let g = self.groups.len();
                            let candidates = self.static_candidates(course, session.session_type, blocks);
                            self.groups.push(candidates);
                            group_keys.insert(key, g);
                            g
                        }
                    };
                    self.units.push(SessionUnit {
                        course,
                        session_type: session.session_type,
                        hours,
                        blocks,
                        group,
                        difficulty: 0.0,
                    });
                }
            }
        }

        for i in 0..self.units.len() {
            let difficulty = self.difficulty(&self.units[i]);
            self.units[i].difficulty = difficulty;
        }
    }

    /// Weighted difficulty; higher is placed earlier.
    fn difficulty(&self, unit: &SessionUnit) -> f64 {
        let w = &self.config.difficulty;
        let course = self.courses[unit.course];
        let lab = if unit.session_type == SessionType::Lab {
            1.0
        } else {
            0.0
        };
        let scarcity = match &self.teachers[unit.course] {
            None => 0.0,
            Some(teacher) => {
                let week = self.grid.weekly_capacity() as f64 * self.grid.slot_duration_min as f64;
                match teacher.availability.weekly_minutes() {
                    None => 0.0,
                    Some(_) if week <= 0.0 => 0.0,
                    Some(free) => 1.0 - (free as f64 / week).min(1.0),
                }
            }
        };
        w.student_count * course.student_count() as f64 / 10.0
            + w.session_hours * unit.hours as f64
            + w.lab_session * lab
            + w.teacher_scarcity * scarcity
    }

    /// Whether a room can host a unit of this course and type at all.
    pub fn room_fits(&self, course: usize, session_type: SessionType, room: &Classroom) -> bool {
        let record = self.courses[course];
        room.record.room_type.accepts(session_type)
            && room.record.effective_capacity(record.capacity_margin) >= record.student_count()
    }

    /// Slots passing type, capacity and availability, before conflicts.
    fn static_candidates(
        &self,
        course: usize,
        session_type: SessionType,
        blocks: usize,
    ) -> Result<Vec<Candidate>, Infeasible> {
        let record = self.courses[course];
        let students = record.student_count();

        let typed: Vec<&Classroom> = self
            .classrooms
            .iter()
            .filter(|r| r.record.room_type.accepts(session_type))
            .collect();
        if typed.is_empty() {
            return Err(Infeasible {
                reason: UnscheduledReason::NoClassroom,
                detail: format!("no active classroom can host {} sessions", session_type.as_str()),
            });
        }

        let sized: Vec<&Classroom> = typed
            .iter()
            .copied()
            .filter(|r| r.record.effective_capacity(record.capacity_margin) >= students)
            .collect();
        if sized.is_empty() {
            let largest = typed
                .iter()
                .map(|r| r.record.effective_capacity(record.capacity_margin))
                .max()
                .unwrap_or(0);
            return Err(Infeasible {
                reason: UnscheduledReason::Capacity,
                detail: format!("{students} students exceed the largest suitable room ({largest} seats)"),
            });
        }

        let windows = self.grid.windows_for(blocks);
        let teacher = self.teachers[course].as_ref();
        let teacher_slots: Vec<(Day, TimeRange)> = self
            .grid
            .days
            .iter()
            .flat_map(|&day| windows.iter().map(move |&w| (day, w)))
            .filter(|&(day, w)| teacher.is_none_or(|t| t.availability.allows(day, w)))
            .collect();
        if teacher_slots.is_empty() {
            let detail = match teacher {
                Some(t) => match t.availability.warning() {
                    Some(w) => format!("teacher '{}' working hours unusable: {w}", t.id),
                    None => format!("teacher '{}' has no free {blocks}-block window", t.id),
                },
                None => format!("the grid has no {blocks}-block window"),
            };
            return Err(Infeasible {
                reason: UnscheduledReason::NoTeacherSlot,
                detail,
            });
        }

        let mut candidates = Vec::new();
        for &(day, range) in &teacher_slots {
            for room in &sized {
                if !room.availability.allows(day, range) {
                    continue;
                }
                let mut candidate = Candidate::new(
                    day,
                    range,
                    room.id(),
                    room.record.effective_capacity(record.capacity_margin),
                );
                candidate.priority_department = room.record.priority_department.clone();
                candidates.push(candidate);
            }
        }
        if candidates.is_empty() {
            return Err(Infeasible {
                reason: UnscheduledReason::NoClassroom,
                detail: "no suitable classroom is open while the teacher is available".into(),
            });
        }
        Ok(candidates)
    }

    /// Full hard-constraint check of one course session at a position.
    pub fn check(
        &self,
        course: usize,
        classroom_id: Option<&str>,
        day: Day,
        range: TimeRange,
        existing: &[ScheduleEntry],
        exclude_id: Option<EntryId>,
    ) -> ValidationOutcome {
        let course_id = &self.courses[course].id;
        let mut outcome = self.validator.validate_teacher(
            self.teachers[course].as_ref(),
            day,
            range,
            existing,
            exclude_id,
        );
        outcome.merge(self.validator.validate_classroom(
            classroom_id.and_then(|id| self.classroom(id)),
            day,
            range,
            existing,
            exclude_id,
        ));
        outcome.merge(
            self.validator
                .validate_course_overlap(course_id, day, range, existing, exclude_id),
        );
        outcome
    }

    /// Ranking context for a unit given the entries placed so far.
    pub fn context(&self, unit: &SessionUnit, existing: &[ScheduleEntry]) -> PlacementContext {
        let course = self.courses[unit.course];
        let mut context = PlacementContext::for_students(course.student_count())
            .with_capacity_bounds(self.config.capacity.clone());
        context.departments = course.departments.iter().map(|d| d.department.clone()).collect();
        if let Some(teacher) = &self.teachers[unit.course] {
            context.teacher_day_minutes = self.teacher_day_minutes(&teacher.id, existing);
        }
        context
    }

    /// Minutes a teacher teaches per day.
    pub fn teacher_day_minutes(&self, teacher_id: &str, existing: &[ScheduleEntry]) -> HashMap<Day, u32> {
        let mut load = HashMap::new();
        for entry in existing {
            if self.validator.teacher_of(&entry.course_id) == Some(teacher_id) {
                *load.entry(entry.day).or_insert(0) += entry.range().duration_min();
            }
        }
        load
    }

    /// Builds the entry for a unit at a candidate slot.
    pub fn entry_for(&self, unit: &SessionUnit, candidate: &Candidate) -> ScheduleEntry {
        ScheduleEntry::new(
            self.courses[unit.course].id.clone(),
            candidate.day,
            candidate.range,
            unit.session_type,
            unit.hours,
        )
        .in_classroom(candidate.classroom_id.clone())
    }
}
