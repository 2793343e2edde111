//! Greedy placement of session units.
//!
//! # Algorithm
//!
//! 1. Order units by difficulty, hardest first.
//! 2. For each unit, rank its static candidates with the rule engine.
//! 3. Accept the first candidate passing teacher, classroom and course
//!    checks, up to `max_placement_attempts` tries.
//! 4. On exhaustion, optionally lift one blocking entry, place the unit in
//!    its slot and re-place the lifted entry elsewhere.
//! 5. Units that still do not fit are recorded with a reason.
//!
//! # Complexity
//! O(u · a · e) where u=units, a=attempts per unit, e=placed entries.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::problem::Problem;
use crate::dispatching::{Candidate, RuleEngine};
use crate::models::{EntryId, Schedule, ScheduleEntry, UnscheduledReason};
use crate::timeout::TimeoutManager;
use crate::validation::ValidationErrorKind;

/// A unit that could not be placed.
#[derive(Debug, Clone)]
pub(crate) struct Unplaced {
    pub unit: usize,
    pub reason: UnscheduledReason,
    pub detail: String,
}

/// Schedule under construction plus unit bookkeeping.
#[derive(Debug, Clone, Default)]
pub(crate) struct WorkingSchedule {
    pub schedule: Schedule,
    /// Unit behind each engine-placed entry. Pins have none.
    pub unit_of: HashMap<EntryId, usize>,
    pub unscheduled: Vec<Unplaced>,
}

impl WorkingSchedule {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            unit_of: HashMap::new(),
            unscheduled: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.schedule.entries
    }

    pub fn add(&mut self, unit: usize, entry: ScheduleEntry) -> EntryId {
        let id = self.schedule.insert(entry);
        self.unit_of.insert(id, unit);
        id
    }

    pub fn lift(&mut self, id: EntryId) -> Option<(usize, ScheduleEntry)> {
        let unit = self.unit_of.remove(&id)?;
        let entry = self.schedule.remove(id)?;
        Some((unit, entry))
    }
}

/// Outcome of a first-fit pass over a unit's candidates.
#[derive(Debug, Default)]
struct Attempts {
    tried: usize,
    room_blocked: usize,
    timed_out: bool,
}

pub(crate) struct Placer<'p, 'a> {
    problem: &'p Problem<'a>,
    ranker: &'p RuleEngine,
    timeout: &'p TimeoutManager,
}

impl<'p, 'a> Placer<'p, 'a> {
    pub fn new(problem: &'p Problem<'a>, ranker: &'p RuleEngine, timeout: &'p TimeoutManager) -> Self {
        Self {
            problem,
            ranker,
            timeout,
        }
    }

    /// Unit indices, hardest first. Ties keep input order.
    pub fn order(&self) -> Vec<usize> {
        let units = &self.problem.units;
        let mut order: Vec<usize> = (0..units.len()).collect();
        order.sort_by(|&a, &b| {
            units[b]
                .difficulty
                .partial_cmp(&units[a].difficulty)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order
    }

    /// Places every unit. Returns `true` if the time budget ran out.
    pub fn place_all(&self, state: &mut WorkingSchedule) -> bool {
        let order = self.order();
        for (pos, &u) in order.iter().enumerate() {
            if self.timeout.is_timed_out() {
                for &rest in &order[pos..] {
                    state.unscheduled.push(Unplaced {
                        unit: rest,
                        reason: UnscheduledReason::Timeout,
                        detail: "time budget exhausted before placement".into(),
                    });
                }
                return true;
            }

            if let Err(unplaced) = self.place_unit(u, state) {
                let course = &self.problem.courses[self.problem.units[u].course].id;
                warn!(
                    event = "unit_unscheduled",
                    course = %course,
                    reason = unplaced.reason.as_str(),
                    detail = %unplaced.detail,
                );
                let timed_out = unplaced.reason == UnscheduledReason::Timeout;
                state.unscheduled.push(unplaced);
                if timed_out {
                    for &rest in &order[pos + 1..] {
                        state.unscheduled.push(Unplaced {
                            unit: rest,
                            reason: UnscheduledReason::Timeout,
                            detail: "time budget exhausted before placement".into(),
                        });
                    }
                    return true;
                }
            }
        }
        false
    }

    fn place_unit(&self, u: usize, state: &mut WorkingSchedule) -> Result<EntryId, Unplaced> {
        let unit = &self.problem.units[u];
        let fail = |reason, detail| Unplaced {
            unit: u,
            reason,
            detail,
        };

        if let Err(infeasible) = &self.problem.groups[unit.group] {
            return Err(fail(infeasible.reason, infeasible.detail.clone()));
        }

        let attempts = match self.first_fit(u, state) {
            Ok(id) => return Ok(id),
            Err(attempts) => attempts,
        };
        if attempts.timed_out {
            return Err(fail(
                UnscheduledReason::Timeout,
                format!("time budget exhausted after {} attempts", attempts.tried),
            ));
        }

        if self.problem.config.features.backtracking {
            if let Some(id) = self.backtrack(u, state) {
                return Ok(id);
            }
        }

        let reason = self.failure_reason(&attempts);
        let detail = match reason {
            UnscheduledReason::Timeout => "time budget exhausted while backtracking".to_string(),
            _ => format!("all {} ranked slots tried were already taken", attempts.tried),
        };
        Err(fail(reason, detail))
    }

    /// Reason for a unit whose ranked slots were all rejected.
    fn failure_reason(&self, attempts: &Attempts) -> UnscheduledReason {
        if attempts.timed_out || self.timeout.is_timed_out() {
            UnscheduledReason::Timeout
        } else if attempts.room_blocked > 0 {
            UnscheduledReason::NoClassroom
        } else {
            UnscheduledReason::NoTeacherSlot
        }
    }

    fn ranked(&self, u: usize, state: &WorkingSchedule) -> Vec<&'p Candidate> {
        let problem: &'p Problem<'a> = self.problem;
        let unit = &problem.units[u];
        let Ok(candidates) = &problem.groups[unit.group] else {
            return Vec::new();
        };
        let context = problem.context(unit, state.entries());
        self.ranker
            .sort_indices(candidates, &context)
            .into_iter()
            .take(problem.config.performance.max_placement_attempts)
            .map(|i| &candidates[i])
            .collect()
    }

    /// Tries ranked candidates in order and takes the first valid one.
    fn first_fit(&self, u: usize, state: &mut WorkingSchedule) -> Result<EntryId, Attempts> {
        let unit = &self.problem.units[u];
        let mut attempts = Attempts::default();

        for candidate in self.ranked(u, state) {
            if self.timeout.is_timed_out() {
                attempts.timed_out = true;
                return Err(attempts);
            }
            attempts.tried += 1;

            let outcome = self.problem.check(
                unit.course,
                Some(&candidate.classroom_id),
                candidate.day,
                candidate.range,
                state.entries(),
                None,
            );
            if outcome.valid {
                let id = state.add(u, self.problem.entry_for(unit, candidate));
                debug!(
                    event = "unit_placed",
                    course = %self.problem.courses[unit.course].id,
                    day = %candidate.day,
                    range = %candidate.range,
                    classroom = %candidate.classroom_id,
                    attempts = attempts.tried,
                );
                return Ok(id);
            }
            if outcome.has(ValidationErrorKind::ClassroomConflict)
                && !outcome.has(ValidationErrorKind::TeacherConflict)
                && !outcome.has(ValidationErrorKind::CourseConflict)
            {
                attempts.room_blocked += 1;
            }
        }
        Err(attempts)
    }

    /// Entries that make `candidate` unusable for a course.
    fn blockers(&self, course: usize, candidate: &Candidate, entries: &[ScheduleEntry]) -> Vec<EntryId> {
        let course_id = &self.problem.courses[course].id;
        let teacher = self.problem.validator.teacher_of(course_id);
        entries
            .iter()
            .filter(|e| e.day == candidate.day && e.range().overlaps(&candidate.range))
            .filter(|e| {
                e.uses_classroom(&candidate.classroom_id)
                    || &e.course_id == course_id
                    || (teacher.is_some() && self.problem.validator.teacher_of(&e.course_id) == teacher)
            })
            .map(|e| e.id)
            .collect()
    }

    /// Frees a slot by moving one blocking entry elsewhere.
    fn backtrack(&self, u: usize, state: &mut WorkingSchedule) -> Option<EntryId> {
        let unit = &self.problem.units[u];

        for candidate in self.ranked(u, state) {
            if self.timeout.is_timed_out() {
                return None;
            }
            let blockers = self.blockers(unit.course, candidate, state.entries());
            let &[blocker] = blockers.as_slice() else {
                continue;
            };
            if !state.unit_of.contains_key(&blocker) {
                continue;
            }

            let (lifted_unit, lifted) = state.lift(blocker)?;
            let outcome = self.problem.check(
                unit.course,
                Some(&candidate.classroom_id),
                candidate.day,
                candidate.range,
                state.entries(),
                None,
            );
            if outcome.valid {
                let id = state.add(u, self.problem.entry_for(unit, candidate));
                if self.first_fit(lifted_unit, state).is_ok() {
                    debug!(
                        event = "backtrack",
                        course = %self.problem.courses[unit.course].id,
                        displaced = %lifted.course_id,
                    );
                    return Some(id);
                }
                state.lift(id);
            }
            state.add(lifted_unit, lifted);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::grid::{Day, TimeGrid};
    use crate::models::{ClassroomRecord, CourseRecord, SessionType};
    use serde_json::json;

    fn one_day_grid() -> TimeGrid {
        TimeGrid {
            days: vec![Day::Monday],
            ..TimeGrid::default()
        }
    }

    fn run(courses: &[CourseRecord], rooms: &[ClassroomRecord], grid: &TimeGrid, config: &Config) -> WorkingSchedule {
        let problem = Problem::new(courses, rooms, grid, config);
        let ranker = RuleEngine::timetabling();
        let timeout = TimeoutManager::millis(60_000);
        let mut state = WorkingSchedule::new(Schedule::new());
        Placer::new(&problem, &ranker, &timeout).place_all(&mut state);
        state
    }

    #[test]
    fn test_places_all_units_without_conflicts() {
        let courses = vec![
            CourseRecord::new("C1")
                .with_session(SessionType::Theoretical, 4)
                .with_department("CS", 40),
            CourseRecord::new("C2")
                .with_session(SessionType::Theoretical, 4)
                .with_department("EE", 40),
        ];
        let rooms = vec![ClassroomRecord::new("A", 80)];
        let state = run(&courses, &rooms, &TimeGrid::default(), &Config::default());

        assert!(state.unscheduled.is_empty());
        assert_eq!(state.schedule.len(), 4);
        assert!(state.schedule.classroom_conflicts().is_empty());
        assert_eq!(state.unit_of.len(), 4);
        let hours = state.schedule.placed_hours();
        assert_eq!(hours[&("C1".to_string(), SessionType::Theoretical)], 4);
    }

    #[test]
    fn test_same_course_units_never_overlap() {
        let courses = vec![CourseRecord::new("C1").with_session(SessionType::Theoretical, 6)];
        let rooms = vec![ClassroomRecord::new("A", 50), ClassroomRecord::new("B", 50)];
        let state = run(&courses, &rooms, &one_day_grid(), &Config::default());

        let entries = state.entries();
        assert_eq!(entries.len(), 3);
        for (i, a) in entries.iter().enumerate() {
            for b in &entries[i + 1..] {
                assert!(!a.overlaps(b));
            }
        }
    }

    #[test]
    fn test_teacher_double_booking_avoided() {
        let hours = json!({"monday": ["08:00-12:00"]});
        let courses = vec![
            CourseRecord::new("C1")
                .with_teacher("T1")
                .with_working_hours(hours.clone())
                .with_session(SessionType::Theoretical, 2),
            CourseRecord::new("C2")
                .with_teacher("T1")
                .with_working_hours(hours.clone())
                .with_session(SessionType::Theoretical, 2),
            CourseRecord::new("C3")
                .with_teacher("T1")
                .with_working_hours(hours)
                .with_session(SessionType::Theoretical, 2),
        ];
        let rooms = vec![ClassroomRecord::new("A", 50), ClassroomRecord::new("B", 50)];
        let state = run(&courses, &rooms, &one_day_grid(), &Config::default());

        // Only two disjoint 2h windows in 08:00-12:00
        assert_eq!(state.schedule.len(), 2);
        assert_eq!(state.unscheduled.len(), 1);
        assert_eq!(state.unscheduled[0].reason, UnscheduledReason::NoTeacherSlot);
    }

    #[test]
    fn test_room_exhaustion_reason() {
        let courses: Vec<CourseRecord> = (0..3)
            .map(|i| CourseRecord::new(format!("C{i}")).with_session(SessionType::Theoretical, 2))
            .collect();
        let rooms = vec![ClassroomRecord::new("A", 50)
            .with_available_hours(json!({"monday": ["08:00-12:00"]}))];
        let state = run(&courses, &rooms, &one_day_grid(), &Config::default());

        assert_eq!(state.schedule.len(), 2);
        assert_eq!(state.unscheduled[0].reason, UnscheduledReason::NoClassroom);
    }

    #[test]
    fn test_backtracking_frees_slot() {
        // T1 only teaches 08:00-10:00. C_FREE (no teacher) is easier and
        // grabs that slot in the lone room first unless it is displaced.
        let courses = vec![
            CourseRecord::new("C_FREE")
                .with_session(SessionType::Theoretical, 2)
                .with_department("CS", 200),
            CourseRecord::new("C_TIGHT")
                .with_teacher("T1")
                .with_working_hours(json!({"monday": ["08:00-10:00"]}))
                .with_session(SessionType::Theoretical, 2),
        ];
        let rooms = vec![ClassroomRecord::new("A", 250)];
        let mut config = Config::default();

        let with = run(&courses, &rooms, &one_day_grid(), &config);
        assert!(with.unscheduled.is_empty());
        assert_eq!(with.schedule.len(), 2);

        config.features.backtracking = false;
        let without = run(&courses, &rooms, &one_day_grid(), &config);
        assert_eq!(without.unscheduled.len(), 1);
        assert_eq!(without.unscheduled[0].reason, UnscheduledReason::NoClassroom);
    }

    #[test]
    fn test_zero_budget_marks_timeout() {
        let courses = vec![CourseRecord::new("C1").with_session(SessionType::Theoretical, 4)];
        let rooms = vec![ClassroomRecord::new("A", 50)];
        let grid = TimeGrid::default();
        let config = Config::default();
        let problem = Problem::new(&courses, &rooms, &grid, &config);
        let ranker = RuleEngine::timetabling();
        let timeout = TimeoutManager::millis(0);
        let mut state = WorkingSchedule::new(Schedule::new());

        assert!(Placer::new(&problem, &ranker, &timeout).place_all(&mut state));
        assert_eq!(state.unscheduled.len(), 2);
        assert!(state
            .unscheduled
            .iter()
            .all(|u| u.reason == UnscheduledReason::Timeout));
    }

    #[test]
    fn test_budget_expiry_after_attempts_is_timeout() {
        let courses = vec![CourseRecord::new("C1").with_session(SessionType::Theoretical, 2)];
        let rooms = vec![ClassroomRecord::new("A", 50)];
        let grid = TimeGrid::default();
        let config = Config::default();
        let problem = Problem::new(&courses, &rooms, &grid, &config);
        let ranker = RuleEngine::timetabling();
        let blocked = Attempts {
            tried: 3,
            room_blocked: 3,
            timed_out: false,
        };

        let fresh = TimeoutManager::millis(60_000);
        let placer = Placer::new(&problem, &ranker, &fresh);
        assert_eq!(placer.failure_reason(&blocked), UnscheduledReason::NoClassroom);
        assert_eq!(placer.failure_reason(&Attempts::default()), UnscheduledReason::NoTeacherSlot);

        // The budget ran out after first fit, e.g. inside backtracking
        let spent = TimeoutManager::millis(0);
        let placer = Placer::new(&problem, &ranker, &spent);
        assert_eq!(placer.failure_reason(&blocked), UnscheduledReason::Timeout);
    }
}
