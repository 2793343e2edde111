//! Scheduling engine.
//!
//! # Phases
//!
//! 1. **Seeding**: pinned placements of active courses are copied in
//!    verbatim and never moved afterwards.
//! 2. **Placing**: session units are placed greedily, hardest first.
//! 3. **Optimizing**: local search improves the placed timetable.
//! 4. **Done**: the best timetable found is summarized.
//!
//! The whole run shares one time budget. Running out of time is not a
//! failure: the best timetable so far is returned with `timed_out` set.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::kpi::QualityMetrics;
use super::placement::{Placer, WorkingSchedule};
use super::problem::Problem;
use super::search::LocalSearch;
use crate::config::Config;
use crate::dispatching::RuleEngine;
use crate::error::ScheduleError;
use crate::grid::{duration_hours, TimeGrid};
use crate::learning::LearningStore;
use crate::models::{
    ClassroomRecord, CourseRecord, Schedule, ScheduleEntry, UnscheduledUnit,
};
use crate::timeout::TimeoutManager;
use crate::validation::{
    validate_input, Classroom, ConstraintValidator, Teacher, ValidationError, ValidationOutcome,
};

/// Input container for scheduling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Courses to schedule. Inactive ones are ignored.
    pub courses: Vec<CourseRecord>,
    /// Available classrooms. Inactive ones take no sessions.
    pub classrooms: Vec<ClassroomRecord>,
    /// Teaching days and blocks.
    #[serde(default)]
    pub grid: TimeGrid,
    /// Engine configuration.
    #[serde(default)]
    pub config: Config,
}

impl ScheduleRequest {
    /// Creates a request with the default grid and configuration.
    pub fn new(courses: Vec<CourseRecord>, classrooms: Vec<ClassroomRecord>) -> Self {
        Self {
            courses,
            classrooms,
            grid: TimeGrid::default(),
            config: Config::default(),
        }
    }

    /// Sets the time grid.
    pub fn with_grid(mut self, grid: TimeGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }
}

/// Engine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePhase {
    Seeding,
    Placing,
    Optimizing,
    Done,
}

impl fmt::Display for SchedulePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulePhase::Seeding => "seeding",
            SchedulePhase::Placing => "placing",
            SchedulePhase::Optimizing => "optimizing",
            SchedulePhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result summary of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// False only when units were required and none was placed.
    pub success: bool,
    /// Session units placed by the engine.
    pub scheduled_count: usize,
    /// Session units left unplaced.
    pub unscheduled_count: usize,
    /// `scheduled / required` units (1.0 when nothing is required).
    pub success_rate: f64,
    /// All entries, pins included, ordered by day, start and classroom.
    pub schedule: Vec<ScheduleEntry>,
    /// Units without a slot.
    pub unscheduled: Vec<UnscheduledUnit>,
    /// Every unit was placed.
    pub perfect: bool,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub result: ScheduleResult,
    pub metrics: QualityMetrics,
    /// Unusable availability data that degraded the run.
    pub warnings: Vec<ValidationError>,
    /// The time budget ran out before the search finished.
    pub timed_out: bool,
    pub elapsed_ms: u64,
    /// Configuration actually used (after learned parameters).
    pub config: Config,
}

/// Timetable scheduling engine.
///
/// # Example
///
/// ```
/// use u_timetable::models::{ClassroomRecord, CourseRecord, SessionType};
/// use u_timetable::scheduler::{ScheduleRequest, SchedulingEngine};
/// use u_timetable::config::Config;
///
/// let courses = vec![
///     CourseRecord::new("MATH101").with_session(SessionType::Theoretical, 4),
///     CourseRecord::new("PHYS101").with_session(SessionType::Theoretical, 4),
/// ];
/// let rooms = vec![ClassroomRecord::new("A", 80)];
/// let request = ScheduleRequest::new(courses, rooms)
///     .with_config(Config::fast().with_seed(42));
///
/// let outcome = SchedulingEngine::new().run(&request).unwrap();
/// assert!(outcome.result.perfect);
/// assert_eq!(outcome.result.scheduled_count, 4);
/// ```
#[derive(Debug, Clone)]
pub struct SchedulingEngine {
    rule_engine: RuleEngine,
    learning: Option<Arc<LearningStore>>,
}

impl SchedulingEngine {
    /// Creates an engine with the standard candidate ranking.
    pub fn new() -> Self {
        Self {
            rule_engine: RuleEngine::timetabling(),
            learning: None,
        }
    }

    /// Replaces the candidate ranking.
    pub fn with_rule_engine(mut self, rule_engine: RuleEngine) -> Self {
        self.rule_engine = rule_engine;
        self
    }

    /// Attaches a learning store: completed runs are recorded, and with
    /// `features.learned_parameters` its recommendation is applied first.
    pub fn with_learning_store(mut self, store: Arc<LearningStore>) -> Self {
        self.learning = Some(store);
        self
    }

    /// Runs with a generator seeded from `hill_climbing.seed`, or from the
    /// OS when unset.
    pub fn run(&self, request: &ScheduleRequest) -> Result<ScheduleOutcome, ScheduleError> {
        let config = self.effective_config(request)?;
        let mut rng = match config.hill_climbing.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.execute(request, config, &mut rng)
    }

    /// Runs with a caller-supplied random source.
    pub fn run_with_rng<R: Rng>(
        &self,
        request: &ScheduleRequest,
        rng: &mut R,
    ) -> Result<ScheduleOutcome, ScheduleError> {
        let config = self.effective_config(request)?;
        self.execute(request, config, rng)
    }

    fn effective_config(&self, request: &ScheduleRequest) -> Result<Config, ScheduleError> {
        request.config.validate()?;
        let mut config = request.config.clone();

        if config.features.learned_parameters {
            if let Some(store) = &self.learning {
                if let Some(rec) = store.learn_optimal_parameters(&request.courses, &request.classrooms) {
                    info!(
                        event = "learned_parameters",
                        based_on = rec.based_on,
                        avg_success_rate = rec.avg_success_rate,
                    );
                    config = rec.patch.apply_to(&config);
                    config.validate()?;
                }
            }
        }
        Ok(config)
    }

    fn execute<R: Rng>(
        &self,
        request: &ScheduleRequest,
        config: Config,
        rng: &mut R,
    ) -> Result<ScheduleOutcome, ScheduleError> {
        let timer = TimeoutManager::millis(config.performance.timeout_ms).with_check_interval(
            Duration::from_millis(config.performance.timeout_check_interval_ms),
        );

        validate_input(&request.courses, &request.classrooms).map_err(ScheduleError::InvalidInput)?;

        let problem = Problem::new(&request.courses, &request.classrooms, &request.grid, &config);
        info!(
            event = "solve_start",
            courses = problem.courses.len(),
            classrooms = problem.classrooms.len(),
            units = problem.units.len(),
            timeout_ms = config.performance.timeout_ms,
        );
        for warning in &problem.warnings {
            warn!(event = "availability_warning", message = %warning.message);
        }

        // Seeding
        info!(event = "phase_start", phase = %SchedulePhase::Seeding);
        let mut state = WorkingSchedule::new(seed(&problem));
        info!(event = "phase_end", phase = %SchedulePhase::Seeding, pinned = state.schedule.len());

        // Placing
        info!(event = "phase_start", phase = %SchedulePhase::Placing);
        let mut timed_out = Placer::new(&problem, &self.rule_engine, &timer).place_all(&mut state);
        info!(
            event = "phase_end",
            phase = %SchedulePhase::Placing,
            placed = state.unit_of.len(),
            unscheduled = state.unscheduled.len(),
            duration_ms = timer.elapsed_ms(),
        );

        // Optimizing
        if timed_out {
            info!(event = "timeout", phase = %SchedulePhase::Placing);
        } else if !state.unit_of.is_empty() || !state.unscheduled.is_empty() {
            info!(event = "phase_start", phase = %SchedulePhase::Optimizing);
            let stats = LocalSearch::new(&problem, &timer).run(&mut state, rng);
            timed_out = stats.timed_out;
            info!(
                event = "phase_end",
                phase = %SchedulePhase::Optimizing,
                steps = stats.iterations,
                accepted = stats.accepted,
                improvements = stats.improvements,
                duration_ms = timer.elapsed_ms(),
            );
        }

        // Done
        let metrics = QualityMetrics::calculate(&problem, state.entries(), state.unscheduled.len());
        let unscheduled: Vec<UnscheduledUnit> = state
            .unscheduled
            .iter()
            .map(|u| {
                let unit = &problem.units[u.unit];
                UnscheduledUnit {
                    course_id: problem.courses[unit.course].id.clone(),
                    session_type: unit.session_type,
                    hours: unit.hours,
                    reason: u.reason,
                    detail: u.detail.clone(),
                }
            })
            .collect();
        let required = problem.units.len();
        let scheduled = required - unscheduled.len();
        let warnings = problem.warnings.clone();

        let mut entries = state.schedule.into_entries();
        entries.sort_by(|a, b| {
            (a.day, a.start, &a.classroom_id, &a.course_id).cmp(&(b.day, b.start, &b.classroom_id, &b.course_id))
        });

        let result = ScheduleResult {
            success: required == 0 || scheduled > 0,
            scheduled_count: scheduled,
            unscheduled_count: unscheduled.len(),
            success_rate: if required == 0 {
                1.0
            } else {
                scheduled as f64 / required as f64
            },
            schedule: entries,
            perfect: unscheduled.is_empty(),
            unscheduled,
        };
        let elapsed_ms = timer.elapsed_ms();

        if let Some(store) = &self.learning {
            store.record(
                &config,
                &request.courses,
                &request.classrooms,
                &result.schedule,
                elapsed_ms,
                &metrics,
            );
        }

        info!(
            event = "solve_end",
            phase = %SchedulePhase::Done,
            scheduled = result.scheduled_count,
            unscheduled = result.unscheduled_count,
            objective = metrics.objective,
            timed_out = timed_out,
            duration_ms = elapsed_ms,
        );

        Ok(ScheduleOutcome {
            result,
            metrics,
            warnings,
            timed_out,
            elapsed_ms,
            config,
        })
    }

    /// Validates a manual edit of one entry against the others.
    ///
    /// The entry's own id is excluded from conflict checks, so `existing`
    /// may still contain its old position.
    pub fn check_entry(
        &self,
        request: &ScheduleRequest,
        entry: &ScheduleEntry,
        existing: &[ScheduleEntry],
    ) -> Result<ValidationOutcome, ScheduleError> {
        let course = request
            .courses
            .iter()
            .find(|c| c.id == entry.course_id)
            .ok_or_else(|| ScheduleError::UnknownCourse(entry.course_id.clone()))?;
        let classroom = match &entry.classroom_id {
            Some(id) => Some(
                request
                    .classrooms
                    .iter()
                    .find(|r| &r.id == id)
                    .ok_or_else(|| ScheduleError::UnknownClassroom(id.clone()))?,
            ),
            None => None,
        };

        let validator = ConstraintValidator::new(&request.courses);
        let teacher = Teacher::from_course(course);
        let room = classroom.map(Classroom::parse);
        let range = entry.range();
        let exclude = Some(entry.id);

        let mut outcome =
            validator.validate_teacher(teacher.as_ref(), entry.day, range, existing, exclude);
        outcome.merge(validator.validate_classroom(room.as_ref(), entry.day, range, existing, exclude));
        outcome.merge(validator.validate_course_overlap(&course.id, entry.day, range, existing, exclude));
        if let Some(record) = classroom {
            outcome.merge(validator.validate_room_fit(course, record, entry.session_type));
        }
        Ok(outcome)
    }
}

impl Default for SchedulingEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies pinned placements of active courses into a fresh schedule.
fn seed(problem: &Problem) -> Schedule {
    let mut schedule = Schedule::new();
    for course in &problem.courses {
        for pin in &course.hardcoded {
            let Ok(range) = pin.range() else {
                continue;
            };
            let mut entry = ScheduleEntry::new(
                course.id.clone(),
                pin.day,
                range,
                pin.session_type,
                duration_hours(range.start, range.end),
            )
            .hardcoded();
            entry.classroom_id = pin.classroom_id.clone();
            schedule.insert(entry);
        }
    }
    schedule
}
