//! Local search over a placed timetable.
//!
//! Each iteration samples one random move and keeps it if the objective
//! does not get worse. With annealing enabled, a worsening move of size
//! `Δ < 0` is also kept with probability `exp(Δ / T)`, where the
//! temperature cools geometrically: `T_i = max(T_0 · cooling^i, T_min)`.
//!
//! # Moves
//!
//! - **Relocate**: move one placed session to another static candidate.
//! - **Swap**: exchange the slots of two sessions of equal block length.
//! - **Insert**: place a currently unscheduled unit.
//!
//! Pinned entries are never selected. Every move is checked against the
//! hard constraints before it is scored.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Abramson (1991), "Constructing school timetables using simulated annealing"

use rand::Rng;
use tracing::info;

use super::kpi::QualityMetrics;
use super::placement::{Unplaced, WorkingSchedule};
use super::problem::Problem;
use crate::models::{EntryId, ScheduleEntry};
use crate::timeout::TimeoutManager;

/// Chance an iteration tries an insert while units remain unscheduled.
const INSERT_PROBABILITY: f64 = 0.25;

/// Counters of one search run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct SearchStats {
    pub iterations: usize,
    pub accepted: usize,
    pub improvements: usize,
    pub timed_out: bool,
}

/// How to revert an applied move.
enum Undo {
    Relocate(ScheduleEntry),
    Swap(ScheduleEntry, ScheduleEntry),
    Insert { id: EntryId, unplaced: Unplaced, at: usize },
}

pub(crate) struct LocalSearch<'p, 'a> {
    problem: &'p Problem<'a>,
    timeout: &'p TimeoutManager,
}

impl<'p, 'a> LocalSearch<'p, 'a> {
    pub fn new(problem: &'p Problem<'a>, timeout: &'p TimeoutManager) -> Self {
        Self { problem, timeout }
    }

    /// Improves `state` in place, leaving the best schedule found.
    pub fn run<R: Rng>(&self, state: &mut WorkingSchedule, rng: &mut R) -> SearchStats {
        let config = self.problem.config;
        let annealing = &config.annealing;
        let mut stats = SearchStats::default();

        let mut current = self.score(state);
        let mut best = state.clone();
        let mut best_value = current;
        let mut temperature = annealing.initial_temperature.max(annealing.min_temperature);

        for _ in 0..config.hill_climbing.iterations {
            if self.timeout.is_timed_out() {
                stats.timed_out = true;
                info!(event = "timeout", phase = "optimizing", iterations = stats.iterations);
                break;
            }
            stats.iterations += 1;

            if let Some(undo) = self.random_move(state, rng) {
                let value = self.score(state);
                let delta = value - current;
                let accept = delta > 0.0
                    || (config.features.simulated_annealing
                        && temperature > 0.0
                        && rng.random::<f64>() < (delta / temperature).exp());

                if accept {
                    current = value;
                    stats.accepted += 1;
                    if value > best_value {
                        best_value = value;
                        best = state.clone();
                        stats.improvements += 1;
                    }
                } else {
                    self.undo(state, undo);
                }
            }

            temperature = (temperature * annealing.cooling_rate).max(annealing.min_temperature);
        }

        *state = best;
        stats
    }

    fn score(&self, state: &WorkingSchedule) -> f64 {
        QualityMetrics::objective(self.problem, state.entries(), state.unscheduled.len())
    }

    fn random_move<R: Rng>(&self, state: &mut WorkingSchedule, rng: &mut R) -> Option<Undo> {
        let hc = &self.problem.config.hill_climbing;
        if !state.unscheduled.is_empty() && rng.random_bool(INSERT_PROBABILITY) {
            return self.insert(state, rng);
        }
        if self.problem.config.features.swap_moves && rng.random_bool(hc.swap_probability) {
            return self.swap(state, rng);
        }
        self.relocate(state, rng)
    }

    /// Positions of entries the search may move.
    fn movable(state: &WorkingSchedule) -> Vec<usize> {
        state
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_hardcoded && state.unit_of.contains_key(&e.id))
            .map(|(i, _)| i)
            .collect()
    }

    fn is_valid(&self, state: &WorkingSchedule, pos: usize) -> bool {
        let entry = &state.entries()[pos];
        let Some(&unit) = state.unit_of.get(&entry.id) else {
            return false;
        };
        let course = self.problem.units[unit].course;
        self.problem
            .check(
                course,
                entry.classroom_id.as_deref(),
                entry.day,
                entry.range(),
                state.entries(),
                Some(entry.id),
            )
            .valid
    }

    fn relocate<R: Rng>(&self, state: &mut WorkingSchedule, rng: &mut R) -> Option<Undo> {
        let movable = Self::movable(state);
        if movable.is_empty() {
            return None;
        }
        let pos = movable[rng.random_range(0..movable.len())];
        let unit = &self.problem.units[*state.unit_of.get(&state.entries()[pos].id)?];
        let candidates = self.problem.groups[unit.group].as_ref().ok()?;
        let target = &candidates[rng.random_range(0..candidates.len())];

        let previous = state.schedule.entries[pos].clone();
        {
            let entry = &mut state.schedule.entries[pos];
            entry.day = target.day;
            entry.start = target.range.start;
            entry.end = target.range.end;
            entry.classroom_id = Some(target.classroom_id.clone());
        }
        if state.schedule.entries[pos] == previous || !self.is_valid(state, pos) {
            state.schedule.entries[pos] = previous;
            return None;
        }
        Some(Undo::Relocate(previous))
    }

    fn swap<R: Rng>(&self, state: &mut WorkingSchedule, rng: &mut R) -> Option<Undo> {
        let movable = Self::movable(state);
        if movable.len() < 2 {
            return None;
        }
        let a = movable[rng.random_range(0..movable.len())];
        let unit_a = *state.unit_of.get(&state.entries()[a].id)?;
        let partners: Vec<usize> = movable
            .iter()
            .copied()
            .filter(|&b| b != a)
            .filter(|&b| {
                state
                    .unit_of
                    .get(&state.entries()[b].id)
                    .is_some_and(|&u| self.problem.units[u].blocks == self.problem.units[unit_a].blocks)
            })
            .collect();
        if partners.is_empty() {
            return None;
        }
        let b = partners[rng.random_range(0..partners.len())];
        let unit_b = *state.unit_of.get(&state.entries()[b].id)?;

        let old_a = state.schedule.entries[a].clone();
        let old_b = state.schedule.entries[b].clone();
        if (old_a.day, old_a.start, &old_a.classroom_id) == (old_b.day, old_b.start, &old_b.classroom_id) {
            return None;
        }

        // Each unit must fit the other's room type and size.
        let fits = |unit: usize, room: &Option<String>| {
            let u = &self.problem.units[unit];
            room.as_deref()
                .and_then(|id| self.problem.classroom(id))
                .is_some_and(|r| self.problem.room_fits(u.course, u.session_type, r))
        };
        if !fits(unit_a, &old_b.classroom_id) || !fits(unit_b, &old_a.classroom_id) {
            return None;
        }

        {
            let entries = &mut state.schedule.entries;
            entries[a].day = old_b.day;
            entries[a].start = old_b.start;
            entries[a].end = old_b.end;
            entries[a].classroom_id = old_b.classroom_id.clone();
            entries[b].day = old_a.day;
            entries[b].start = old_a.start;
            entries[b].end = old_a.end;
            entries[b].classroom_id = old_a.classroom_id.clone();
        }
        if !self.is_valid(state, a) || !self.is_valid(state, b) {
            state.schedule.entries[a] = old_a;
            state.schedule.entries[b] = old_b;
            return None;
        }
        Some(Undo::Swap(old_a, old_b))
    }

    fn insert<R: Rng>(&self, state: &mut WorkingSchedule, rng: &mut R) -> Option<Undo> {
        let at = rng.random_range(0..state.unscheduled.len());
        let unit_idx = state.unscheduled[at].unit;
        let unit = &self.problem.units[unit_idx];
        let candidates = self.problem.groups[unit.group].as_ref().ok()?;
        let target = &candidates[rng.random_range(0..candidates.len())];

        let outcome = self.problem.check(
            unit.course,
            Some(&target.classroom_id),
            target.day,
            target.range,
            state.entries(),
            None,
        );
        if !outcome.valid {
            return None;
        }
        let unplaced = state.unscheduled.remove(at);
        let id = state.add(unit_idx, self.problem.entry_for(unit, target));
        Some(Undo::Insert { id, unplaced, at })
    }

    fn undo(&self, state: &mut WorkingSchedule, undo: Undo) {
        match undo {
            Undo::Relocate(previous) => restore(state, previous),
            Undo::Swap(a, b) => {
                restore(state, a);
                restore(state, b);
            }
            Undo::Insert { id, unplaced, at } => {
                state.lift(id);
                state.unscheduled.insert(at, unplaced);
            }
        }
    }
}

fn restore(state: &mut WorkingSchedule, previous: ScheduleEntry) {
    if let Some(slot) = state.schedule.entries.iter_mut().find(|e| e.id == previous.id) {
        *slot = previous;
    }
}
