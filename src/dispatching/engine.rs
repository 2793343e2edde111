//! Rule engine for multi-criteria candidate ranking.
//!
//! Rules are applied in sequence: a later rule only decides between
//! candidates the earlier rules scored equally. A final tie breaker makes
//! the order total.
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::cmp::Ordering;
use std::sync::Arc;

use super::{Candidate, PlacementContext, PlacementRule, RuleScore};

/// How ties are broken after all rules are exhausted.
#[derive(Debug, Clone, Default)]
pub enum TieBreaker {
    /// Keep input order (stable sort).
    #[default]
    NextRule,
    /// Deterministic by day, then start, then classroom id.
    BySlot,
}

/// A composable rule engine for candidate ranking.
///
/// # Example
/// ```
/// use u_timetable::dispatching::{rules, RuleEngine, TieBreaker};
///
/// let engine = RuleEngine::new()
///     .with_rule(rules::CapacityFit)
///     .with_rule(rules::PriorityDepartment)
///     .with_final_tie_breaker(TieBreaker::BySlot);
/// ```
#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<Arc<dyn PlacementRule>>,
    tie_breaker: TieBreaker,
    epsilon: f64,
}

impl RuleEngine {
    /// Creates an empty rule engine.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            tie_breaker: TieBreaker::NextRule,
            epsilon: 1e-9,
        }
    }

    /// The standard timetabling order: capacity fit, then teacher day
    /// load, then priority department, then slot position.
    pub fn timetabling() -> Self {
        Self::new()
            .with_rule(super::rules::CapacityFit)
            .with_rule(super::rules::TeacherDayLoad)
            .with_rule(super::rules::PriorityDepartment)
            .with_final_tie_breaker(TieBreaker::BySlot)
    }

    /// Appends a rule, consulted after the ones already added.
    pub fn with_rule<R: PlacementRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Sets the final tie-breaking strategy.
    pub fn with_final_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    /// Sorts candidates, best first.
    ///
    /// Returns indices into the original slice.
    pub fn sort_indices(&self, candidates: &[Candidate], context: &PlacementContext) -> Vec<usize> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let scores: Vec<Vec<RuleScore>> = candidates
            .iter()
            .map(|c| self.rules.iter().map(|rule| rule.evaluate(c, context)).collect())
            .collect();
        let mut indices: Vec<usize> = (0..candidates.len()).collect();
        indices.sort_by(|&a, &b| {
            self.compare_sequential(&scores[a], &scores[b])
                .then_with(|| self.final_tie(&candidates[a], &candidates[b]))
        });
        indices
    }

    fn compare_sequential(&self, a: &[RuleScore], b: &[RuleScore]) -> Ordering {
        for (score_a, score_b) in a.iter().zip(b) {
            if (score_a - score_b).abs() > self.epsilon {
                return score_a.partial_cmp(score_b).unwrap_or(Ordering::Equal);
            }
        }
        Ordering::Equal
    }

    fn final_tie(&self, a: &Candidate, b: &Candidate) -> Ordering {
        match &self.tie_breaker {
            TieBreaker::NextRule => Ordering::Equal,
            TieBreaker::BySlot => a
                .day
                .cmp(&b.day)
                .then(a.range.start.cmp(&b.range.start))
                .then_with(|| a.classroom_id.cmp(&b.classroom_id)),
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .field("tie_breaker", &self.tie_breaker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatching::rules;
    use crate::grid::{Day, TimeRange};

    fn slot(day: Day, start: u32, room: &str, capacity: u32) -> Candidate {
        Candidate::new(day, TimeRange::new(start, start + 60), room, capacity)
    }

    fn ranked<'c>(engine: &RuleEngine, candidates: &'c [Candidate], ctx: &PlacementContext) -> Vec<&'c Candidate> {
        engine
            .sort_indices(candidates, ctx)
            .into_iter()
            .map(|i| &candidates[i])
            .collect()
    }

    #[test]
    fn test_capacity_fit_ordering() {
        let candidates = vec![
            slot(Day::Monday, 480, "HUGE", 400),
            slot(Day::Monday, 480, "SNUG", 45),
            slot(Day::Monday, 480, "ROOMY", 80),
        ];
        let ctx = PlacementContext::for_students(40);
        let engine = RuleEngine::new().with_rule(rules::CapacityFit);

        let indices = engine.sort_indices(&candidates, &ctx);
        assert_eq!(candidates[indices[0]].classroom_id, "SNUG");
        assert_eq!(candidates[indices[1]].classroom_id, "ROOMY");
        assert_eq!(candidates[indices[2]].classroom_id, "HUGE");
    }

    #[test]
    fn test_later_rule_breaks_ties() {
        // Same room, same fit: lighter teacher day wins
        let candidates = vec![
            slot(Day::Monday, 480, "A", 50),
            slot(Day::Tuesday, 480, "A", 50),
        ];
        let ctx = PlacementContext::for_students(40).with_teacher_load(Day::Monday, 240);
        let engine = RuleEngine::new()
            .with_rule(rules::CapacityFit)
            .with_rule(rules::TeacherDayLoad);

        let indices = engine.sort_indices(&candidates, &ctx);
        assert_eq!(candidates[indices[0]].day, Day::Tuesday);
    }

    #[test]
    fn test_earlier_rule_dominates() {
        let candidates = vec![
            slot(Day::Monday, 480, "A", 50),   // good fit, busy day
            slot(Day::Tuesday, 480, "B", 400), // poor fit, free day
        ];
        let ctx = PlacementContext::for_students(40).with_teacher_load(Day::Monday, 600);
        let engine = RuleEngine::new()
            .with_rule(rules::CapacityFit)
            .with_rule(rules::TeacherDayLoad);

        assert_eq!(ranked(&engine, &candidates, &ctx)[0].classroom_id, "A");
    }

    #[test]
    fn test_by_slot_tie_breaker() {
        let candidates = vec![
            slot(Day::Tuesday, 480, "A", 50),
            slot(Day::Monday, 540, "B", 50),
            slot(Day::Monday, 480, "C", 50),
            slot(Day::Monday, 480, "B", 50),
        ];
        let ctx = PlacementContext::for_students(40);
        let engine = RuleEngine::new()
            .with_rule(rules::CapacityFit)
            .with_final_tie_breaker(TieBreaker::BySlot);

        let keys: Vec<(Day, u32, &str)> = ranked(&engine, &candidates, &ctx)
            .iter()
            .map(|c| (c.day, c.range.start, c.classroom_id.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Day::Monday, 480, "B"),
                (Day::Monday, 480, "C"),
                (Day::Monday, 540, "B"),
                (Day::Tuesday, 480, "A"),
            ]
        );
    }

    #[test]
    fn test_timetabling_order() {
        let candidates = vec![
            slot(Day::Monday, 480, "OTHER", 50).with_priority_department("EE"),
            slot(Day::Monday, 480, "OWN", 50).with_priority_department("CS"),
            slot(Day::Monday, 480, "FREE", 50),
        ];
        let ctx = PlacementContext::for_students(40).with_department("CS");
        let engine = RuleEngine::timetabling();

        let sorted = ranked(&engine, &candidates, &ctx);
        assert_eq!(sorted[0].classroom_id, "OWN");
        assert_eq!(sorted[1].classroom_id, "FREE");
        assert_eq!(sorted[2].classroom_id, "OTHER");
    }

    #[test]
    fn test_empty_candidates() {
        let ctx = PlacementContext::for_students(10);
        assert!(RuleEngine::timetabling().sort_indices(&[], &ctx).is_empty());
    }
}
