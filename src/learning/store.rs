//! Append-only learning store.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, info};

use super::record::{hour_coverage, InputShape, LearningRecord, OutcomeMetrics};
use crate::config::{Config, ConfigPatch, DifficultyPatch, FeaturePatch, HillClimbingPatch};
use crate::models::{ClassroomRecord, CourseRecord, ScheduleEntry};
use crate::scheduler::QualityMetrics;

/// Version written into exported documents.
pub const DOCUMENT_VERSION: u32 = 1;

/// Relative tolerance on course and classroom counts.
const COMPARABLE_TOLERANCE: f64 = 0.5;

/// Failure to restore a learning document.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("learning document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported learning document version {0}")]
    UnsupportedVersion(u32),
}

/// Persisted form of the whole log.
#[derive(Debug, Serialize, Deserialize)]
struct LearningDocument {
    version: u32,
    records: Vec<LearningRecord>,
}

/// Store summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningStats {
    pub total_records: usize,
    /// Mean success rate (0 when empty).
    pub avg_success_rate: f64,
}

/// Tuned parameters proposed from past runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Patch to merge over the caller's config.
    pub patch: ConfigPatch,
    /// Runs averaged into the patch.
    pub based_on: usize,
    /// Mean success rate of those runs.
    pub avg_success_rate: f64,
}

/// Append-only log of run outcomes.
///
/// `Send + Sync`: appends take the write lock once, reads work on a
/// consistent snapshot.
#[derive(Debug)]
pub struct LearningStore {
    records: RwLock<Vec<LearningRecord>>,
    min_records: usize,
    top_runs: usize,
}

impl LearningStore {
    /// Creates an empty store needing 5 comparable runs per recommendation.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            min_records: 5,
            top_runs: 3,
        }
    }

    /// Sets how many comparable runs a recommendation needs.
    pub fn with_min_records(mut self, min_records: usize) -> Self {
        self.min_records = min_records.max(1);
        self
    }

    /// Sets how many of the best runs are averaged.
    pub fn with_top_runs(mut self, top_runs: usize) -> Self {
        self.top_runs = top_runs.max(1);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<LearningRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<LearningRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends the outcome of a completed run.
    pub fn record(
        &self,
        config: &Config,
        courses: &[CourseRecord],
        classrooms: &[ClassroomRecord],
        schedule: &[ScheduleEntry],
        duration_ms: u64,
        metrics: &QualityMetrics,
    ) -> LearningRecord {
        let (scheduled_hours, required_hours) = hour_coverage(courses, schedule);
        let success_rate = if required_hours == 0 {
            1.0
        } else {
            scheduled_hours as f64 / required_hours as f64
        };

        let record = LearningRecord {
            config: config.clone(),
            input: InputShape::of(courses, classrooms),
            outcome: OutcomeMetrics {
                success_rate,
                avg_capacity_margin: metrics.avg_capacity_margin,
                max_capacity_waste: metrics.max_capacity_waste,
                teacher_load_std_dev: metrics.teacher_load_std_dev,
                objective: metrics.objective,
                duration_ms,
                scheduled_hours,
                required_hours,
            },
            recorded_at: Utc::now(),
        };

        let mut records = self.write();
        records.push(record.clone());
        debug!(
            event = "learning_record",
            total = records.len(),
            success_rate = success_rate,
        );
        record
    }

    /// Record count and mean success rate.
    pub fn stats(&self) -> LearningStats {
        let records = self.read();
        if records.is_empty() {
            return LearningStats::default();
        }
        let sum: f64 = records.iter().map(|r| r.outcome.success_rate).sum();
        LearningStats {
            total_records: records.len(),
            avg_success_rate: sum / records.len() as f64,
        }
    }

    /// Proposes parameters from the best comparable past runs.
    ///
    /// Returns `None` until at least `min_records` runs on inputs with
    /// course and classroom counts within ±50% of this one exist.
    pub fn learn_optimal_parameters(
        &self,
        courses: &[CourseRecord],
        classrooms: &[ClassroomRecord],
    ) -> Option<Recommendation> {
        let current = InputShape::of(courses, classrooms);
        let records = self.read();

        let mut comparable: Vec<&LearningRecord> = records
            .iter()
            .filter(|r| r.input.is_comparable(&current, COMPARABLE_TOLERANCE))
            .collect();
        if comparable.len() < self.min_records {
            return None;
        }

        comparable.sort_by(|a, b| {
            b.outcome
                .success_rate
                .total_cmp(&a.outcome.success_rate)
                .then(a.outcome.teacher_load_std_dev.total_cmp(&b.outcome.teacher_load_std_dev))
        });
        let best = &comparable[..self.top_runs.min(comparable.len())];
        let n = best.len() as f64;
        let mean = |f: fn(&LearningRecord) -> f64| best.iter().map(|r| f(r)).sum::<f64>() / n;

        let annealing_votes = best
            .iter()
            .filter(|r| r.config.features.simulated_annealing)
            .count();

        let patch = ConfigPatch {
            difficulty: Some(DifficultyPatch {
                student_count: Some(mean(|r| r.config.difficulty.student_count)),
                session_hours: Some(mean(|r| r.config.difficulty.session_hours)),
                lab_session: Some(mean(|r| r.config.difficulty.lab_session)),
                teacher_scarcity: Some(mean(|r| r.config.difficulty.teacher_scarcity)),
            }),
            hill_climbing: Some(HillClimbingPatch {
                iterations: Some(mean(|r| r.config.hill_climbing.iterations as f64).round() as usize),
                ..Default::default()
            }),
            features: Some(FeaturePatch {
                simulated_annealing: Some(annealing_votes * 2 >= best.len()),
                ..Default::default()
            }),
            ..Default::default()
        };

        Some(Recommendation {
            patch,
            based_on: best.len(),
            avg_success_rate: mean(|r| r.outcome.success_rate),
        })
    }

    /// Serializes the whole log.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        let document = LearningDocument {
            version: DOCUMENT_VERSION,
            records: self.records(),
        };
        serde_json::to_string_pretty(&document)
    }

    /// Replaces the log with an exported document.
    ///
    /// On error the store is left unchanged. Returns the record count.
    pub fn import_json(&self, text: &str) -> Result<usize, ImportError> {
        let document: LearningDocument = serde_json::from_str(text)?;
        if document.version != DOCUMENT_VERSION {
            return Err(ImportError::UnsupportedVersion(document.version));
        }
        let count = document.records.len();
        *self.write() = document.records;
        info!(event = "learning_import", records = count);
        Ok(count)
    }

    /// Empties the log.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of all records.
    pub fn records(&self) -> Vec<LearningRecord> {
        self.read().clone()
    }
}

impl Default for LearningStore {
    fn default() -> Self {
        Self::new()
    }
}
