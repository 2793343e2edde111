//! Weighted-scoring configuration, presets and patches.
//!
//! A [`Config`] is a plain value: cloning it yields an independent deep
//! copy, so handing out a preset never exposes the stored original.
//! Partial overrides are expressed as a [`ConfigPatch`], whose fields are
//! all optional and which merges section by section.
//!
//! # Example
//!
//! ```
//! use u_timetable::config::{ConfigManager, ConfigPatch};
//!
//! let manager = ConfigManager::new();
//! let fast = manager.preset("fast").unwrap();
//! assert!(fast.hill_climbing.iterations < manager.default_config().hill_climbing.iterations);
//!
//! let patch = ConfigPatch::from_json_str(r#"{"performance": {"timeout_ms": 500}}"#).unwrap();
//! let merged = manager.merge(&patch);
//! assert_eq!(merged.performance.timeout_ms, 500);
//! assert_eq!(merged.hill_climbing, manager.default_config().hill_climbing);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Weights ranking how hard a session unit is to place.
    pub difficulty: DifficultyWeights,
    /// Ideal room occupancy band.
    pub capacity: CapacityBounds,
    /// Local search budget.
    pub hill_climbing: HillClimbingParams,
    /// Annealing temperature schedule.
    pub annealing: AnnealingParams,
    /// Feature switches.
    pub features: FeatureToggles,
    /// Time and attempt limits.
    pub performance: PerformanceLimits,
    /// Session splitting.
    pub placement: PlacementParams,
    /// Objective function weights.
    pub objective: ObjectiveWeights,
}

/// Difficulty weights: higher totals are placed first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyWeights {
    /// Per 10 enrolled students.
    pub student_count: f64,
    /// Per hour of the unit.
    pub session_hours: f64,
    /// Flat bonus for lab units (fewer suitable rooms).
    pub lab_session: f64,
    /// Scales with how little of the week the teacher is free.
    pub teacher_scarcity: f64,
}

impl Default for DifficultyWeights {
    fn default() -> Self {
        Self {
            student_count: 1.0,
            session_hours: 2.0,
            lab_session: 3.0,
            teacher_scarcity: 4.0,
        }
    }
}

/// Fraction of room capacity a session should ideally occupy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityBounds {
    pub ideal_min: f64,
    pub ideal_max: f64,
}

impl Default for CapacityBounds {
    fn default() -> Self {
        Self {
            ideal_min: 0.6,
            ideal_max: 0.95,
        }
    }
}

/// Hill-climbing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillClimbingParams {
    /// Iterations of the local search.
    pub iterations: usize,
    /// Probability that a sampled move is a swap rather than a relocation.
    pub swap_probability: f64,
    /// Random seed. `None` = seeded from the OS.
    pub seed: Option<u64>,
}

impl Default for HillClimbingParams {
    fn default() -> Self {
        Self {
            iterations: 1000,
            swap_probability: 0.3,
            seed: None,
        }
    }
}

/// Simulated annealing temperature schedule.
///
/// Temperature at iteration `i` is `max(initial · cooling^i, min)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingParams {
    pub initial_temperature: f64,
    pub cooling_rate: f64,
    pub min_temperature: f64,
}

impl Default for AnnealingParams {
    fn default() -> Self {
        Self {
            initial_temperature: 2.0,
            cooling_rate: 0.995,
            min_temperature: 0.01,
        }
    }
}

/// Feature switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    /// Accept some worsening moves.
    pub simulated_annealing: bool,
    /// Relocate a blocking entry when a unit cannot be placed.
    pub backtracking: bool,
    /// Allow swap moves in local search.
    pub swap_moves: bool,
    /// Merge the learning store's recommendation before a run.
    pub learned_parameters: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            simulated_annealing: true,
            backtracking: true,
            swap_moves: true,
            learned_parameters: false,
        }
    }
}

/// Time and attempt limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceLimits {
    /// Wall-clock budget of a run.
    pub timeout_ms: u64,
    /// Re-measure the clock at most this often (0 = every poll).
    pub timeout_check_interval_ms: u64,
    /// Candidates tried per session unit.
    pub max_placement_attempts: usize,
}

impl Default for PerformanceLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            timeout_check_interval_ms: 0,
            max_placement_attempts: 200,
        }
    }
}

/// How sessions are cut into placeable units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementParams {
    /// Longest unit, in hours. A 5h session becomes 2h + 2h + 1h.
    pub max_unit_hours: u32,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self { max_unit_hours: 2 }
    }
}

/// Objective: `capacity_fit · fit − load_variance · var − unscheduled · n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub capacity_fit: f64,
    pub load_variance: f64,
    pub unscheduled: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            capacity_fit: 1.0,
            load_variance: 0.5,
            unscheduled: 10.0,
        }
    }
}

impl Config {
    /// Short budget for interactive use.
    pub fn fast() -> Self {
        let mut config = Self::default();
        config.hill_climbing.iterations = 200;
        config.performance.timeout_ms = 5_000;
        config.performance.max_placement_attempts = 100;
        config.annealing.cooling_rate = 0.98;
        config
    }

    /// Long budget for overnight runs.
    pub fn quality() -> Self {
        let mut config = Self::default();
        config.hill_climbing.iterations = 5_000;
        config.performance.timeout_ms = 120_000;
        config.performance.max_placement_attempts = 500;
        config.annealing.cooling_rate = 0.999;
        config
    }

    /// Parses a full configuration; missing fields take defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.hill_climbing.seed = Some(seed);
        self
    }

    /// Sets the time budget.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.performance.timeout_ms = timeout_ms;
        self
    }

    /// Sets the local search iteration count.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.hill_climbing.iterations = iterations;
        self
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.capacity;
        if !(0.0..=1.0).contains(&c.ideal_min)
            || !(0.0..=1.0).contains(&c.ideal_max)
            || c.ideal_min > c.ideal_max
        {
            return Err(ConfigError::Invalid(format!(
                "capacity bounds must satisfy 0 <= ideal_min <= ideal_max <= 1, got {}..{}",
                c.ideal_min, c.ideal_max
            )));
        }
        let d = &self.difficulty;
        let o = &self.objective;
        let weights = [
            ("difficulty.student_count", d.student_count),
            ("difficulty.session_hours", d.session_hours),
            ("difficulty.lab_session", d.lab_session),
            ("difficulty.teacher_scarcity", d.teacher_scarcity),
            ("objective.capacity_fit", o.capacity_fit),
            ("objective.load_variance", o.load_variance),
            ("objective.unscheduled", o.unscheduled),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be finite and non-negative, got {weight}"
                )));
            }
        }
        let a = &self.annealing;
        if !(a.cooling_rate > 0.0 && a.cooling_rate <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "cooling_rate must be in (0, 1], got {}",
                a.cooling_rate
            )));
        }
        if !(a.initial_temperature >= 0.0 && a.initial_temperature.is_finite())
            || !(a.min_temperature >= 0.0 && a.min_temperature.is_finite())
        {
            return Err(ConfigError::Invalid("temperatures must be finite and non-negative".into()));
        }
        if !(0.0..=1.0).contains(&self.hill_climbing.swap_probability) {
            return Err(ConfigError::Invalid("swap_probability must be in [0, 1]".into()));
        }
        if self.performance.max_placement_attempts == 0 {
            return Err(ConfigError::Invalid("max_placement_attempts must be positive".into()));
        }
        if self.placement.max_unit_hours == 0 {
            return Err(ConfigError::Invalid("max_unit_hours must be positive".into()));
        }
        Ok(())
    }
}

// ======================== Patches ========================

/// Partial configuration. Present fields override, absent fields keep
/// the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<DifficultyPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<CapacityPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hill_climbing: Option<HillClimbingPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annealing: Option<AnnealingPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeaturePatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformancePatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<PlacementPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<ObjectivePatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyPatch {
    pub student_count: Option<f64>,
    pub session_hours: Option<f64>,
    pub lab_session: Option<f64>,
    pub teacher_scarcity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityPatch {
    pub ideal_min: Option<f64>,
    pub ideal_max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillClimbingPatch {
    pub iterations: Option<usize>,
    pub swap_probability: Option<f64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingPatch {
    pub initial_temperature: Option<f64>,
    pub cooling_rate: Option<f64>,
    pub min_temperature: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturePatch {
    pub simulated_annealing: Option<bool>,
    pub backtracking: Option<bool>,
    pub swap_moves: Option<bool>,
    pub learned_parameters: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformancePatch {
    pub timeout_ms: Option<u64>,
    pub timeout_check_interval_ms: Option<u64>,
    pub max_placement_attempts: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementPatch {
    pub max_unit_hours: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectivePatch {
    pub capacity_fit: Option<f64>,
    pub load_variance: Option<f64>,
    pub unscheduled: Option<f64>,
}

fn set<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

impl ConfigPatch {
    /// Parses a patch from JSON.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the patch to `base`, returning a new config.
    pub fn apply_to(&self, base: &Config) -> Config {
        let mut out = base.clone();

        if let Some(p) = &self.difficulty {
            set(&mut out.difficulty.student_count, &p.student_count);
            set(&mut out.difficulty.session_hours, &p.session_hours);
            set(&mut out.difficulty.lab_session, &p.lab_session);
            set(&mut out.difficulty.teacher_scarcity, &p.teacher_scarcity);
        }
        if let Some(p) = &self.capacity {
            set(&mut out.capacity.ideal_min, &p.ideal_min);
            set(&mut out.capacity.ideal_max, &p.ideal_max);
        }
        if let Some(p) = &self.hill_climbing {
            set(&mut out.hill_climbing.iterations, &p.iterations);
            set(&mut out.hill_climbing.swap_probability, &p.swap_probability);
            if p.seed.is_some() {
                out.hill_climbing.seed = p.seed;
            }
        }
        if let Some(p) = &self.annealing {
            set(&mut out.annealing.initial_temperature, &p.initial_temperature);
            set(&mut out.annealing.cooling_rate, &p.cooling_rate);
            set(&mut out.annealing.min_temperature, &p.min_temperature);
        }
        if let Some(p) = &self.features {
            set(&mut out.features.simulated_annealing, &p.simulated_annealing);
            set(&mut out.features.backtracking, &p.backtracking);
            set(&mut out.features.swap_moves, &p.swap_moves);
            set(&mut out.features.learned_parameters, &p.learned_parameters);
        }
        if let Some(p) = &self.performance {
            set(&mut out.performance.timeout_ms, &p.timeout_ms);
            set(
                &mut out.performance.timeout_check_interval_ms,
                &p.timeout_check_interval_ms,
            );
            set(
                &mut out.performance.max_placement_attempts,
                &p.max_placement_attempts,
            );
        }
        if let Some(p) = &self.placement {
            set(&mut out.placement.max_unit_hours, &p.max_unit_hours);
        }
        if let Some(p) = &self.objective {
            set(&mut out.objective.capacity_fit, &p.capacity_fit);
            set(&mut out.objective.load_variance, &p.load_variance);
            set(&mut out.objective.unscheduled, &p.unscheduled);
        }

        out
    }
}

// ======================== Manager ========================

/// Registry of named, immutable presets.
///
/// Built-ins: `"default"`, `"fast"`, `"quality"`.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    presets: BTreeMap<String, Config>,
}

impl ConfigManager {
    /// Creates a manager holding the built-in presets.
    pub fn new() -> Self {
        let mut presets = BTreeMap::new();
        presets.insert("default".to_string(), Config::default());
        presets.insert("fast".to_string(), Config::fast());
        presets.insert("quality".to_string(), Config::quality());
        Self { presets }
    }

    /// Registers (or replaces) a named preset.
    pub fn with_preset(mut self, name: impl Into<String>, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        self.presets.insert(name.into(), config);
        Ok(self)
    }

    /// An independent copy of the default preset.
    pub fn default_config(&self) -> Config {
        self.presets.get("default").cloned().unwrap_or_default()
    }

    /// An independent copy of a named preset.
    pub fn preset(&self, name: &str) -> Result<Config, ConfigError> {
        self.presets
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))
    }

    /// Preset names, sorted.
    pub fn preset_names(&self) -> Vec<&str> {
        self.presets.keys().map(|k| k.as_str()).collect()
    }

    /// Merges a patch over the default preset.
    pub fn merge(&self, patch: &ConfigPatch) -> Config {
        patch.apply_to(&self.default_config())
    }

    /// Merges a patch over an arbitrary base.
    pub fn merge_into(&self, base: &Config, patch: &ConfigPatch) -> Config {
        patch.apply_to(base)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
