//! Core domain types for the Lift system.
//!
//! This module defines the fundamental types used throughout the system:
//! - The workout structure model (template slots and rep schemes)
//! - Programmes, their calculation and progression rules
//! - Programme progress
//! - Performance history, personal records and trainee maxes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ============================================================================
// Structure Model
// ============================================================================

/// Repetition scheme of an exercise slot.
///
/// On the wire this is discriminated by shape, see [`crate::structure`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(
    from = "crate::structure::RawReps",
    into = "crate::structure::RawReps"
)]
pub enum RepsScheme {
    /// Same rep count for every set
    Single(u32),
    /// Numeric range, e.g. min 8 / max 12
    Range { min: u32, max: u32 },
    /// Free-form range text, e.g. "8-12"
    RangeString(String),
    /// Explicit rep count per set
    PerSet(Vec<u32>),
}

/// Rep range used when nothing better can be resolved
pub const DEFAULT_REP_RANGE: (u32, u32) = (8, 12);

impl RepsScheme {
    /// Inclusive (low, high) rep range of the scheme
    pub fn range(&self) -> (u32, u32) {
        match self {
            RepsScheme::Single(n) => (*n, *n),
            RepsScheme::Range { min, max } => ordered(*min, *max),
            RepsScheme::RangeString(text) => parse_range_text(text),
            RepsScheme::PerSet(values) => {
                match (values.iter().min(), values.iter().max()) {
                    (Some(lo), Some(hi)) => (*lo, *hi),
                    _ => DEFAULT_REP_RANGE,
                }
            }
        }
    }

    /// Target reps for the set at `set_index` (zero based)
    pub fn target_for_set(&self, set_index: usize) -> u32 {
        match self {
            RepsScheme::Single(n) => *n,
            RepsScheme::Range { .. } | RepsScheme::RangeString(_) => self.range().0,
            RepsScheme::PerSet(values) => values
                .get(set_index)
                .or_else(|| values.last())
                .copied()
                .unwrap_or(DEFAULT_REP_RANGE.0),
        }
    }

    /// Midpoint of the rep range, rounded down
    pub fn midpoint(&self) -> u32 {
        let (lo, hi) = self.range();
        (lo + hi) / 2
    }
}

fn ordered(a: u32, b: u32) -> (u32, u32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Parse "8-12", "8–12", "10" or "5+" style text into a range
pub(crate) fn parse_range_text(text: &str) -> (u32, u32) {
    let numbers: Vec<u32> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect();

    match numbers.as_slice() {
        [single] => (*single, *single),
        [lo, hi, ..] => ordered(*lo, *hi),
        [] => {
            tracing::debug!("Unparseable rep range {:?}, using default", text);
            DEFAULT_REP_RANGE
        }
    }
}

fn default_sets() -> u32 {
    3
}

fn default_reps() -> RepsScheme {
    RepsScheme::RangeString("8-12".into())
}

/// One exercise slot in a workout template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseStructure {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_sets")]
    pub sets: u32,
    #[serde(default = "default_reps")]
    pub reps: RepsScheme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_source: Option<String>,
}

impl ExerciseStructure {
    /// Number of sets to generate for this slot
    pub fn set_count(&self) -> usize {
        match (&self.reps, self.sets) {
            (RepsScheme::PerSet(values), 0) => values.len(),
            (_, sets) => sets as usize,
        }
    }

    /// Target reps for every set of the slot
    pub fn set_targets(&self) -> Vec<u32> {
        (0..self.set_count())
            .map(|i| self.reps.target_for_set(i))
            .collect()
    }

    /// Static template intensity for a set, if any
    pub fn static_intensity(&self, set_index: usize) -> Option<u32> {
        self.intensity
            .as_ref()
            .and_then(|v| v.get(set_index).or_else(|| v.last()))
            .copied()
    }

    /// Explicit template weight for a set, if positive
    pub fn explicit_weight(&self, set_index: usize) -> Option<f64> {
        self.weights
            .as_ref()
            .and_then(|v| v.get(set_index).or_else(|| v.last()))
            .copied()
            .filter(|w| *w > 0.0)
    }
}

/// A single workout of a programme template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutStructure {
    pub day: u32,
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<ExerciseStructure>,
    #[serde(default)]
    pub estimated_duration: u32,
}

// ============================================================================
// Programme Types
// ============================================================================

/// Lifecycle status of a programme
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgrammeStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// What prescribed weights are derived from
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeightBasis {
    OneRepMax,
    #[default]
    LastWorkout,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct WeightCalculationRules {
    #[serde(default)]
    pub basis: WeightBasis,
    #[serde(default)]
    pub training_max_percentage: Option<f64>,
    #[serde(default)]
    pub rounding_increment: Option<f64>,
    #[serde(default)]
    pub minimum_bar_weight: Option<f64>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressionType {
    #[default]
    Linear,
    Wave,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct ProgressionRules {
    #[serde(rename = "type", default)]
    pub progression_type: ProgressionType,
    /// Per cycle week, per set intensity as a 0-1 fraction
    #[serde(default)]
    pub weekly_percentages: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub cycle_length: Option<u32>,
    /// Overrides the configured increment for this programme
    #[serde(default)]
    pub weight_increment: Option<f64>,
    /// Overrides the configured failure threshold for this programme
    #[serde(default)]
    pub failure_threshold: Option<u32>,
}

/// A workout entry of a stored programme template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgrammeWorkout {
    pub id: Uuid,
    pub week: u32,
    pub day: u32,
    /// Raw workout structure JSON, parsed on demand
    pub structure: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Programme {
    pub id: Uuid,
    pub name: String,
    pub duration_weeks: u32,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub status: ProgrammeStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub weight_calculation_rules: WeightCalculationRules,
    #[serde(default)]
    pub progression_rules: Option<ProgressionRules>,
    #[serde(default)]
    pub workouts: Vec<ProgrammeWorkout>,
}

impl Programme {
    /// Workouts in stored template order (week, then day)
    pub fn ordered_workouts(&self) -> Vec<&ProgrammeWorkout> {
        let mut workouts: Vec<_> = self.workouts.iter().collect();
        workouts.sort_by_key(|w| (w.week, w.day));
        workouts
    }

    pub fn find_workout(&self, week: u32, day: u32) -> Option<&ProgrammeWorkout> {
        self.workouts.iter().find(|w| w.week == week && w.day == day)
    }
}

/// Progress of a trainee through one programme
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgrammeProgress {
    pub programme_id: Uuid,
    pub current_week: u32,
    pub current_day: u32,
    pub completed_workouts: u32,
    pub total_workouts: u32,
    pub adherence_percentage: f64,
    pub last_workout_date: Option<DateTime<Utc>>,
}

// ============================================================================
// History and Records
// ============================================================================

/// Outcome of one performed set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetResult {
    pub weight: f64,
    pub reps: u32,
    pub target_reps: u32,
}

impl SetResult {
    pub fn met_target(&self) -> bool {
        self.reps >= self.target_reps
    }
}

/// Per exercise, per session performance
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PerformanceRecord {
    pub id: Uuid,
    pub exercise_name: String,
    pub performed_at: DateTime<Utc>,
    pub sets: Vec<SetResult>,
}

impl PerformanceRecord {
    /// Heaviest weight used in the session
    pub fn working_weight(&self) -> f64 {
        self.sets.iter().map(|s| s.weight).fold(0.0, f64::max)
    }

    /// True when every set reached its target reps
    pub fn met_all_targets(&self) -> bool {
        !self.sets.is_empty() && self.sets.iter().all(SetResult::met_target)
    }
}

/// A set as completed by the trainee
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletedSet {
    pub weight: f64,
    pub reps: u32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    WeightPr,
    #[serde(rename = "ESTIMATED_1RM_PR")]
    Estimated1RmPr,
}

/// A newly achieved best, never mutated once created
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PersonalRecord {
    pub id: Uuid,
    pub exercise_id: String,
    pub weight: f64,
    pub reps: u32,
    pub estimated_1rm: f64,
    pub achieved_at: DateTime<Utc>,
    pub record_type: RecordType,
}

/// Cached estimated one-rep max for an exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TraineeMax {
    pub exercise_id: String,
    pub one_rm_estimate: f64,
    pub date: DateTime<Utc>,
    pub confidence: f64,
    pub context: String,
}

// ============================================================================
// Exercise Catalog Types
// ============================================================================

/// Coarse movement pattern, used for seed weights and increments
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
    Squat,
    Hinge,
    Lunge,
    HorizontalPush,
    VerticalPush,
    HorizontalPull,
    VerticalPull,
    Isolation,
    Core,
}

impl MovementPattern {
    /// Lower-body patterns take the larger progression increment
    pub fn is_lower_body(self) -> bool {
        matches!(
            self,
            MovementPattern::Squat | MovementPattern::Hinge | MovementPattern::Lunge
        )
    }
}

/// A known exercise the engine can prescribe for
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub pattern: MovementPattern,
    pub aliases: Vec<String>,
}

// ============================================================================
// Catalog Type
// ============================================================================

/// The set of exercises a template slot can reference
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub exercises: HashMap<String, Exercise>,
}
