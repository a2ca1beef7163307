//! Weight prescription for a single set of a template slot.
//!
//! Decision order, first match wins:
//! 1. One-rep-max basis: percentage of a training max, floored to the
//!    programme's plate increment and clamped to the empty bar
//! 2. Last-workout basis: delegated to the progression engine
//! 3. A specific (non-generic) suggested weight on the slot
//! 4. An explicit weight written into the template
//! 5. Generic estimate from the rep range, known max or pattern seed
//!
//! Every weight leaving this module passes through [`round_weight`].

use crate::catalog::seed_weight;
use crate::progression::{compute_progression, ProgressionAction, ProgressionDecision};
use crate::{
    Config, ExerciseStructure, MovementPattern, PerformanceRecord, Programme, RepsScheme,
    WeightBasis,
};
use serde::{Deserialize, Serialize};

/// Display granularity shared by every weight value
pub const DISPLAY_INCREMENT: f64 = 0.25;

/// Weight source tags that carry no information about the trainee
const GENERIC_SOURCES: &[&str] = &["", "generic", "default", "estimated", "fallback", "none"];

/// Round to the nearest display increment
///
/// Idempotent: `round_weight(round_weight(x)) == round_weight(x)`.
pub fn round_weight(weight: f64) -> f64 {
    if !weight.is_finite() {
        return 0.0;
    }
    (weight / DISPLAY_INCREMENT).round() * DISPLAY_INCREMENT
}

/// Floor to a multiple of `increment`, tolerating float noise just below it
fn floor_to_increment(weight: f64, increment: f64) -> f64 {
    if increment <= 0.0 {
        return weight;
    }
    ((weight / increment) + 1e-9).floor() * increment
}

/// Coarse goal inferred from a rep count
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrainingGoal {
    Strength,
    Hypertrophy,
    Endurance,
}

impl TrainingGoal {
    pub fn from_reps(reps: u32) -> Self {
        match reps {
            0..=5 => TrainingGoal::Strength,
            6..=12 => TrainingGoal::Hypertrophy,
            _ => TrainingGoal::Endurance,
        }
    }

    /// Share of the pattern seed weight used when no max is known
    fn seed_factor(self) -> f64 {
        match self {
            TrainingGoal::Strength => 1.0,
            TrainingGoal::Hypertrophy => 0.8,
            TrainingGoal::Endurance => 0.6,
        }
    }
}

/// Typical percentage of 1RM that can be lifted for `reps`
pub fn percent_of_max(reps: u32) -> f64 {
    match reps {
        0 | 1 => 100.0,
        2 => 95.0,
        3 => 93.0,
        4 => 90.0,
        5 => 87.0,
        6 => 85.0,
        7 => 83.0,
        8 => 80.0,
        9 => 77.0,
        10 => 75.0,
        11 => 73.0,
        12 => 70.0,
        13..=15 => 65.0,
        16..=20 => 60.0,
        _ => 55.0,
    }
}

/// Where a prescribed weight came from
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrescriptionSource {
    OneRepMax { training_max: f64, intensity: u32 },
    LastWorkout { action: ProgressionAction },
    Suggested { source: String },
    Template,
    Estimated { goal: TrainingGoal, from_max: bool },
}

/// A weight for one set plus its provenance
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrescribedWeight {
    pub weight: f64,
    pub source: PrescriptionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progression: Option<ProgressionDecision>,
}

/// Everything needed to prescribe one set
#[derive(Clone, Copy, Debug)]
pub struct PrescriptionRequest<'a> {
    pub slot: &'a ExerciseStructure,
    pub set_index: usize,
    pub target_reps: u32,
    /// Template intensity, already overridden by the wave overlay if any
    pub intensity: Option<u32>,
    pub programme: Option<&'a Programme>,
    pub known_max: Option<f64>,
    pub pattern: MovementPattern,
    /// Performance history, most recent last
    pub history: &'a [PerformanceRecord],
}

/// Generic estimate from the slot's rep range
///
/// With a known max this is a percentage-of-max lookup at the range
/// midpoint; without one it scales the pattern's seed weight by goal.
pub fn estimate_weight(
    reps: &RepsScheme,
    known_max: Option<f64>,
    pattern: MovementPattern,
) -> (f64, TrainingGoal) {
    let midpoint = reps.midpoint().max(1);
    let goal = TrainingGoal::from_reps(midpoint);

    let weight = match known_max.filter(|m| *m > 0.0) {
        Some(max) => max * percent_of_max(midpoint) / 100.0,
        None => seed_weight(pattern) * goal.seed_factor(),
    };

    (round_weight(weight), goal)
}

fn is_specific_source(source: Option<&str>) -> Option<&str> {
    source
        .map(str::trim)
        .filter(|s| !GENERIC_SOURCES.contains(&s.to_lowercase().as_str()))
}

/// Prescribe the weight for one set
pub fn prescribe(request: &PrescriptionRequest<'_>, config: &Config) -> PrescribedWeight {
    let slot = request.slot;

    if let Some(programme) = request.programme {
        let rules = &programme.weight_calculation_rules;

        match rules.basis {
            WeightBasis::OneRepMax => {
                if let (Some(intensity), Some(max)) =
                    (request.intensity, request.known_max.filter(|m| *m > 0.0))
                {
                    let training_max = max * rules.training_max_percentage.unwrap_or(1.0);
                    let raw = training_max * f64::from(intensity) / 100.0;
                    let increment = rules
                        .rounding_increment
                        .unwrap_or(config.prescription.rounding_increment);
                    let minimum = rules
                        .minimum_bar_weight
                        .unwrap_or(config.prescription.minimum_bar_weight);
                    let weight = floor_to_increment(raw, increment).max(minimum);

                    tracing::debug!(
                        "{} set {}: {}% of training max {} -> {}",
                        slot.name,
                        request.set_index + 1,
                        intensity,
                        training_max,
                        weight
                    );

                    return PrescribedWeight {
                        weight: round_weight(weight),
                        source: PrescriptionSource::OneRepMax {
                            training_max: round_weight(training_max),
                            intensity,
                        },
                        progression: None,
                    };
                }
            }
            WeightBasis::LastWorkout => {
                let (seed, _) = estimate_weight(&slot.reps, request.known_max, request.pattern);
                let decision = compute_progression(
                    &slot.name,
                    Some(programme),
                    request.history,
                    seed,
                    request.pattern,
                    &config.progression,
                );
                return PrescribedWeight {
                    weight: round_weight(decision.weight),
                    source: PrescriptionSource::LastWorkout {
                        action: decision.action,
                    },
                    progression: Some(decision),
                };
            }
        }
    }

    if let Some(suggested) = slot.suggested_weight.filter(|w| *w > 0.0) {
        if let Some(source) = is_specific_source(slot.weight_source.as_deref()) {
            return PrescribedWeight {
                weight: round_weight(suggested),
                source: PrescriptionSource::Suggested {
                    source: source.to_string(),
                },
                progression: None,
            };
        }
    }

    if let Some(weight) = slot.explicit_weight(request.set_index) {
        return PrescribedWeight {
            weight: round_weight(weight),
            source: PrescriptionSource::Template,
            progression: None,
        };
    }

    let (weight, goal) = estimate_weight(&slot.reps, request.known_max, request.pattern);
    PrescribedWeight {
        weight,
        source: PrescriptionSource::Estimated {
            goal,
            from_max: request.known_max.is_some_and(|m| m > 0.0),
        },
        progression: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SetResult, WeightCalculationRules};
    use chrono::{Duration, Utc};
    use rstest::rstest;
    use uuid::Uuid;

    fn slot(name: &str, reps: RepsScheme) -> ExerciseStructure {
        ExerciseStructure {
            name: name.into(),
            sets: 3,
            reps,
            intensity: None,
            weights: None,
            note: None,
            suggested_weight: None,
            weight_source: None,
        }
    }

    fn programme(basis: WeightBasis) -> Programme {
        Programme {
            id: Uuid::new_v4(),
            name: "Test".into(),
            duration_weeks: 4,
            is_custom: false,
            is_active: true,
            status: crate::ProgrammeStatus::InProgress,
            started_at: None,
            completed_at: None,
            weight_calculation_rules: WeightCalculationRules {
                basis,
                training_max_percentage: Some(1.0),
                rounding_increment: Some(2.5),
                minimum_bar_weight: None,
            },
            progression_rules: None,
            workouts: vec![],
        }
    }

    fn request<'a>(
        slot: &'a ExerciseStructure,
        programme: Option<&'a Programme>,
        intensity: Option<u32>,
        known_max: Option<f64>,
        history: &'a [PerformanceRecord],
    ) -> PrescriptionRequest<'a> {
        PrescriptionRequest {
            slot,
            set_index: 0,
            target_reps: slot.reps.target_for_set(0),
            intensity,
            programme,
            known_max,
            pattern: MovementPattern::Squat,
            history,
        }
    }

    #[test]
    fn test_one_rep_max_floors_to_increment() {
        let slot = slot("Squat", RepsScheme::Single(1));
        let programme = programme(WeightBasis::OneRepMax);
        let req = request(&slot, Some(&programme), Some(100), Some(102.0), &[]);

        let prescribed = prescribe(&req, &Config::default());

        assert_eq!(prescribed.weight, 100.0);
        assert!(matches!(
            prescribed.source,
            PrescriptionSource::OneRepMax { training_max, intensity: 100 } if training_max == 102.0
        ));
    }

    #[test]
    fn test_one_rep_max_applies_training_max_percentage() {
        let slot = slot("Squat", RepsScheme::Single(5));
        let mut programme = programme(WeightBasis::OneRepMax);
        programme.weight_calculation_rules.training_max_percentage = Some(0.9);
        let req = request(&slot, Some(&programme), Some(75), Some(150.0), &[]);

        // 150 * 0.9 = 135, * 0.75 = 101.25, floored to 2.5 -> 100
        assert_eq!(prescribe(&req, &Config::default()).weight, 100.0);
    }

    #[test]
    fn test_one_rep_max_clamps_to_minimum_bar() {
        let slot = slot("Overhead Press", RepsScheme::Single(5));
        let programme = programme(WeightBasis::OneRepMax);
        let req = request(&slot, Some(&programme), Some(40), Some(30.0), &[]);

        assert_eq!(prescribe(&req, &Config::default()).weight, 20.0);
    }

    #[test]
    fn test_one_rep_max_without_max_falls_through() {
        let mut slot = slot("Squat", RepsScheme::Single(5));
        slot.suggested_weight = Some(82.5);
        slot.weight_source = Some("coach_ai".into());
        let programme = programme(WeightBasis::OneRepMax);
        let req = request(&slot, Some(&programme), Some(80), None, &[]);

        let prescribed = prescribe(&req, &Config::default());
        assert_eq!(prescribed.weight, 82.5);
        assert!(matches!(prescribed.source, PrescriptionSource::Suggested { .. }));
    }

    #[test]
    fn test_last_workout_basis_delegates_to_progression() {
        let slot = slot("Squat", RepsScheme::Single(5));
        let programme = programme(WeightBasis::LastWorkout);
        let history = vec![PerformanceRecord {
            id: Uuid::new_v4(),
            exercise_name: "Squat".into(),
            performed_at: Utc::now() - Duration::days(2),
            sets: vec![
                SetResult { weight: 100.0, reps: 5, target_reps: 5 },
                SetResult { weight: 100.0, reps: 5, target_reps: 5 },
            ],
        }];
        let req = request(&slot, Some(&programme), None, None, &history);

        let prescribed = prescribe(&req, &Config::default());

        assert_eq!(prescribed.weight, 105.0);
        assert_eq!(
            prescribed.source,
            PrescriptionSource::LastWorkout {
                action: ProgressionAction::Increase
            }
        );
        assert!(prescribed.progression.is_some());
    }

    #[rstest]
    #[case(Some("generic"))]
    #[case(Some("DEFAULT"))]
    #[case(Some(""))]
    #[case(None)]
    fn test_generic_suggestion_is_ignored(#[case] source: Option<&str>) {
        let mut slot = slot("Squat", RepsScheme::Single(5));
        slot.suggested_weight = Some(82.5);
        slot.weight_source = source.map(String::from);
        let req = request(&slot, None, None, None, &[]);

        let prescribed = prescribe(&req, &Config::default());
        assert!(matches!(prescribed.source, PrescriptionSource::Estimated { .. }));
    }

    #[test]
    fn test_explicit_template_weight() {
        let mut slot = slot("Bench Press", RepsScheme::Single(5));
        slot.weights = Some(vec![60.0, 62.5]);
        let mut req = request(&slot, None, None, None, &[]);
        req.set_index = 2;

        let prescribed = prescribe(&req, &Config::default());
        assert_eq!(prescribed.weight, 62.5);
        assert_eq!(prescribed.source, PrescriptionSource::Template);
    }

    #[test]
    fn test_estimate_from_known_max() {
        let slot = slot("Squat", RepsScheme::Range { min: 8, max: 12 });
        let req = request(&slot, None, None, Some(100.0), &[]);

        let prescribed = prescribe(&req, &Config::default());

        // midpoint 10 reps -> 75% of max
        assert_eq!(prescribed.weight, 75.0);
        assert_eq!(
            prescribed.source,
            PrescriptionSource::Estimated {
                goal: TrainingGoal::Hypertrophy,
                from_max: true
            }
        );
    }

    #[test]
    fn test_estimate_from_seed_without_max() {
        let (weight, goal) =
            estimate_weight(&RepsScheme::Single(5), None, MovementPattern::Squat);
        assert_eq!(goal, TrainingGoal::Strength);
        assert_eq!(weight, 60.0);

        let (weight, goal) =
            estimate_weight(&RepsScheme::Single(15), None, MovementPattern::Squat);
        assert_eq!(goal, TrainingGoal::Endurance);
        assert_eq!(weight, 36.0);
    }

    #[rstest]
    #[case(0.0)]
    #[case(0.1)]
    #[case(0.125)]
    #[case(57.37)]
    #[case(101.2499)]
    #[case(333.333)]
    #[case(-7.6)]
    fn test_round_weight_idempotent(#[case] x: f64) {
        let once = round_weight(x);
        assert_eq!(round_weight(once), once);
        assert!((once - x).abs() <= DISPLAY_INCREMENT / 2.0 + 1e-9);
    }

    #[test]
    fn test_round_weight_grid() {
        for i in 0..4000 {
            let x = f64::from(i) * 0.0731;
            let once = round_weight(x);
            assert_eq!(round_weight(once), once, "not idempotent at {}", x);
            assert_eq!((once / DISPLAY_INCREMENT).fract(), 0.0);
        }
    }

    #[test]
    fn test_round_weight_non_finite() {
        assert_eq!(round_weight(f64::NAN), 0.0);
        assert_eq!(round_weight(f64::INFINITY), 0.0);
    }
}
