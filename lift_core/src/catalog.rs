//! Default catalog of exercises and movement patterns.
//!
//! Template slots reference exercises by name. This module provides the
//! built-in exercises, name resolution, pattern classification for custom
//! exercises, and the per-pattern seed weights used when nothing is known
//! about a trainee.

use crate::config::CustomExercise;
use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog with built-in exercises
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference. This function is retained for custom catalog creation.
pub fn build_default_catalog() -> Catalog {
    build_default_catalog_internal()
}

fn build_default_catalog_internal() -> Catalog {
    let entries: &[(&str, &str, MovementPattern, &[&str])] = &[
        ("back_squat", "Squat", MovementPattern::Squat, &["back squat", "barbell squat"]),
        ("front_squat", "Front Squat", MovementPattern::Squat, &[]),
        ("leg_press", "Leg Press", MovementPattern::Squat, &[]),
        ("deadlift", "Deadlift", MovementPattern::Hinge, &["conventional deadlift"]),
        ("romanian_deadlift", "Romanian Deadlift", MovementPattern::Hinge, &["rdl"]),
        ("hip_thrust", "Hip Thrust", MovementPattern::Hinge, &["barbell hip thrust"]),
        ("walking_lunge", "Walking Lunge", MovementPattern::Lunge, &["lunge", "lunges"]),
        ("split_squat", "Bulgarian Split Squat", MovementPattern::Lunge, &["split squat"]),
        ("bench_press", "Bench Press", MovementPattern::HorizontalPush, &["barbell bench press", "bench"]),
        ("incline_bench_press", "Incline Bench Press", MovementPattern::HorizontalPush, &["incline bench"]),
        ("dumbbell_bench_press", "Dumbbell Bench Press", MovementPattern::HorizontalPush, &["db bench press"]),
        ("overhead_press", "Overhead Press", MovementPattern::VerticalPush, &["ohp", "military press", "shoulder press"]),
        ("barbell_row", "Barbell Row", MovementPattern::HorizontalPull, &["bent over row", "row"]),
        ("seated_cable_row", "Seated Cable Row", MovementPattern::HorizontalPull, &["cable row"]),
        ("pull_up", "Pull-up", MovementPattern::VerticalPull, &["pullup", "pull up", "chin-up", "chin up"]),
        ("lat_pulldown", "Lat Pulldown", MovementPattern::VerticalPull, &["pulldown"]),
        ("bicep_curl", "Bicep Curl", MovementPattern::Isolation, &["barbell curl", "curl", "dumbbell curl"]),
        ("tricep_extension", "Tricep Extension", MovementPattern::Isolation, &["triceps extension", "skull crusher"]),
        ("lateral_raise", "Lateral Raise", MovementPattern::Isolation, &["side raise"]),
        ("leg_curl", "Leg Curl", MovementPattern::Isolation, &["hamstring curl"]),
        ("leg_extension", "Leg Extension", MovementPattern::Isolation, &[]),
        ("calf_raise", "Calf Raise", MovementPattern::Isolation, &[]),
        ("plank", "Plank", MovementPattern::Core, &[]),
        ("cable_crunch", "Cable Crunch", MovementPattern::Core, &[]),
    ];

    let exercises = entries
        .iter()
        .map(|(id, name, pattern, aliases)| {
            (
                id.to_string(),
                Exercise {
                    id: id.to_string(),
                    name: name.to_string(),
                    pattern: *pattern,
                    aliases: aliases.iter().map(|a| a.to_string()).collect(),
                },
            )
        })
        .collect::<HashMap<_, _>>();

    Catalog { exercises }
}

/// Lowercase and collapse separators so "Pull-Up" and "pull_up" compare equal
fn normalize(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Infer a movement pattern from an exercise name
///
/// Order matters: "split squat" is a lunge, "leg curl" is isolation.
pub fn classify_pattern(name: &str) -> MovementPattern {
    let name = normalize(name);
    let has = |keywords: &[&str]| keywords.iter().any(|k| name.contains(k));

    if has(&["curl", "raise", "extension", "fly", "flye", "kickback", "shrug"]) {
        MovementPattern::Isolation
    } else if has(&["lunge", "split squat", "step up"]) {
        MovementPattern::Lunge
    } else if has(&["squat", "leg press"]) {
        MovementPattern::Squat
    } else if has(&["deadlift", "rdl", "hinge", "hip thrust", "good morning", "swing"]) {
        MovementPattern::Hinge
    } else if has(&["overhead", "shoulder press", "military", "ohp", "push press"]) {
        MovementPattern::VerticalPush
    } else if has(&["bench", "push up", "pushup", "dip", "chest press"]) {
        MovementPattern::HorizontalPush
    } else if has(&["pull up", "pullup", "chin", "pulldown"]) {
        MovementPattern::VerticalPull
    } else if has(&["row"]) {
        MovementPattern::HorizontalPull
    } else if has(&["plank", "crunch", "sit up", "ab ", "core", "rollout"]) {
        MovementPattern::Core
    } else {
        MovementPattern::Isolation
    }
}

/// Starting weight for a pattern when no max or history exists
pub fn seed_weight(pattern: MovementPattern) -> f64 {
    match pattern {
        MovementPattern::Squat => 60.0,
        MovementPattern::Hinge => 70.0,
        MovementPattern::Lunge => 20.0,
        MovementPattern::HorizontalPush => 40.0,
        MovementPattern::VerticalPush => 30.0,
        MovementPattern::HorizontalPull => 40.0,
        MovementPattern::VerticalPull => 35.0,
        MovementPattern::Isolation => 10.0,
        MovementPattern::Core => 5.0,
    }
}

impl Catalog {
    /// Default catalog extended with configured custom exercises
    pub fn with_custom(custom: &[CustomExercise]) -> Self {
        let mut catalog = get_default_catalog().clone();
        for entry in custom {
            let pattern = entry
                .pattern
                .unwrap_or_else(|| classify_pattern(&entry.name));
            catalog.exercises.insert(
                entry.id.clone(),
                Exercise {
                    id: entry.id.clone(),
                    name: entry.name.clone(),
                    pattern,
                    aliases: Vec::new(),
                },
            );
        }
        catalog
    }

    /// Resolve a template exercise reference by id, name or alias
    pub fn resolve(&self, reference: &str) -> Option<&Exercise> {
        let wanted = normalize(reference);
        if wanted.is_empty() {
            return None;
        }

        if let Some(exercise) = self.exercises.get(reference) {
            return Some(exercise);
        }

        self.exercises.values().find(|e| {
            normalize(&e.id) == wanted
                || normalize(&e.name) == wanted
                || e.aliases.iter().any(|a| normalize(a) == wanted)
        })
    }

    /// Validate the catalog structure
    ///
    /// Returns a list of validation errors, or an empty list if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen_names: HashMap<String, &str> = HashMap::new();

        for (key, exercise) in &self.exercises {
            if key != &exercise.id {
                errors.push(format!(
                    "Exercise key '{}' does not match id '{}'",
                    key, exercise.id
                ));
            }
            if exercise.name.trim().is_empty() {
                errors.push(format!("Exercise '{}' has an empty name", exercise.id));
            }

            for name in std::iter::once(&exercise.name).chain(exercise.aliases.iter()) {
                let normalized = normalize(name);
                if let Some(other) = seen_names.insert(normalized.clone(), &exercise.id) {
                    if other != exercise.id {
                        errors.push(format!(
                            "Name '{}' is ambiguous between '{}' and '{}'",
                            normalized, other, exercise.id
                        ));
                    }
                }
            }
        }

        errors
    }
}
