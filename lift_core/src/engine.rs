//! Workout generation and completion.
//!
//! Generation runs each template slot through the catalog, the wave overlay
//! and the weight calculator. Completion logs performance, detects records,
//! ratchets maxes and advances programme progress, returning everything it
//! found as a [`CompletionReport`] for the caller to persist.

use crate::prescription::{prescribe, PrescriptionRequest, PrescriptionSource};
use crate::progress::{advance_progress, resync_progress, ProgrammeStore};
use crate::progression::ProgressionDecision;
use crate::records::{detect_records, estimate_one_rm, ratchet_max, MaxUpdate};
use crate::state::{DataPaths, MaxLookup, TrainerState};
use crate::structure::parse_workout_structure;
use crate::wal::{JsonlSink, RecordSink};
use crate::wave::resolve_intensity;
use crate::{
    Catalog, CompletedSet, Config, Error, MovementPattern, PerformanceRecord, PersonalRecord,
    Programme, ProgrammeProgress, ProgrammeWorkout, Result, SetResult, WorkoutStructure,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Read-only inputs to workout generation
pub struct GenerationContext<'a> {
    pub catalog: &'a Catalog,
    pub maxes: &'a dyn MaxLookup,
    /// Performance history, oldest first
    pub history: &'a [PerformanceRecord],
    pub config: &'a Config,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrescribedSet {
    pub set_number: usize,
    pub target_reps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<u32>,
    pub weight: f64,
    pub source: PrescriptionSource,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneratedExercise {
    pub exercise_id: String,
    pub name: String,
    pub pattern: MovementPattern,
    pub rep_range: (u32, u32),
    pub sets: Vec<PrescribedSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Last-workout decision shared by every set, if that basis applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progression: Option<ProgressionDecision>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneratedWorkout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programme_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_id: Option<Uuid>,
    pub week: u32,
    pub day: u32,
    pub name: String,
    pub estimated_duration: u32,
    pub exercises: Vec<GeneratedExercise>,
    /// Slot names that did not resolve to a known exercise
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

/// Generate a workout from a parsed structure
///
/// Slots whose exercise is not in the catalog are left out and listed in
/// `skipped`; they never get a placeholder weight.
pub fn generate_from_structure(
    structure: &WorkoutStructure,
    programme: Option<&Programme>,
    week: u32,
    ctx: &GenerationContext<'_>,
) -> GeneratedWorkout {
    let mut exercises = Vec::with_capacity(structure.exercises.len());
    let mut skipped = Vec::new();

    for slot in &structure.exercises {
        let Some(exercise) = ctx.catalog.resolve(&slot.name) else {
            tracing::warn!("Unknown exercise '{}' in {}, skipping slot", slot.name, structure.name);
            skipped.push(slot.name.clone());
            continue;
        };

        // History is keyed by the canonical name
        let mut slot = slot.clone();
        slot.name = exercise.name.clone();

        let known_max = ctx.maxes.current_max(&exercise.id);
        let mut progression = None;

        let sets = (0..slot.set_count())
            .map(|set_index| {
                let target_reps = slot.reps.target_for_set(set_index);
                let intensity = resolve_intensity(&slot, programme, week, set_index);
                let request = PrescriptionRequest {
                    slot: &slot,
                    set_index,
                    target_reps,
                    intensity,
                    programme,
                    known_max,
                    pattern: exercise.pattern,
                    history: ctx.history,
                };

                let prescribed = prescribe(&request, ctx.config);
                if progression.is_none() {
                    progression = prescribed.progression;
                }

                PrescribedSet {
                    set_number: set_index + 1,
                    target_reps,
                    intensity,
                    weight: prescribed.weight,
                    source: prescribed.source,
                }
            })
            .collect::<Vec<_>>();

        if sets.is_empty() {
            tracing::debug!("{} has no sets in {}", exercise.name, structure.name);
        }

        exercises.push(GeneratedExercise {
            exercise_id: exercise.id.clone(),
            name: exercise.name.clone(),
            pattern: exercise.pattern,
            rep_range: slot.reps.range(),
            sets,
            note: slot.note.clone(),
            progression,
        });
    }

    tracing::info!(
        "Generated {} ({} exercises, {} skipped)",
        structure.name,
        exercises.len(),
        skipped.len()
    );

    GeneratedWorkout {
        programme_id: programme.map(|p| p.id),
        workout_id: None,
        week,
        day: structure.day,
        name: structure.name.clone(),
        estimated_duration: structure.estimated_duration,
        exercises,
        skipped,
    }
}

/// Generate the stored workout at `week`/`day` of a programme
pub fn generate_workout(
    programme: &Programme,
    week: u32,
    day: u32,
    ctx: &GenerationContext<'_>,
) -> Result<GeneratedWorkout> {
    let workout = programme.find_workout(week, day).ok_or_else(|| {
        Error::NotFound(format!(
            "week {} day {} in programme {}",
            week, day, programme.name
        ))
    })?;

    let structure = parse_workout_structure(&workout.structure)?;
    Ok(generate_stored(programme, workout, &structure, ctx))
}

/// Generate the first loadable workout at or after `week`/`day`
///
/// Stored workouts that no longer parse are passed over, so one broken day
/// does not block the rest of the programme.
pub fn generate_next_workout(
    programme: &Programme,
    week: u32,
    day: u32,
    ctx: &GenerationContext<'_>,
) -> Result<GeneratedWorkout> {
    let (workout, structure) = load_programme_workouts(programme)
        .into_iter()
        .find(|(w, _)| (w.week, w.day) >= (week, day))
        .ok_or_else(|| {
            Error::NotFound(format!(
                "loadable workout from week {} day {} in programme {}",
                week, day, programme.name
            ))
        })?;

    if (workout.week, workout.day) != (week, day) {
        tracing::info!(
            "Week {} day {} unavailable, generating week {} day {} instead",
            week,
            day,
            workout.week,
            workout.day
        );
    }
    Ok(generate_stored(programme, workout, &structure, ctx))
}

fn generate_stored(
    programme: &Programme,
    workout: &ProgrammeWorkout,
    structure: &WorkoutStructure,
    ctx: &GenerationContext<'_>,
) -> GeneratedWorkout {
    let mut generated = generate_from_structure(structure, Some(programme), workout.week, ctx);
    generated.workout_id = Some(workout.id);
    generated.day = workout.day;
    generated
}

/// Parse every stored workout of a programme, in template order
///
/// Workouts that cannot be parsed are skipped with a warning.
pub fn load_programme_workouts(
    programme: &Programme,
) -> Vec<(&ProgrammeWorkout, WorkoutStructure)> {
    programme
        .ordered_workouts()
        .into_iter()
        .filter_map(|workout| match parse_workout_structure(&workout.structure) {
            Ok(structure) => Some((workout, structure)),
            Err(e) => {
                tracing::warn!(
                    "Skipping week {} day {} of {}: {}",
                    workout.week,
                    workout.day,
                    programme.name,
                    e
                );
                None
            }
        })
        .collect()
}

/// A finished workout as logged by the trainee
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletedWorkout {
    #[serde(default)]
    pub programme_id: Option<Uuid>,
    /// Template workout this was; the next pending one if unset
    #[serde(default)]
    pub workout_id: Option<Uuid>,
    #[serde(default = "Utc::now")]
    pub completed_at: DateTime<Utc>,
    pub exercises: Vec<CompletedExercise>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletedExercise {
    pub name: String,
    pub sets: Vec<SetResult>,
}

/// Everything a completion produced, consumed once by the caller
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CompletionReport {
    pub performance: Vec<PerformanceRecord>,
    pub records: Vec<PersonalRecord>,
    pub max_updates: Vec<MaxUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgrammeProgress>,
    /// Exercises logged without record tracking (not in the catalog)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

/// Mark a template workout done; false if it already was
fn mark_workout_completed(
    store: &mut dyn ProgrammeStore,
    programme_id: Uuid,
    workout_id: Option<Uuid>,
    at: DateTime<Utc>,
) -> Result<bool> {
    let mut programme = store.load_programme(programme_id)?;

    let target = match workout_id {
        Some(id) => programme.workouts.iter().position(|w| w.id == id),
        None => {
            let next = programme
                .ordered_workouts()
                .into_iter()
                .find(|w| !w.is_completed)
                .map(|w| w.id);
            next.and_then(|id| programme.workouts.iter().position(|w| w.id == id))
        }
    };

    let Some(index) = target else {
        return match workout_id {
            Some(id) => Err(Error::NotFound(format!("workout {} in {}", id, programme.name))),
            None => {
                tracing::warn!("No pending workout left in {}", programme.name);
                Ok(false)
            }
        };
    };

    let workout = &mut programme.workouts[index];
    if workout.is_completed {
        tracing::warn!(
            "Week {} day {} of {} already completed",
            workout.week,
            workout.day,
            programme.name
        );
        return Ok(false);
    }
    workout.is_completed = true;
    workout.completed_at = Some(at);

    store.save_programme(&programme)?;
    Ok(true)
}

/// Process a completed workout
///
/// Records are detected per set against the prior bests in `state`, which
/// are raised as the workout goes so later sets compete with earlier ones.
/// Progress failures are logged and leave `progress` unset.
pub fn complete_workout(
    workout: &CompletedWorkout,
    catalog: &Catalog,
    state: &TrainerState,
    store: Option<&mut dyn ProgrammeStore>,
) -> CompletionReport {
    let mut report = CompletionReport::default();
    let mut best_weights: HashMap<String, f64> = state.best_weights.clone();
    let mut best_estimates: HashMap<String, f64> = state.best_estimates.clone();
    let mut maxes = state.maxes.clone();

    for logged in &workout.exercises {
        let exercise = catalog.resolve(&logged.name);
        let name = exercise.map_or(logged.name.clone(), |e| e.name.clone());

        report.performance.push(PerformanceRecord {
            id: Uuid::new_v4(),
            exercise_name: name,
            performed_at: workout.completed_at,
            sets: logged.sets.clone(),
        });

        let Some(exercise) = exercise else {
            tracing::warn!("Unknown exercise '{}', not tracking records", logged.name);
            report.skipped.push(logged.name.clone());
            continue;
        };

        // Best estimate of this workout feeds the max ratchet
        let mut top: Option<(f64, &SetResult)> = None;

        for set in &logged.sets {
            let completed = CompletedSet {
                weight: set.weight,
                reps: set.reps,
                completed_at: workout.completed_at,
            };

            let records = match detect_records(
                &completed,
                &exercise.id,
                best_weights.get(&exercise.id).copied(),
                best_estimates.get(&exercise.id).copied(),
            ) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!("Skipping set {} x {} of {}: {}", set.weight, set.reps, exercise.name, e);
                    continue;
                }
            };

            for record in &records {
                match record.record_type {
                    crate::RecordType::WeightPr => {
                        best_weights.insert(exercise.id.clone(), record.weight);
                    }
                    crate::RecordType::Estimated1RmPr => {
                        best_estimates.insert(exercise.id.clone(), record.estimated_1rm);
                    }
                }
            }
            report.records.extend(records);

            if let Ok(estimate) = estimate_one_rm(set.weight, set.reps) {
                if top.map_or(true, |(best, _)| estimate > best) {
                    top = Some((estimate, set));
                }
            }
        }

        if let Some((estimate, set)) = top {
            if let Some(update) = ratchet_max(
                maxes.get(&exercise.id),
                &exercise.id,
                estimate,
                set.weight,
                set.reps,
                workout.completed_at,
            ) {
                maxes.insert(exercise.id.clone(), update.max.clone());
                report.max_updates.push(update);
            }
        }
    }

    if let (Some(programme_id), Some(store)) = (workout.programme_id, store) {
        let advanced = mark_workout_completed(store, programme_id, workout.workout_id, workout.completed_at)
            .and_then(|newly_completed| {
                if newly_completed {
                    advance_progress(store, programme_id, workout.completed_at).map(Some)
                } else {
                    // Nothing new to count, but an earlier event may have lost its write
                    resync_progress(store, programme_id, workout.completed_at)
                }
            });

        match advanced {
            Ok(progress) => report.progress = progress,
            Err(e) => tracing::warn!("Failed to update progress for {}: {}", programme_id, e),
        }
    }

    tracing::info!(
        "Completed workout: {} exercises, {} records, {} max updates",
        report.performance.len(),
        report.records.len(),
        report.max_updates.len()
    );

    report
}

/// Persist a completion report to the data directory
///
/// Performance and records go to their WALs; bests and maxes are folded
/// into the state file, reloaded fresh so progress written during
/// completion is kept.
pub fn persist_report(paths: &DataPaths, report: &CompletionReport) -> Result<()> {
    let mut performance = JsonlSink::new(paths.performance_wal());
    for record in &report.performance {
        performance.append(record)?;
    }

    let mut records = JsonlSink::new(paths.records_wal());
    for record in &report.records {
        records.append(record)?;
    }

    TrainerState::update(&paths.state(), |state| {
        state.apply_records(&report.records);
        state.apply_max_updates(&report.max_updates);
        Ok(())
    })?;

    tracing::debug!("Persisted completion report to {:?}", paths.root());
    Ok(())
}
