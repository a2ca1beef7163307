//! Personal record detection and estimated one-rep max tracking.
//!
//! Estimates use the Brzycki formula, which is only defined below 37 reps.
//! The cached max for an exercise is a ratchet: a new estimate replaces it
//! only when strictly higher.

use crate::prescription::round_weight;
use crate::{CompletedSet, Error, PersonalRecord, RecordType, Result, TraineeMax};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest rep count the estimate accepts
pub const MAX_ESTIMABLE_REPS: u32 = 36;

fn check_domain(weight: f64, reps: u32) -> Result<()> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(Error::OutOfDomain(format!("weight {} is not a valid load", weight)));
    }
    if reps == 0 || reps > MAX_ESTIMABLE_REPS {
        return Err(Error::OutOfDomain(format!(
            "cannot estimate a 1RM from {} reps (1-{})",
            reps, MAX_ESTIMABLE_REPS
        )));
    }
    Ok(())
}

/// Estimated one-rep max for `weight` lifted for `reps`
pub fn estimate_one_rm(weight: f64, reps: u32) -> Result<f64> {
    check_domain(weight, reps)?;
    if reps == 1 {
        return Ok(weight);
    }
    Ok(weight * 36.0 / (37.0 - f64::from(reps)))
}

/// Inverse of [`estimate_one_rm`]: the load expected for `reps` at a given max
pub fn weight_for_reps(one_rm: f64, reps: u32) -> Result<f64> {
    check_domain(one_rm, reps)?;
    if reps == 1 {
        return Ok(one_rm);
    }
    Ok(one_rm * (37.0 - f64::from(reps)) / 36.0)
}

/// How much an estimate from `reps` can be trusted (0-1)
pub fn estimate_confidence(reps: u32) -> f64 {
    match reps {
        1 => 1.0,
        2..=3 => 0.95,
        4..=5 => 0.9,
        6..=10 => 0.75,
        _ => 0.5,
    }
}

/// Classify a completed set against the prior bests for the exercise
///
/// Missing priors count as zero, so the first logged set of an exercise
/// is a record. A set can produce none, one or both record kinds.
pub fn detect_records(
    set: &CompletedSet,
    exercise_id: &str,
    prior_best_weight: Option<f64>,
    prior_best_estimate: Option<f64>,
) -> Result<Vec<PersonalRecord>> {
    let estimated = round_weight(estimate_one_rm(set.weight, set.reps)?);
    let weight = round_weight(set.weight);
    let mut records = Vec::new();

    let record = |record_type| PersonalRecord {
        id: Uuid::new_v4(),
        exercise_id: exercise_id.to_string(),
        weight,
        reps: set.reps,
        estimated_1rm: estimated,
        achieved_at: set.completed_at,
        record_type,
    };

    if weight > prior_best_weight.unwrap_or(0.0) {
        records.push(record(RecordType::WeightPr));
    }
    if estimated > prior_best_estimate.unwrap_or(0.0) {
        records.push(record(RecordType::Estimated1RmPr));
    }

    if !records.is_empty() {
        tracing::info!(
            "New record for {}: {} x {} (e1RM {})",
            exercise_id,
            weight,
            set.reps,
            estimated
        );
    }

    Ok(records)
}

/// A raised trainee max, for the caller to persist
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MaxUpdate {
    pub exercise_id: String,
    pub previous: Option<f64>,
    pub max: TraineeMax,
}

/// Raise the stored max if `estimate` strictly exceeds it
pub fn ratchet_max(
    existing: Option<&TraineeMax>,
    exercise_id: &str,
    estimate: f64,
    weight: f64,
    reps: u32,
    at: DateTime<Utc>,
) -> Option<MaxUpdate> {
    let estimate = round_weight(estimate);
    let previous = existing.map(|m| m.one_rm_estimate);

    if previous.is_some_and(|p| estimate <= p) {
        tracing::debug!(
            "Estimate {} for {} does not beat stored max {:?}",
            estimate,
            exercise_id,
            previous
        );
        return None;
    }

    Some(MaxUpdate {
        exercise_id: exercise_id.to_string(),
        previous,
        max: TraineeMax {
            exercise_id: exercise_id.to_string(),
            one_rm_estimate: estimate,
            date: at,
            confidence: estimate_confidence(reps),
            context: format!("Estimated from {} x {}", round_weight(weight), reps),
        },
    })
}
