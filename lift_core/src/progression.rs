//! Session-to-session progression on a last-workout basis.
//!
//! The decision is recomputed from the full performance history on every
//! call; nothing is stored between calls:
//! - All sets of the latest session hit their targets: increase
//! - Missed targets: repeat, until the failure streak reaches the
//!   threshold, which deloads and resets the streak
//! - No history: start from the seed weight

use crate::config::ProgressionConfig;
use crate::history::history_for_exercise;
use crate::prescription::round_weight;
use crate::{MovementPattern, PerformanceRecord, Programme};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressionAction {
    Increase,
    Repeat,
    Deload,
}

/// Next-session weight and why
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgressionDecision {
    pub weight: f64,
    pub action: ProgressionAction,
    pub reason: String,
    pub is_deload: bool,
}

/// Increment for a pattern, unless the programme overrides it
fn increment_for(
    pattern: MovementPattern,
    programme: Option<&Programme>,
    config: &ProgressionConfig,
) -> f64 {
    programme
        .and_then(|p| p.progression_rules.as_ref())
        .and_then(|r| r.weight_increment)
        .unwrap_or(if pattern.is_lower_body() {
            config.lower_body_increment
        } else {
            config.upper_body_increment
        })
}

fn threshold_for(programme: Option<&Programme>, config: &ProgressionConfig) -> u32 {
    programme
        .and_then(|p| p.progression_rules.as_ref())
        .and_then(|r| r.failure_threshold)
        .unwrap_or(config.failure_threshold)
        .max(1)
}

/// Decide the next working weight for an exercise
///
/// `history` is ordered oldest to newest; records for other exercises are
/// ignored. `seed_weight` is used when the exercise has never been done.
pub fn compute_progression(
    exercise_name: &str,
    programme: Option<&Programme>,
    history: &[PerformanceRecord],
    seed_weight: f64,
    pattern: MovementPattern,
    config: &ProgressionConfig,
) -> ProgressionDecision {
    let sessions: Vec<&PerformanceRecord> = history_for_exercise(history, exercise_name)
        .into_iter()
        .filter(|r| !r.sets.is_empty())
        .collect();

    let Some(last) = sessions.last() else {
        tracing::debug!("No history for {}, seeding at {}", exercise_name, seed_weight);
        return ProgressionDecision {
            weight: round_weight(seed_weight),
            action: ProgressionAction::Repeat,
            reason: "No previous sessions, starting weight".into(),
            is_deload: false,
        };
    };

    let threshold = threshold_for(programme, config);

    // Replay the streak so a deload resets it exactly as it would have live
    let mut streak = 0;
    let mut deload_due = false;
    for session in &sessions {
        if session.met_all_targets() {
            streak = 0;
            deload_due = false;
        } else {
            streak += 1;
            deload_due = streak >= threshold;
            if deload_due {
                streak = 0;
            }
        }
    }

    let previous = last.working_weight();

    let decision = if last.met_all_targets() {
        let increment = increment_for(pattern, programme, config);
        ProgressionDecision {
            weight: round_weight(previous + increment),
            action: ProgressionAction::Increase,
            reason: format!("Hit all target reps at {}, adding {}", previous, increment),
            is_deload: false,
        }
    } else if deload_due {
        ProgressionDecision {
            weight: round_weight(previous * (1.0 - config.deload_fraction)),
            action: ProgressionAction::Deload,
            reason: format!(
                "Missed target reps {} sessions in a row, deloading {}%",
                threshold,
                (config.deload_fraction * 100.0).round()
            ),
            is_deload: true,
        }
    } else {
        ProgressionDecision {
            weight: round_weight(previous),
            action: ProgressionAction::Repeat,
            reason: format!(
                "Missed target reps at {} ({} of {} before deload)",
                previous, streak, threshold
            ),
            is_deload: false,
        }
    };

    tracing::debug!(
        "Progression for {}: {:?} -> {}",
        exercise_name,
        decision.action,
        decision.weight
    );

    decision
}
