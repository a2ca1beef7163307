//! Wave (periodized) intensity overlay.
//!
//! Wave programmes repeat a multi-week cycle of per-set intensities on top
//! of an otherwise static template. Lookups that fall outside the table fall
//! through to the template's own intensity.

use crate::{ExerciseStructure, Programme, ProgressionRules, ProgressionType};

/// Convert a table entry to an integer percentage
///
/// Entries are 0-1 fractions; anything above 1 is taken as a percentage.
fn to_percentage(value: f64) -> Option<u32> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    let percent = if value <= 1.0 { value * 100.0 } else { value };
    Some(percent.round() as u32)
}

/// Cycle-specific intensity for `week` (1-based) and `set_index`
pub fn wave_intensity(rules: &ProgressionRules, week: u32, set_index: usize) -> Option<u32> {
    if rules.progression_type != ProgressionType::Wave {
        return None;
    }

    let table = rules.weekly_percentages.as_ref()?;
    let cycle_length = rules.cycle_length.filter(|len| *len > 0)?;

    let cycle_week = (week.saturating_sub(1) % cycle_length) as usize;
    let intensity = table
        .get(cycle_week)
        .and_then(|row| row.get(set_index))
        .copied()
        .and_then(to_percentage);

    if intensity.is_none() {
        tracing::debug!(
            "No wave entry for week {} (cycle week {}) set {}",
            week,
            cycle_week,
            set_index + 1
        );
    }

    intensity
}

/// Intensity for a set: the wave override if any, else the template's
pub fn resolve_intensity(
    slot: &ExerciseStructure,
    programme: Option<&Programme>,
    week: u32,
    set_index: usize,
) -> Option<u32> {
    programme
        .and_then(|p| p.progression_rules.as_ref())
        .and_then(|rules| wave_intensity(rules, week, set_index))
        .or_else(|| slot.static_intensity(set_index))
}
