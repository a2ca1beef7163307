//! Programme import from JSON files.
//!
//! Import files describe a programme template without ids or state. Each
//! workout's structure may be given inline as an object or as the raw JSON
//! text stored by other tools.

use crate::engine::load_programme_workouts;
use crate::progress::{activate, ProgrammeStore};
use crate::state::{DataPaths, FileStore};
use crate::{
    Programme, ProgrammeProgress, ProgrammeStatus, ProgrammeWorkout, ProgressionRules, Result,
    WeightCalculationRules,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;

/// Programme file format
#[derive(Debug, Deserialize)]
struct ProgrammeFile {
    name: String,
    duration_weeks: u32,
    #[serde(default)]
    is_custom: bool,
    #[serde(default)]
    weight_calculation_rules: WeightCalculationRules,
    #[serde(default)]
    progression_rules: Option<ProgressionRules>,
    #[serde(default)]
    workouts: Vec<WorkoutEntry>,
}

#[derive(Debug, Deserialize)]
struct WorkoutEntry {
    week: u32,
    day: u32,
    structure: serde_json::Value,
}

/// Stored structure text for an entry
fn structure_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(raw) => raw,
        other => other.to_string(),
    }
}

/// Build a programme from import file contents
///
/// Structures are stored without being checked; see [`import_programme`].
pub fn parse_programme(contents: &str) -> Result<Programme> {
    let file: ProgrammeFile = serde_json::from_str(contents)?;

    let workouts: Vec<ProgrammeWorkout> = file
        .workouts
        .into_iter()
        .map(|entry| ProgrammeWorkout {
            id: Uuid::new_v4(),
            week: entry.week,
            day: entry.day,
            structure: structure_text(entry.structure),
            is_completed: false,
            completed_at: None,
        })
        .collect();

    Ok(Programme {
        id: Uuid::new_v4(),
        name: file.name,
        duration_weeks: file.duration_weeks,
        is_custom: file.is_custom,
        is_active: false,
        status: ProgrammeStatus::NotStarted,
        started_at: None,
        completed_at: None,
        weight_calculation_rules: file.weight_calculation_rules,
        progression_rules: file.progression_rules,
        workouts,
    })
}

/// Result of importing one programme file
#[derive(Clone, Debug)]
pub struct ImportedProgramme {
    pub programme: Programme,
    pub progress: ProgrammeProgress,
    /// (week, day) of stored workouts that do not parse and will be skipped
    pub unreadable: Vec<(u32, u32)>,
}

/// Import a programme file, activate it and persist both
///
/// Unreadable workouts are kept so the programme's total stays true to the
/// file, and generation passes over them.
pub fn import_programme(
    paths: &DataPaths,
    path: &Path,
    now: DateTime<Utc>,
) -> Result<ImportedProgramme> {
    let contents = std::fs::read_to_string(path)?;
    let mut programme = parse_programme(&contents)?;
    let progress = activate(&mut programme, now);

    let loadable: Vec<(u32, u32)> = load_programme_workouts(&programme)
        .into_iter()
        .map(|(w, _)| (w.week, w.day))
        .collect();
    let unreadable: Vec<(u32, u32)> = programme
        .ordered_workouts()
        .into_iter()
        .map(|w| (w.week, w.day))
        .filter(|key| !loadable.contains(key))
        .collect();

    let mut store = FileStore::new(paths.clone());
    store.save_programme(&programme)?;
    store.save_progress(&progress)?;

    tracing::info!(
        "Imported programme {} ({}) with {} workouts",
        programme.name,
        programme.id,
        programme.workouts.len()
    );

    Ok(ImportedProgramme {
        programme,
        progress,
        unreadable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::parse_workout_structure;
    use crate::{ProgressionType, WeightBasis};

    const PROGRAMME: &str = r#"{
        "name": "Wave 3x5",
        "duration_weeks": 2,
        "is_custom": true,
        "weight_calculation_rules": {"basis": "ONE_REP_MAX", "training_max_percentage": 0.9},
        "progression_rules": {"type": "WAVE", "weekly_percentages": [[0.7], [0.8]], "cycle_length": 2},
        "workouts": [
            {"week": 1, "day": 1, "structure": {"day": 1, "name": "A", "exercises": [{"name": "Squat", "sets": 3, "reps": 5}]}},
            {"week": 2, "day": 1, "structure": "{\"day\":1,\"name\":\"A\",\"exercises\":[{\"name\":\"Squat\",\"sets\":3,\"reps\":}]}"}
        ]
    }"#;

    #[test]
    fn test_parse_programme() {
        let programme = parse_programme(PROGRAMME).unwrap();

        assert_eq!(programme.name, "Wave 3x5");
        assert!(programme.is_custom);
        assert_eq!(programme.status, ProgrammeStatus::NotStarted);
        assert_eq!(programme.weight_calculation_rules.basis, WeightBasis::OneRepMax);
        assert_eq!(
            programme.progression_rules.as_ref().map(|r| r.progression_type),
            Some(ProgressionType::Wave)
        );
        assert_eq!(programme.workouts.len(), 2);

        // Inline objects are stored as text and parse back
        let first = parse_workout_structure(&programme.workouts[0].structure).unwrap();
        assert_eq!(first.exercises[0].sets, 3);
        // Raw text is stored unchanged
        assert!(programme.workouts[1].structure.contains("\"reps\":}"));
    }

    #[test]
    fn test_import_reports_unreadable_workouts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(temp_dir.path().join("data"));
        let file = temp_dir.path().join("programme.json");
        std::fs::write(
            &file,
            r#"{"name": "Broken", "duration_weeks": 1, "workouts": [
                {"week": 1, "day": 2, "structure": "{\"day\":2,\"name\":\"B\",\"exercises\":[{\"name\":"},
                {"week": 1, "day": 1, "structure": {"day": 1, "name": "A", "exercises": []}}
            ]}"#,
        )
        .unwrap();

        let imported = import_programme(&paths, &file, Utc::now()).unwrap();
        assert_eq!(imported.unreadable, vec![(1, 2)]);
        assert_eq!(imported.progress.total_workouts, 2);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(parse_programme("{ \"name\": ").is_err());
        assert!(parse_programme(r#"{"duration_weeks": 4}"#).is_err());
    }

    #[test]
    fn test_import_activates_and_persists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(temp_dir.path().join("data"));
        let file = temp_dir.path().join("programme.json");
        std::fs::write(&file, PROGRAMME).unwrap();

        let imported = import_programme(&paths, &file, Utc::now()).unwrap();
        let (programme, progress) = (imported.programme, imported.progress);

        assert_eq!(programme.status, ProgrammeStatus::InProgress);
        assert_eq!(progress.total_workouts, 2);
        assert!(imported.unreadable.is_empty());

        let store = FileStore::new(paths.clone());
        assert_eq!(store.load_programme(programme.id).unwrap(), programme);
        assert_eq!(store.load_progress(programme.id).unwrap(), Some(progress));
    }
}
