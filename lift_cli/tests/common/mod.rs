//! Shared helpers for the lift CLI tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const PROGRAMME: &str = r#"{
    "name": "Test 5x5",
    "duration_weeks": 1,
    "workouts": [
        {"week": 1, "day": 1, "structure": {"day": 1, "name": "Day A", "estimatedDuration": 45, "exercises": [
            {"name": "Squat", "sets": 3, "reps": 5},
            {"name": "Bench Press", "sets": 3, "reps": 5}
        ]}},
        {"week": 1, "day": 2, "structure": {"day": 2, "name": "Day B", "estimatedDuration": 30, "exercises": [
            {"name": "Deadlift", "sets": 1, "reps": 5},
            {"name": "Zercher Carry", "sets": 2, "reps": 30}
        ]}}
    ]
}"#;

/// Isolated data and config directories for one test
pub struct TestEnv {
    pub temp_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            temp_dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.temp_dir.path().join("data")
    }

    /// CLI command pointed at this environment
    pub fn cli(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lift"));
        cmd.env("XDG_CONFIG_HOME", self.temp_dir.path().join("config"))
            .env("RUST_LOG", "warn")
            .arg("--data-dir")
            .arg(self.data_dir());
        cmd
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("Failed to write test file");
        path
    }

    /// Import [`PROGRAMME`] and return its id
    pub fn import_programme(&self) -> String {
        self.import_file(PROGRAMME)
    }

    pub fn import_file(&self, contents: &str) -> String {
        let file = self.write_file("programme.json", contents);
        let output = self
            .cli()
            .arg("import")
            .arg(&file)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let stdout = String::from_utf8_lossy(&output);
        stdout
            .lines()
            .find_map(|line| line.trim().strip_prefix("Id: "))
            .expect("import should print the programme id")
            .to_string()
    }

    /// Log a workout of `sets` x `reps` at `weight` for each exercise
    pub fn complete(&self, programme_id: Option<&str>, exercises: &[(&str, f64, u32)]) -> String {
        let exercises: Vec<_> = exercises
            .iter()
            .map(|(name, weight, reps)| {
                serde_json::json!({
                    "name": name,
                    "sets": (0..3)
                        .map(|_| serde_json::json!({"weight": weight, "reps": reps, "target_reps": 5}))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();

        let mut workout = serde_json::json!({ "exercises": exercises });
        if let Some(id) = programme_id {
            workout["programme_id"] = serde_json::json!(id);
        }

        let file = self.write_file("completed.json", &workout.to_string());
        let output = self
            .cli()
            .arg("complete")
            .arg(&file)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        String::from_utf8_lossy(&output).into_owned()
    }

    /// Generated workout JSON for a given week and day
    pub fn generate_json(&self, programme_id: &str, week: u32, day: u32) -> serde_json::Value {
        let output = self
            .cli()
            .args(["generate", "--json", "--programme", programme_id])
            .args(["--week", &week.to_string(), "--day", &day.to_string()])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("generate --json should print JSON")
    }
}

pub fn wal_lines(path: &Path) -> usize {
    fs::read_to_string(path)
        .map(|contents| contents.lines().filter(|l| !l.trim().is_empty()).count())
        .unwrap_or(0)
}
