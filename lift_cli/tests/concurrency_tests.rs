//! Concurrency tests for the lift binary.
//!
//! These tests verify that multiple processes can safely:
//! - Append to the performance WAL simultaneously (file locking)
//! - Read history while it is being written
//! - Roll up without losing records

mod common;

use common::{wal_lines, TestEnv};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_sequential_completions_all_logged() {
    let env = TestEnv::new();

    for i in 0..5 {
        thread::sleep(Duration::from_millis(i * 5));
        env.complete(None, &[("Squat", 60.0 + i as f64 * 5.0, 5)]);
    }

    assert_eq!(wal_lines(&env.data_dir().join("wal/performance.wal")), 5);
}

#[test]
fn test_concurrent_completions_keep_wal_intact() {
    let env = Arc::new(TestEnv::new());

    let handles: Vec<_> = ["Squat", "Bench Press", "Deadlift", "Barbell Row"]
        .into_iter()
        .map(|name| {
            let env = Arc::clone(&env);
            thread::spawn(move || {
                let workout = serde_json::json!({
                    "exercises": [{"name": name, "sets": [{"weight": 50.0, "reps": 5, "target_reps": 5}]}]
                });
                env.cli()
                    .args(["complete", "-"])
                    .write_stdin(workout.to_string())
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("completion thread panicked");
    }

    let wal = std::fs::read_to_string(env.data_dir().join("wal/performance.wal")).unwrap();
    let records: Vec<serde_json::Value> = wal
        .lines()
        .map(|line| serde_json::from_str(line).expect("every WAL line is whole JSON"))
        .collect();
    assert_eq!(records.len(), 4);
}

#[test]
fn test_reads_between_writes() {
    let env = TestEnv::new();
    let id = env.import_programme();

    for i in 0..3 {
        thread::sleep(Duration::from_millis(i * 10));
        env.complete(None, &[("Squat", 60.0, 5)]);
        env.generate_json(&id, 1, 1);
    }

    let workout = env.generate_json(&id, 1, 1);
    assert_eq!(workout["exercises"][0]["sets"][0]["weight"], 65.0);
}

#[test]
fn test_rollup_while_writing() {
    let env = Arc::new(TestEnv::new());
    for _ in 0..3 {
        env.complete(None, &[("Deadlift", 100.0, 5)]);
    }

    let rollup_env = Arc::clone(&env);
    let rollup = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        rollup_env.cli().arg("rollup").assert().success();
    });

    for _ in 0..2 {
        env.complete(None, &[("Deadlift", 100.0, 5)]);
    }
    rollup.join().expect("rollup thread panicked");

    // The WAL is renamed, never truncated: every line is live or archived
    let wal_dir = env.data_dir().join("wal");
    let total = wal_lines(&wal_dir.join("performance.wal"))
        + wal_lines(&wal_dir.join("performance.wal.processed"));
    assert_eq!(total, 5);
    assert!(env.data_dir().join("performance.csv").exists());
}
