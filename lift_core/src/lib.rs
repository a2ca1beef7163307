#![forbid(unsafe_code)]

//! Core domain model and business logic for Lift, a strength-training
//! progression and weight-prescription engine.
//!
//! This crate provides:
//! - Domain types (workout structures, programmes, progress, records)
//! - Structure parsing with repair of known malformations
//! - Weight prescription, progression and wave periodization
//! - Personal record detection and trainee max tracking
//! - Persistence (WAL, CSV, state)

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod structure;
pub mod prescription;
pub mod progression;
pub mod wave;
pub mod records;
pub mod progress;
pub mod wal;
pub mod csv_rollup;
pub mod history;
pub mod state;
pub mod engine;
pub mod import;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog};
pub use config::Config;
pub use structure::parse_workout_structure;
pub use prescription::{prescribe, round_weight, PrescribedWeight, PrescriptionRequest};
pub use progression::{compute_progression, ProgressionAction, ProgressionDecision};
pub use wave::{resolve_intensity, wave_intensity};
pub use records::{detect_records, estimate_one_rm, ratchet_max, weight_for_reps, MaxUpdate};
pub use progress::{activate, advance, advance_progress, resync_progress, ProgrammeStore};
pub use wal::{JsonlSink, RecordSink};
pub use history::{history_for_exercise, load_history};
pub use import::{import_programme, parse_programme};
pub use state::{DataPaths, FileStore, MaxLookup, TrainerState};
pub use engine::{
    complete_workout, generate_next_workout, generate_workout, load_programme_workouts,
    CompletedWorkout, CompletionReport, GenerationContext, GeneratedWorkout,
};
