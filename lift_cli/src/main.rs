use chrono::Utc;
use clap::{Parser, Subcommand};
use lift_core::engine::persist_report;
use lift_core::*;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "lift")]
#[command(about = "Strength programme progression and weight prescription", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log every prescription and progression decision
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a programme from a JSON file and activate it
    Import {
        /// Programme file
        file: PathBuf,
    },

    /// Generate a workout with prescribed weights
    Generate {
        /// Programme id
        #[arg(long)]
        programme: Uuid,

        /// Week (defaults to the current week)
        #[arg(long)]
        week: Option<u32>,

        /// Day (defaults to the current day)
        #[arg(long)]
        day: Option<u32>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Log a completed workout from a JSON file ("-" for stdin)
    Complete {
        file: PathBuf,

        /// Print the completion report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show programme progress
    Progress {
        /// Programme id (all programmes if omitted)
        #[arg(long)]
        programme: Option<Uuid>,
    },

    /// Estimate a one-rep max from a set
    Estimate {
        #[arg(long)]
        weight: f64,

        #[arg(long)]
        reps: u32,
    },

    /// Roll up the performance WAL to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write the defaults to the config file if it does not exist
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    lift_core::logging::init(cli.verbose);

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);
    let paths = DataPaths::new(data_dir);

    match cli.command {
        Commands::Import { file } => cmd_import(&paths, &file),
        Commands::Generate {
            programme,
            week,
            day,
            json,
        } => cmd_generate(&paths, &config, programme, week, day, json),
        Commands::Complete { file, json } => cmd_complete(&paths, &config, &file, json),
        Commands::Progress { programme } => cmd_progress(&paths, programme),
        Commands::Estimate { weight, reps } => cmd_estimate(weight, reps),
        Commands::Rollup { cleanup } => cmd_rollup(&paths, cleanup),
        Commands::Config { init } => cmd_config(&config, init),
    }
}

fn load_catalog(config: &Config) -> Result<Catalog> {
    let catalog = Catalog::with_custom(&config.exercises.custom);
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Config("Invalid exercise catalog".into()));
    }
    Ok(catalog)
}

fn cmd_import(paths: &DataPaths, file: &Path) -> Result<()> {
    let imported = import_programme(paths, file, Utc::now())?;
    let programme = &imported.programme;

    println!("✓ Imported {}", programme.name);
    println!("  Id: {}", programme.id);
    println!(
        "  {} weeks, {} workouts",
        programme.duration_weeks, imported.progress.total_workouts
    );
    for (week, day) in &imported.unreadable {
        println!("  ⚠ Week {} day {} is unreadable and will be skipped", week, day);
    }
    Ok(())
}

fn cmd_generate(
    paths: &DataPaths,
    config: &Config,
    programme_id: Uuid,
    week: Option<u32>,
    day: Option<u32>,
    json: bool,
) -> Result<()> {
    let catalog = load_catalog(config)?;
    let programme = lift_core::state::load_programme(paths, programme_id)?;
    let state = TrainerState::load(&paths.state())?;
    let history = load_history(&paths.performance_wal(), &paths.performance_csv())?;

    let current = state.progress.get(&programme_id);
    let current_week = current.map_or(1, |p| p.current_week);
    let current_day = current.map_or(1, |p| p.current_day);

    let ctx = GenerationContext {
        catalog: &catalog,
        maxes: &state,
        history: &history,
        config,
    };
    let workout = match (week, day) {
        (None, None) => generate_next_workout(&programme, current_week, current_day, &ctx)?,
        (week, day) => generate_workout(
            &programme,
            week.unwrap_or(current_week),
            day.unwrap_or(current_day),
            &ctx,
        )?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&workout)?);
    } else {
        display_workout(&programme, &workout);
    }
    Ok(())
}

fn display_workout(programme: &Programme, workout: &GeneratedWorkout) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {} - Week {} Day {}", programme.name, workout.week, workout.day);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  {}", workout.name);
    if workout.estimated_duration > 0 {
        println!("  Duration: ~{} min", workout.estimated_duration);
    }
    println!();

    for exercise in &workout.exercises {
        println!("  {}", exercise.name);
        for set in &exercise.sets {
            match set.intensity {
                Some(intensity) => println!(
                    "    {}. {} x {} ({}%)",
                    set.set_number, set.weight, set.target_reps, intensity
                ),
                None => println!("    {}. {} x {}", set.set_number, set.weight, set.target_reps),
            }
        }
        if let Some(ref progression) = exercise.progression {
            println!("    → {}", progression.reason);
        }
        if let Some(ref note) = exercise.note {
            println!("    ℹ {}", note);
        }
    }

    for name in &workout.skipped {
        println!("  ⚠ Skipped unknown exercise: {}", name);
    }
    println!();
}

fn read_input(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        Ok(input)
    } else {
        Ok(std::fs::read_to_string(file)?)
    }
}

fn cmd_complete(paths: &DataPaths, config: &Config, file: &Path, json: bool) -> Result<()> {
    let catalog = load_catalog(config)?;
    let workout: CompletedWorkout = serde_json::from_str(&read_input(file)?)?;
    let state = TrainerState::load(&paths.state())?;

    let mut store = FileStore::new(paths.clone());
    let report = complete_workout(&workout, &catalog, &state, Some(&mut store));
    persist_report(paths, &report)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("✓ Logged {} exercises", report.performance.len());
    for record in &report.records {
        let kind = match record.record_type {
            RecordType::WeightPr => "weight",
            RecordType::Estimated1RmPr => "estimated 1RM",
        };
        println!(
            "  ★ New {} record: {} {} x {} (e1RM {})",
            kind, record.exercise_id, record.weight, record.reps, record.estimated_1rm
        );
    }
    for update in &report.max_updates {
        match update.previous {
            Some(previous) => println!(
                "  ↑ {} max {} → {}",
                update.exercise_id, previous, update.max.one_rm_estimate
            ),
            None => println!(
                "  ↑ {} max {}",
                update.exercise_id, update.max.one_rm_estimate
            ),
        }
    }
    if let Some(ref progress) = report.progress {
        print_progress(progress);
    }
    for name in &report.skipped {
        println!("  ⚠ No records tracked for unknown exercise: {}", name);
    }
    Ok(())
}

fn print_progress(progress: &ProgrammeProgress) {
    println!(
        "  Progress: {}/{} workouts ({:.1}%)",
        progress.completed_workouts, progress.total_workouts, progress.adherence_percentage
    );
    if progress.completed_workouts < progress.total_workouts {
        println!(
            "  Next: week {} day {}",
            progress.current_week, progress.current_day
        );
    } else {
        println!("  Programme complete");
    }
}

fn cmd_progress(paths: &DataPaths, programme: Option<Uuid>) -> Result<()> {
    let state = TrainerState::load(&paths.state())?;

    let mut entries: Vec<_> = match programme {
        Some(id) => {
            let progress = state
                .progress
                .get(&id)
                .ok_or_else(|| Error::NotFound(format!("progress for programme {}", id)))?;
            vec![progress]
        }
        None => state.progress.values().collect(),
    };

    if entries.is_empty() {
        println!("No programmes in progress.");
        return Ok(());
    }

    entries.sort_by_key(|p| p.programme_id);
    for progress in entries {
        let name = lift_core::state::load_programme(paths, progress.programme_id)
            .map(|p| p.name)
            .unwrap_or_else(|_| progress.programme_id.to_string());
        println!("{}", name);
        print_progress(progress);
    }
    Ok(())
}

fn cmd_estimate(weight: f64, reps: u32) -> Result<()> {
    let one_rm = round_weight(estimate_one_rm(weight, reps)?);

    println!("Estimated 1RM: {}", one_rm);
    println!(
        "Confidence: {:.0}%",
        lift_core::records::estimate_confidence(reps) * 100.0
    );
    println!();
    for target in [1, 3, 5, 8, 10, 12] {
        println!("  {:>2} reps: {}", target, round_weight(weight_for_reps(one_rm, target)?));
    }
    Ok(())
}

fn cmd_rollup(paths: &DataPaths, cleanup: bool) -> Result<()> {
    let wal_path = paths.performance_wal();
    let csv_path = paths.performance_csv();

    if !wal_path.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = lift_core::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path)?;

    println!("✓ Rolled up {} performance records to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        let cleaned = lift_core::csv_rollup::cleanup_processed_wals(&paths.wal_dir())?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}

fn cmd_config(config: &Config, init: bool) -> Result<()> {
    let path = Config::default_config_path();

    if init {
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            config.save_to(&path)?;
            println!("✓ Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    println!("# {}", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}
