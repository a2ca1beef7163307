//! Trainer state and programme persistence with file locking.
//!
//! `state.json` holds everything mutable that is not an append-only log:
//! trainee maxes, best lifts per exercise and programme progress.
//! Programmes are stored one JSON file each under `programmes/`.

use crate::progress::ProgrammeStore;
use crate::records::MaxUpdate;
use crate::{Error, PersonalRecord, Programme, ProgrammeProgress, RecordType, Result, TraineeMax};
use fs2::FileExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Read-only view of the current trainee max per exercise
pub trait MaxLookup {
    fn current_max(&self, exercise_id: &str) -> Option<f64>;
}

impl MaxLookup for HashMap<String, f64> {
    fn current_max(&self, exercise_id: &str) -> Option<f64> {
        self.get(exercise_id).copied()
    }
}

/// Layout of the data directory
#[derive(Clone, Debug)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn wal_dir(&self) -> PathBuf {
        self.root.join("wal")
    }

    pub fn state(&self) -> PathBuf {
        self.wal_dir().join("state.json")
    }

    pub fn performance_wal(&self) -> PathBuf {
        self.wal_dir().join("performance.wal")
    }

    pub fn records_wal(&self) -> PathBuf {
        self.wal_dir().join("records.wal")
    }

    pub fn performance_csv(&self) -> PathBuf {
        self.root.join("performance.csv")
    }

    pub fn programmes_dir(&self) -> PathBuf {
        self.root.join("programmes")
    }

    pub fn programme(&self, id: Uuid) -> PathBuf {
        self.programmes_dir().join(format!("{}.json", id))
    }
}

/// Mutable trainee state
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TrainerState {
    #[serde(default)]
    pub maxes: HashMap<String, TraineeMax>,
    /// Heaviest rounded weight per exercise id
    #[serde(default)]
    pub best_weights: HashMap<String, f64>,
    /// Highest rounded estimated 1RM per exercise id
    #[serde(default)]
    pub best_estimates: HashMap<String, f64>,
    #[serde(default)]
    pub progress: HashMap<Uuid, ProgrammeProgress>,
}

impl MaxLookup for TrainerState {
    fn current_max(&self, exercise_id: &str) -> Option<f64> {
        self.maxes.get(exercise_id).map(|m| m.one_rm_estimate)
    }
}

impl TrainerState {
    /// Fold newly detected records into the best-lift tables
    pub fn apply_records(&mut self, records: &[PersonalRecord]) {
        for record in records {
            let table = match record.record_type {
                RecordType::WeightPr => &mut self.best_weights,
                RecordType::Estimated1RmPr => &mut self.best_estimates,
            };
            let value = match record.record_type {
                RecordType::WeightPr => record.weight,
                RecordType::Estimated1RmPr => record.estimated_1rm,
            };
            let best = table.entry(record.exercise_id.clone()).or_insert(value);
            if value > *best {
                *best = value;
            }
        }
    }

    /// Store raised maxes, keeping the ratchet if an update is stale
    pub fn apply_max_updates(&mut self, updates: &[MaxUpdate]) {
        for update in updates {
            match self.maxes.get(&update.exercise_id) {
                Some(existing) if existing.one_rm_estimate >= update.max.one_rm_estimate => {
                    tracing::debug!("Ignoring stale max update for {}", update.exercise_id);
                }
                _ => {
                    tracing::info!(
                        "Max for {} raised to {}",
                        update.exercise_id,
                        update.max.one_rm_estimate
                    );
                    self.maxes
                        .insert(update.exercise_id.clone(), update.max.clone());
                }
            }
        }
    }

    /// Load state with a shared lock
    ///
    /// A missing or unreadable file yields the default state.
    pub fn load(path: &Path) -> Result<Self> {
        match read_locked::<TrainerState>(path) {
            Ok(Some(state)) => {
                tracing::debug!("Loaded trainer state from {:?}", path);
                Ok(state)
            }
            Ok(None) => {
                tracing::info!("No state file found, using default state");
                Ok(Self::default())
            }
            Err(e) => {
                tracing::warn!("Failed to load state file {:?}: {}. Using defaults.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Atomically replace the state file
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, self)?;
        tracing::debug!("Saved trainer state to {:?}", path);
        Ok(())
    }

    /// Load, modify and save back
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut TrainerState) -> Result<()>,
    {
        let mut state = Self::load(path)?;
        f(&mut state)?;
        state.save(path)?;
        Ok(state)
    }
}

/// Read a JSON file under a shared lock; `None` if it does not exist
fn read_locked<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    let _ = file.unlock();
    read?;

    Ok(Some(serde_json::from_str(&contents)?))
}

/// Write JSON via a synced temp file renamed over `path`
fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::State(format!("{:?} has no parent directory", path)))?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Save an imported programme
pub fn save_programme(paths: &DataPaths, programme: &Programme) -> Result<()> {
    write_atomic(&paths.programme(programme.id), programme)?;
    tracing::debug!("Saved programme {} ({})", programme.name, programme.id);
    Ok(())
}

pub fn load_programme(paths: &DataPaths, id: Uuid) -> Result<Programme> {
    read_locked(&paths.programme(id))?
        .ok_or_else(|| Error::NotFound(format!("programme {}", id)))
}

/// File-backed programme store
///
/// Progress lives in `state.json` next to the maxes, so each progress save
/// is a load-modify-save of the whole state file.
pub struct FileStore {
    paths: DataPaths,
}

impl FileStore {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }
}

impl ProgrammeStore for FileStore {
    fn load_programme(&self, id: Uuid) -> Result<Programme> {
        load_programme(&self.paths, id)
    }

    fn save_programme(&mut self, programme: &Programme) -> Result<()> {
        save_programme(&self.paths, programme)
    }

    fn load_progress(&self, programme_id: Uuid) -> Result<Option<ProgrammeProgress>> {
        let state = TrainerState::load(&self.paths.state())?;
        Ok(state.progress.get(&programme_id).cloned())
    }

    fn save_progress(&mut self, progress: &ProgrammeProgress) -> Result<()> {
        TrainerState::update(&self.paths.state(), |state| {
            state.progress.insert(progress.programme_id, progress.clone());
            Ok(())
        })?;
        Ok(())
    }
}
