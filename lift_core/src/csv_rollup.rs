//! Roll the performance WAL up into the CSV archive.
//!
//! The CSV is fsynced before the WAL is renamed, so a crash in between
//! leaves the records in both places; history reads dedupe by id.

use crate::{Error, PerformanceRecord, Result, SetResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;
use uuid::Uuid;

/// One archived performance record
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CsvRow {
    pub id: String,
    pub exercise_name: String,
    pub performed_at: String,
    /// `weight x reps/target` per set, joined with `;`
    pub sets: String,
}

fn encode_sets(sets: &[SetResult]) -> String {
    sets.iter()
        .map(|s| format!("{} x {}/{}", s.weight, s.reps, s.target_reps))
        .collect::<Vec<_>>()
        .join(";")
}

fn decode_set(text: &str) -> Result<SetResult> {
    let invalid = || Error::ArchiveRow(format!("bad set '{}'", text));

    let (weight, rest) = text.split_once('x').ok_or_else(invalid)?;
    let (reps, target) = rest.split_once('/').ok_or_else(invalid)?;

    Ok(SetResult {
        weight: weight.trim().parse().map_err(|_| invalid())?,
        reps: reps.trim().parse().map_err(|_| invalid())?,
        target_reps: target.trim().parse().map_err(|_| invalid())?,
    })
}

impl From<&PerformanceRecord> for CsvRow {
    fn from(record: &PerformanceRecord) -> Self {
        CsvRow {
            id: record.id.to_string(),
            exercise_name: record.exercise_name.clone(),
            performed_at: record.performed_at.to_rfc3339(),
            sets: encode_sets(&record.sets),
        }
    }
}

impl TryFrom<CsvRow> for PerformanceRecord {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| Error::ArchiveRow(format!("bad id: {}", e)))?;

        let performed_at = DateTime::parse_from_rfc3339(&row.performed_at)
            .map_err(|e| Error::ArchiveRow(format!("bad date: {}", e)))?
            .with_timezone(&Utc);

        let sets = row
            .sets
            .split(';')
            .filter(|s| !s.trim().is_empty())
            .map(decode_set)
            .collect::<Result<Vec<_>>>()?;

        Ok(PerformanceRecord {
            id,
            exercise_name: row.exercise_name,
            performed_at,
            sets,
        })
    }
}

/// Append WAL records to the CSV, then archive the WAL
///
/// Returns the number of records rolled up. The WAL is renamed to
/// `.wal.processed` rather than deleted.
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let records: Vec<PerformanceRecord> = crate::wal::read_records(wal_path)?;

    if records.is_empty() {
        tracing::info!("No performance records in WAL to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for record in &records {
        writer.serialize(CsvRow::from(record))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} performance records to {:?}", records.len(), csv_path);

    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(records.len())
}

/// Remove archived `.processed` WAL files in `dir`
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{JsonlSink, RecordSink};
    use std::fs::File;

    fn record(name: &str) -> PerformanceRecord {
        PerformanceRecord {
            id: Uuid::new_v4(),
            exercise_name: name.into(),
            performed_at: Utc::now(),
            sets: vec![
                SetResult {
                    weight: 102.5,
                    reps: 5,
                    target_reps: 5,
                },
                SetResult {
                    weight: 102.5,
                    reps: 4,
                    target_reps: 5,
                },
            ],
        }
    }

    #[test]
    fn test_wal_to_csv_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("performance.wal");
        let csv_path = temp_dir.path().join("performance.csv");

        let mut sink = JsonlSink::new(&wal_path);
        for name in ["Squat", "Bench Press", "Deadlift"] {
            sink.append(&record(name)).unwrap();
        }

        let count = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count, 3);
        assert!(csv_path.exists());
        assert!(!wal_path.exists());
        assert!(wal_path.with_extension("wal.processed").exists());

        let contents = std::fs::read_to_string(&csv_path).unwrap();
        assert!(contents.contains("102.5 x 5/5;102.5 x 4/5"));
    }

    #[test]
    fn test_rows_decode_back_to_records() {
        let original = record("Overhead Press");
        let row = CsvRow::from(&original);
        let decoded = PerformanceRecord::try_from(row).unwrap();

        assert_eq!(decoded.id, original.id);
        assert_eq!(decoded.sets, original.sets);
        assert!(!decoded.met_all_targets());
    }

    #[test]
    fn test_bad_set_text_rejected() {
        let row = CsvRow {
            id: Uuid::new_v4().to_string(),
            exercise_name: "Squat".into(),
            performed_at: Utc::now().to_rfc3339(),
            sets: "100 by 5".into(),
        };
        assert!(PerformanceRecord::try_from(row).is_err());
    }

    #[test]
    fn test_wal_to_csv_appends() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("performance.wal");
        let csv_path = temp_dir.path().join("performance.csv");

        JsonlSink::new(&wal_path).append(&record("Squat")).unwrap();
        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 1);

        JsonlSink::new(&wal_path).append(&record("Squat")).unwrap();
        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 1);

        let reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.into_records().count(), 2);
    }

    #[test]
    fn test_empty_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("empty.wal");
        File::create(&wal_path).unwrap();

        let count =
            wal_to_csv_and_archive(&wal_path, &temp_dir.path().join("performance.csv")).unwrap();
        assert_eq!(count, 0);
        assert!(wal_path.exists());
    }

    #[test]
    fn test_cleanup_processed_wals() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("performance.wal.processed")).unwrap();
        File::create(temp_dir.path().join("old.wal.processed")).unwrap();
        File::create(temp_dir.path().join("records.wal")).unwrap();

        let count = cleanup_processed_wals(temp_dir.path()).unwrap();
        assert_eq!(count, 2);
        assert!(temp_dir.path().join("records.wal").exists());
    }
}
