//! Performance history reads.
//!
//! History is the union of the live WAL and the CSV archive, deduplicated by
//! record id and ordered oldest first, which is the order progression
//! replays it in.

use crate::csv_rollup::CsvRow;
use crate::{PerformanceRecord, Result};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;

/// Load all performance history from the WAL and the CSV archive
pub fn load_history(wal_path: &Path, csv_path: &Path) -> Result<Vec<PerformanceRecord>> {
    let mut records = Vec::new();
    let mut seen_ids = HashSet::new();

    let wal_records: Vec<PerformanceRecord> = crate::wal::read_records(wal_path)?;
    for record in wal_records {
        if seen_ids.insert(record.id) {
            records.push(record);
        }
    }
    let wal_count = records.len();

    if csv_path.exists() {
        for record in load_records_from_csv(csv_path)? {
            if seen_ids.insert(record.id) {
                records.push(record);
            }
        }
    }

    records.sort_by(|a, b| a.performed_at.cmp(&b.performed_at));

    tracing::debug!(
        "Loaded {} performance records ({} from WAL)",
        records.len(),
        wal_count
    );

    Ok(records)
}

fn load_records_from_csv(path: &Path) -> Result<Vec<PerformanceRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut records = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match PerformanceRecord::try_from(row) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping archived record: {}", e),
            },
            Err(e) => tracing::warn!("Failed to deserialize CSV row: {}", e),
        }
    }

    Ok(records)
}

/// Records for one exercise, matched case-insensitively, oldest first
pub fn history_for_exercise<'a>(
    history: &'a [PerformanceRecord],
    exercise_name: &str,
) -> Vec<&'a PerformanceRecord> {
    history
        .iter()
        .filter(|r| r.exercise_name.eq_ignore_ascii_case(exercise_name))
        .collect()
}
