//! Error type shared by every lift_core module.

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// WAL line, state file, programme file or report (de)serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid configuration or exercise catalog
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workout structure could not be parsed, even after repairs
    #[error("Workout structure parse error (repaired: {repaired}): {source}")]
    StructureParse {
        repaired: bool,
        #[source]
        source: serde_json::Error,
    },

    /// Reps outside the range a 1RM formula is defined for
    #[error("Out of domain: {0}")]
    OutOfDomain(String),

    /// A programme, workout or progress entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persisted state is inconsistent or cannot be written
    #[error("State error: {0}")]
    State(String),

    /// A row of the CSV archive could not be turned back into a record
    #[error("Invalid archive row: {0}")]
    ArchiveRow(String),
}
