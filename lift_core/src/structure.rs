//! Workout structure parsing.
//!
//! Persisted workout templates are JSON produced by several generations of
//! clients, some of which emit an empty reps field (`"reps":,`). Parsing is a
//! two-stage pipeline: a direct parse, then the declared repairs followed by
//! a single reparse. Anything still unparseable is a structured error.

use crate::types::{RepsScheme, WorkoutStructure, DEFAULT_REP_RANGE};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Wire shape of the polymorphic `reps` field
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawReps {
    Count(u32),
    Decimal(f64),
    Text(String),
    List(Vec<u32>),
    Tagged(TaggedReps),
    Bounds { min: u32, max: u32 },
}

/// Object form of `reps` carrying an explicit `type`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TaggedReps {
    Single {
        value: u32,
    },
    Range {
        min: u32,
        max: u32,
    },
    #[serde(alias = "range_string")]
    RangeString {
        value: String,
    },
    #[serde(alias = "per_set")]
    PerSet {
        values: Vec<u32>,
    },
}

impl From<RawReps> for RepsScheme {
    fn from(raw: RawReps) -> Self {
        match raw {
            RawReps::Count(n) => RepsScheme::Single(n),
            RawReps::Decimal(n) => RepsScheme::Single(n.max(0.0).round() as u32),
            RawReps::Text(text) => RepsScheme::RangeString(text),
            RawReps::List(values) => RepsScheme::PerSet(values),
            RawReps::Bounds { min, max } => RepsScheme::Range { min, max },
            RawReps::Tagged(tagged) => match tagged {
                TaggedReps::Single { value } => RepsScheme::Single(value),
                TaggedReps::Range { min, max } => RepsScheme::Range { min, max },
                TaggedReps::RangeString { value } => RepsScheme::RangeString(value),
                TaggedReps::PerSet { values } => RepsScheme::PerSet(values),
            },
        }
    }
}

impl From<RepsScheme> for RawReps {
    fn from(reps: RepsScheme) -> Self {
        match reps {
            RepsScheme::Single(n) => RawReps::Count(n),
            RepsScheme::Range { min, max } => RawReps::Tagged(TaggedReps::Range { min, max }),
            RepsScheme::RangeString(text) => RawReps::Text(text),
            RepsScheme::PerSet(values) => RawReps::List(values),
        }
    }
}

/// A string-level fix for a known malformation
struct Repair {
    name: &'static str,
    apply: fn(&str) -> Option<String>,
}

/// Repairs tried, in order, after a failed direct parse
const REPAIRS: &[Repair] = &[Repair {
    name: "empty_reps",
    apply: repair_empty_reps,
}];

/// Replace `"reps":,` / `"reps": }` with the default range text.
///
/// Returns `None` when nothing was changed.
fn repair_empty_reps(json: &str) -> Option<String> {
    const KEY: &str = "\"reps\"";
    let replacement = format!(": \"{}-{}\"", DEFAULT_REP_RANGE.0, DEFAULT_REP_RANGE.1);

    let mut out = String::with_capacity(json.len() + replacement.len());
    let mut rest = json;
    let mut changed = false;

    while let Some(pos) = rest.find(KEY) {
        let after_key = pos + KEY.len();
        out.push_str(&rest[..after_key]);
        let tail = &rest[after_key..];

        if let Some(after_colon) = tail.trim_start().strip_prefix(':') {
            let value = after_colon.trim_start();
            if value.starts_with(',') || value.starts_with('}') {
                out.push_str(&replacement);
                rest = value;
                changed = true;
                continue;
            }
        }
        rest = tail;
    }
    out.push_str(rest);

    changed.then_some(out)
}

/// Parse a persisted workout structure, repairing known malformations
pub fn parse_workout_structure(json: &str) -> Result<WorkoutStructure> {
    let direct_err = match serde_json::from_str::<WorkoutStructure>(json) {
        Ok(structure) => return Ok(structure),
        Err(e) => e,
    };

    let mut text = json.to_string();
    let mut applied = Vec::new();
    for repair in REPAIRS {
        if let Some(fixed) = (repair.apply)(&text) {
            applied.push(repair.name);
            text = fixed;
        }
    }

    if applied.is_empty() {
        return Err(Error::StructureParse {
            repaired: false,
            source: direct_err,
        });
    }

    tracing::warn!(
        "Workout structure failed to parse ({}), retrying after repairs: {}",
        direct_err,
        applied.join(", ")
    );

    serde_json::from_str(&text).map_err(|source| Error::StructureParse {
        repaired: true,
        source,
    })
}
