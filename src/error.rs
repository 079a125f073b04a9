// ❌ Error taxonomy
// Extraction failures are fatal to a run; "no data" never is (see checker::Verdict).

use crate::oracle::InvalidInstant;
use std::path::PathBuf;
use thiserror::Error;

/// Raw snapshot is structurally unusable. No partial verdict is produced.
#[derive(Debug, Error, PartialEq)]
pub enum ExtractionError {
    #[error("snapshot is not valid JSON of the expected shape: {0}")]
    MalformedSnapshot(String),

    #[error("{element}[{index}].{attribute} is not a number: {value:?}")]
    NonNumeric {
        element: &'static str,
        index: usize,
        attribute: &'static str,
        value: String,
    },

    #[error("{element}[{index}].{attribute} is negative: {value}")]
    NegativeSize {
        element: &'static str,
        index: usize,
        attribute: &'static str,
        value: f64,
    },

    #[error("conflicting axis ticks at x={x}: {first:?} vs {second:?}")]
    ConflictingTicks { x: f64, first: String, second: String },
}

/// Harness-level failures around the core.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("navigation to {target} failed: {reason}")]
    NavigationFailure { target: String, reason: String },

    #[error("snapshot capture failed: {0}")]
    Capture(String),

    #[error("screenshot to {path:?} failed: {reason}")]
    Screenshot { path: PathBuf, reason: String },

    #[error(transparent)]
    InvalidInstant(#[from] InvalidInstant),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}
