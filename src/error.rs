//! Error types for the risk assessment engine.
//!
//! Failures split into two classes the caller can match on: configuration
//! errors (bad inputs, surfaced immediately and never retried) and invariant
//! violations (engine bugs, fatal, never swallowed). The io variants wrap
//! the loader boundary.

use thiserror::Error;

use crate::data::AttrKind;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Precondition failure in the caller-supplied inputs.
///
/// Retrying without changing the input would reproduce the same failure, so
/// none of these are ever retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no quasi-identifier sets supplied")]
    EmptyQiSets,

    #[error("quasi-identifier set has no attributes")]
    EmptyQiSet,

    #[error("attribute `{0}` listed twice in one quasi-identifier set")]
    DuplicateQiAttribute(String),

    #[error("attribute `{0}` declared twice in the schema")]
    DuplicateAttribute(String),

    #[error("attribute `{0}` not found in the dataset schema")]
    UnknownAttribute(String),

    #[error("invalid thresholds: high_max ({high_max}) must be at least 1 and below medium_max ({medium_max})")]
    InvalidThresholds { high_max: usize, medium_max: usize },

    #[error("row {row} has {found} values but the schema declares {expected} attributes")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}, attribute `{attribute}`: value does not match declared kind {expected:?}")]
    ValueKind {
        row: usize,
        attribute: String,
        expected: AttrKind,
    },
}

/// Internal consistency failure. Indicates a bug in the engine itself, not
/// in the inputs; always surfaced to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("k-anonymity of {k} is below 1, which no partition can produce")]
    InvalidK { k: usize },

    #[error("record {row} is not covered exactly once by the equivalence classes")]
    RowCoverage { row: usize },

    #[error("equivalence-class sizes sum to {sum} but the dataset has {rows} rows")]
    ClassSizeSum { sum: usize, rows: usize },
}

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// True for caller precondition failures.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// True for errors that indicate an engine bug rather than bad input.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Error::Invariant(_))
    }
}
