//! Typed failures raised at the catalogue and matching seams.
//!
//! Command handlers wrap these in `anyhow` with context; library callers can
//! match on the variants to tell a stale lookup apart from a bad request.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("File {0:?} is not loaded in the catalogue")]
    UnknownPath(PathBuf),

    #[error("Duplicate column '{column}' in {path:?}")]
    DuplicateColumn { path: PathBuf, column: String },

    #[error("Row {row} in {path:?} has {found} field(s) but the header declares {expected}")]
    RaggedRow {
        path: PathBuf,
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Rejections from the similarity engine and the approval state.
#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("{methods} method(s) selected but {weights} weight(s) supplied")]
    WeightCountMismatch { methods: usize, weights: usize },

    #[error("Method '{method}' has weight 0; deselect it instead of zero-weighting it")]
    ZeroWeight { method: String },

    #[error("Unknown comparison method '{0}'")]
    UnknownMethod(String),

    #[error("Comparison method '{0}' selected more than once")]
    DuplicateMethod(String),

    #[error("Invalid method specification '{spec}': {reason}")]
    InvalidMethodSpec { spec: String, reason: String },

    #[error("No {side} columns selected for comparison")]
    EmptyColumns { side: &'static str },

    #[error("Column '{column}' listed twice for the {side} dataset")]
    DuplicateColumn { side: &'static str, column: String },

    #[error("Column '{column}' not found in {side} dataset")]
    UnknownColumn { side: &'static str, column: String },

    #[error("Cell ({origin}, {target}) is not part of the similarity matrix")]
    CellOutOfRange { origin: String, target: String },

    #[error("Cell ({origin}, {target}) has no score and cannot be approved")]
    UnscoredCell { origin: String, target: String },
}

/// Why a single comparison method could not score a column pair.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MethodError {
    #[error("{method} requires {expected} columns, found {found}")]
    UnsupportedKind {
        method: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("{method} has no values to compare")]
    NoData { method: &'static str },

    #[error("{method} is undefined for constant columns")]
    ZeroVariance { method: &'static str },

    #[error("{method} overflowed on values too large to score")]
    NonFinite { method: &'static str },
}

pub type MatchResult<T> = Result<T, MatchError>;
