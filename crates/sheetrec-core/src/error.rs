//! Error types for sheetrec-core

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Which side of a reconciliation a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The incoming records supplied by the caller
    Source,
    /// The records currently stored in the sheet
    Destination,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source data"),
            Side::Destination => write!(f, "destination"),
        }
    }
}

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required argument is missing or malformed
    Input,
    /// Duplicate join keys, or a match where uniqueness was required
    Conflict,
    /// The workbook backend failed or was addressed incorrectly
    Grid,
}

/// Errors that can occur in sheetrec-core
#[derive(Debug, Error)]
pub enum Error {
    /// No row number was supplied for a single-row update
    #[error("row number missing: rows are 1-indexed and a row number is required")]
    MissingRowNumber,

    /// No match headers (or an empty mapping) were supplied
    #[error("{operation}: missing {what}")]
    MissingMatchKey {
        operation: &'static str,
        what: &'static str,
    },

    /// A record lacks a value for one of the match fields
    #[error("{operation}: record in {side} is missing a value for match field '{field}': {record}")]
    MissingMatchField {
        operation: &'static str,
        side: Side,
        field: String,
        record: String,
    },

    /// Two records on the same side produced the same join key
    #[error("{operation}: duplicate record(s) in {side} with key {key}")]
    DuplicateKey {
        operation: &'static str,
        side: Side,
        key: String,
    },

    /// Matches were found while unique matching was required
    #[error("{operation}: multiple records in destination match based on your {what}")]
    MatchNotUnique {
        operation: &'static str,
        what: &'static str,
    },

    /// A sheet id that is not numeric
    #[error("bad sheet id '{0}': sheet ids must be numeric")]
    InvalidSheetId(String),

    /// No sheet with the given name
    #[error("sheet '{0}' not found")]
    SheetNotFound(String),

    /// A sheet name the backend cannot store
    #[error("invalid sheet name '{0}'")]
    InvalidSheetName(String),

    /// A region or value block that cannot be addressed
    #[error("invalid region on sheet '{sheet}': {message}")]
    InvalidRegion { sheet: String, message: String },

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingRowNumber
            | Error::MissingMatchKey { .. }
            | Error::MissingMatchField { .. }
            | Error::InvalidSheetId(_) => ErrorKind::Input,
            Error::DuplicateKey { .. } | Error::MatchNotUnique { .. } => ErrorKind::Conflict,
            Error::SheetNotFound(_)
            | Error::InvalidSheetName(_)
            | Error::InvalidRegion { .. }
            | Error::FileRead { .. }
            | Error::Csv { .. }
            | Error::WalkDir(_)
            | Error::Io(_)
            | Error::Json(_) => ErrorKind::Grid,
        }
    }
}
