//! Crate error type.
//!
//! Every variant maps onto one of the abstract error kinds a caller is
//! expected to branch on (`NotFound`, `WrongType`, `Malformed`, `Mismatch`,
//! `InvalidArgument`, `IOError`); see [`EclError::kind`].

use std::fmt;
use thiserror::Error;

/// The abstract error kind a caller can match on without caring about the
/// exact variant that produced it.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    NotFound,
    WrongType,
    Malformed,
    Mismatch,
    InvalidArgument,
    IOError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::WrongType => "WrongType",
            ErrorKind::Malformed => "Malformed",
            ErrorKind::Mismatch => "Mismatch",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::IOError => "IOError",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum EclError {
    // ---- IOError ----
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not enough bytes in {record:?} at offset {offset}: expected {expected}, found {found}")]
    NotEnoughBytes {
        record: String,
        offset: u64,
        expected: usize,
        found: usize,
    },

    // ---- Malformed ----
    #[error("tail not matching header in record {record:?} at offset {offset}: head {head}, tail {tail}")]
    HeadTailMismatch {
        record: String,
        offset: u64,
        head: i32,
        tail: i32,
    },

    #[error("invalid data type {found:?} for record {record:?} at offset {offset}")]
    InvalidDataType {
        record: String,
        offset: u64,
        found: String,
    },

    #[error("invalid dynamic string length {0:?}")]
    InvalidStringLength(String),

    #[error("record {record:?} at offset {offset} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        record: String,
        offset: u64,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("unexpected record name {found:?} at offset {offset}, expected one of {expected}")]
    UnexpectedRecordName {
        offset: u64,
        expected: String,
        found: String,
    },

    #[error("partial read of formatted file {0:?} is not supported")]
    PartialFormattedRead(String),

    #[error("restart chain revisits an already-opened spec file: {0:?}")]
    RestartChainCycle(String),

    // ---- Mismatch ----
    #[error("grid dimensions mismatch between {grid_file:?} ({grid:?}) and {other_file:?} ({other:?})")]
    GridDimsMismatch {
        grid_file: String,
        grid: (i32, i32, i32),
        other_file: String,
        other: (i32, i32, i32),
    },

    #[error("active cell count mismatch between {grid_file:?} ({grid}) and {other_file:?} ({other})")]
    ActiveCountMismatch {
        grid_file: String,
        grid: usize,
        other_file: String,
        other: usize,
    },

    #[error("TRANNNC length {found} in {file:?} does not match NNC1 length {expected}")]
    TranNncLengthMismatch {
        file: String,
        expected: usize,
        found: usize,
    },

    // ---- NotFound ----
    #[error("record {0:?} not found")]
    NotFound(String),

    #[error("summary key {0:?} not found")]
    KeyNotFound(String),

    #[error("required record {0:?} missing from {1:?}")]
    MissingRecord(String, String),

    // ---- WrongType ----
    #[error("record {name:?} has type {found}, requested {expected}")]
    WrongType {
        name: String,
        expected: String,
        found: String,
    },

    #[error("record {name:?} has {found} elements, expected {expected}")]
    UnexpectedLength {
        name: String,
        expected: String,
        found: usize,
    },

    // ---- InvalidArgument ----
    #[error("i, j or/and k out of range: ({i}, {j}, {k}) not within (0..{nx}, 0..{ny}, 0..{nz})")]
    IjkOutOfRange {
        i: i64,
        j: i64,
        k: i64,
        nx: usize,
        ny: usize,
        nz: usize,
    },

    #[error("index {index} out of range: valid range is 0..{len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid file path {0:?}")]
    InvalidFilePath(String),
}

impl EclError {
    pub fn kind(&self) -> ErrorKind {
        use EclError::*;
        match self {
            Io { .. } | NotEnoughBytes { .. } => ErrorKind::IOError,
            HeadTailMismatch { .. }
            | InvalidDataType { .. }
            | InvalidStringLength(_)
            | InvalidUtf8 { .. }
            | UnexpectedRecordName { .. }
            | PartialFormattedRead(_)
            | RestartChainCycle(_)
            | UnexpectedLength { .. } => ErrorKind::Malformed,
            GridDimsMismatch { .. } | ActiveCountMismatch { .. } | TranNncLengthMismatch { .. } => {
                ErrorKind::Mismatch
            }
            NotFound(_) | KeyNotFound(_) | MissingRecord(_, _) => ErrorKind::NotFound,
            WrongType { .. } => ErrorKind::WrongType,
            IjkOutOfRange { .. } | IndexOutOfRange { .. } | InvalidFilePath(_) => {
                ErrorKind::InvalidArgument
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EclError>;
