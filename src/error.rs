//! Error taxonomy for the load pipeline.
//!
//! Every stage returns [`EtlError`]. Each variant falls into one of four
//! [`ErrorKind`]s so callers can tell an unreadable input apart from a schema
//! mismatch, a bad date, or a database failure. None of them are recoverable;
//! the pipeline stops at the first error.

use std::{fmt, path::PathBuf, time::Duration};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Schema,
    Type,
    Sink,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Input => "input",
            ErrorKind::Schema => "schema",
            ErrorKind::Type => "type",
            ErrorKind::Sink => "sink",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("input file {path:?} does not exist")]
    InputNotFound { path: PathBuf },

    #[error("failed to read input file {path:?}: {source}")]
    InputIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input file {path:?} is empty (no header row)")]
    EmptyInput { path: PathBuf },

    #[error("CSV parse error at line {line}: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("line {line} is not valid {encoding} text")]
    Decode { line: u64, encoding: &'static str },

    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),

    #[error("line {line} has {found} field(s), expected {expected}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("column '{column}' row {row}: expected a numeric value, found '{value}'")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("column '{column}' row {row}: '{value}' does not match date format {format}")]
    DateParse {
        column: String,
        row: usize,
        value: String,
        format: &'static str,
    },

    #[error("row count changed from {expected} to {found}")]
    RowCountChanged { expected: usize, found: usize },

    #[error("row {row}: {metric} is outside the decimal range")]
    Overflow { metric: &'static str, row: usize },

    #[error("invalid table name '{0}'")]
    InvalidTableName(String),

    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("table '{0}' already exists (if_exists = fail)")]
    TableExists(String),

    #[error("database write failed: {0}")]
    Write(#[source] sqlx::Error),

    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl EtlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::InputNotFound { .. }
            | EtlError::InputIo { .. }
            | EtlError::EmptyInput { .. }
            | EtlError::Csv { .. }
            | EtlError::Decode { .. }
            | EtlError::UnknownEncoding(_)
            | EtlError::MalformedRow { .. } => ErrorKind::Input,
            EtlError::DuplicateColumn(_)
            | EtlError::MissingColumn(_)
            | EtlError::RowCountChanged { .. } => ErrorKind::Schema,
            EtlError::NotNumeric { .. }
            | EtlError::DateParse { .. }
            | EtlError::Overflow { .. } => ErrorKind::Type,
            EtlError::InvalidTableName(_)
            | EtlError::Connect(_)
            | EtlError::TableExists(_)
            | EtlError::Write(_)
            | EtlError::Timeout { .. }
            | EtlError::Runtime(_) => ErrorKind::Sink,
        }
    }
}
