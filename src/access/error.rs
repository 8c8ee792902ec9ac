//! Row codec error types.

use thiserror::Error;

/// Schema violations detected while encoding or decoding a row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("Missing value for column {column}")]
    MissingValue { column: String },

    #[error("Unsupported type {type_name} for column {column}")]
    UnsupportedType { column: String, type_name: String },

    #[error("VARCHAR too long for column {column}: {len} bytes (max: {max})")]
    VarcharTooLong {
        column: String,
        len: usize,
        max: usize,
    },

    #[error("Invalid INT value for column {column}: {value:?}")]
    InvalidInt { column: String, value: String },

    #[error("Row data truncated while reading column {column}")]
    Truncated { column: String },
}

/// Result type for row codec operations.
pub type RowResult<T> = Result<T, RowError>;
