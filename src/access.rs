//! Access layer for row-oriented operations.
//!
//! This module provides abstractions for storing and reading rows:
//!
//! - **HeapTable**: Append-only records spread over the pages of one table file
//! - **TableSchema**: Ordered column layout of a table
//! - **Row**: Named column values in schema order
//! - **codec**: Schema-driven binary encoding of rows
//!
//! The heap table stores opaque byte records; the codec is what gives them
//! a shape. Neither depends on the other.

pub mod codec;
pub mod error;
pub mod heap;
pub mod row;
pub mod schema;
pub mod value;

pub use codec::{decode_row, encode_row, MAX_VARCHAR_BYTES};
pub use error::{RowError, RowResult};
pub use heap::{HeapTable, ScanSummary};
pub use row::Row;
pub use schema::{Column, TableSchema};
pub use value::{ColumnType, Value};
