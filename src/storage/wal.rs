//! Write-ahead log writer.
//!
//! Every operation is mirrored into two append-only files:
//! - `wal.log`: length-prefixed binary records
//! - `wal.txt`: one JSON-shaped line per operation
//!
//! The log is an audit trail. Nothing in this module reads it back.

pub mod manager;
pub mod record;

pub use manager::{WalWriter, WAL_BINARY_FILE, WAL_TEXT_FILE};
pub use record::{WalEntry, WalOp};
