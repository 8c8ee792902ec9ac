//! WAL record types and their two encodings.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// Logged operation kinds. The discriminant is the binary opcode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalOp {
    Insert = 1,
    CreateTable = 2,
    DropTable = 3,
    Truncate = 4,
}

impl WalOp {
    pub fn opcode(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(WalOp::Insert),
            2 => Some(WalOp::CreateTable),
            3 => Some(WalOp::DropTable),
            4 => Some(WalOp::Truncate),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WalOp::Insert => "INSERT",
            WalOp::CreateTable => "CREATE_TABLE",
            WalOp::DropTable => "DROP_TABLE",
            WalOp::Truncate => "TRUNCATE",
        }
    }
}

impl fmt::Display for WalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged operation, timestamped when it is built.
#[derive(Debug, Clone, PartialEq)]
pub struct WalEntry {
    pub ts: DateTime<Utc>,
    pub op: WalOp,
    pub table: String,
    /// Encoded row bytes, present only for inserts.
    pub row: Option<Vec<u8>>,
}

impl WalEntry {
    fn new(op: WalOp, table: &str, row: Option<Vec<u8>>) -> Self {
        Self {
            ts: Utc::now(),
            op,
            table: table.to_string(),
            row,
        }
    }

    pub fn create_table(table: &str) -> Self {
        Self::new(WalOp::CreateTable, table, None)
    }

    pub fn drop_table(table: &str) -> Self {
        Self::new(WalOp::DropTable, table, None)
    }

    pub fn truncate(table: &str) -> Self {
        Self::new(WalOp::Truncate, table, None)
    }

    pub fn insert(table: &str, row: &[u8]) -> Self {
        Self::new(WalOp::Insert, table, Some(row.to_vec()))
    }

    /// Render the entry as a single JSON-shaped line, without the newline.
    pub fn to_text_line(&self) -> String {
        let mut line = format!(
            "{{\"ts\":\"{}\",\"op\":\"{}\",\"table\":\"{}\"",
            self.ts.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.op,
            escape(&self.table)
        );
        if let Some(row) = &self.row {
            line.push_str(",\"row\":\"");
            line.push_str(&BASE64.encode(row));
            line.push('"');
        }
        line.push('}');
        line
    }

    /// Encode the binary record body (without the length prefix):
    /// `[opcode:1][tableLen:4][table][rowLen:4][row]`, where the row part
    /// is present only for inserts. Integers are big-endian.
    pub fn to_binary(&self) -> Bytes {
        let table = self.table.as_bytes();
        let row_len = self.row.as_ref().map_or(0, |row| 4 + row.len());

        let mut buf = BytesMut::with_capacity(1 + 4 + table.len() + row_len);
        buf.put_u8(self.op.opcode());
        buf.put_u32(table.len() as u32);
        buf.put_slice(table);
        if let Some(row) = &self.row {
            buf.put_u32(row.len() as u32);
            buf.put_slice(row);
        }
        buf.freeze()
    }
}

/// Escape backslashes and double quotes. Nothing else is escaped.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
