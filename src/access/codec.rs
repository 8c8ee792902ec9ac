//! Schema-driven binary row format.
//!
//! A row is the concatenation of its fields in schema order, with no
//! embedded schema and no null bitmap:
//!
//! - `INT`: 4-byte big-endian two's complement
//! - `VARCHAR`: 4-byte big-endian byte length followed by the UTF-8 bytes

use crate::access::error::{RowError, RowResult};
use crate::access::row::Row;
use crate::access::schema::{Column, TableSchema};
use crate::access::value::{ColumnType, Value};
use byteorder::{BigEndian, ReadBytesExt};
use std::borrow::Cow;

/// Largest encoded VARCHAR accepted by the codec.
pub const MAX_VARCHAR_BYTES: usize = 65535;

enum Field<'a> {
    Int(i32),
    Text(Cow<'a, str>),
}

/// Encode `values` according to `schema`.
///
/// Every column must have a value; values for columns not in the schema are
/// ignored. All fields are validated before any byte is produced.
pub fn encode_row(schema: &TableSchema, values: &Row) -> RowResult<Vec<u8>> {
    let mut fields = Vec::with_capacity(schema.len());
    let mut size = 0;

    for column in schema.columns() {
        let value = values
            .get(&column.name)
            .ok_or_else(|| RowError::MissingValue {
                column: column.name.clone(),
            })?;

        let field = match &column.column_type {
            ColumnType::Int => {
                size += 4;
                Field::Int(coerce_int(column, value)?)
            }
            ColumnType::Varchar => {
                let text = match value {
                    Value::Text(s) => Cow::Borrowed(s.as_str()),
                    other => Cow::Owned(other.to_string()),
                };
                if text.len() > MAX_VARCHAR_BYTES {
                    return Err(RowError::VarcharTooLong {
                        column: column.name.clone(),
                        len: text.len(),
                        max: MAX_VARCHAR_BYTES,
                    });
                }
                size += 4 + text.len();
                Field::Text(text)
            }
            ColumnType::Other(type_name) => return Err(unsupported(column, type_name)),
        };
        fields.push(field);
    }

    let mut data = Vec::with_capacity(size);
    for field in fields {
        match field {
            Field::Int(v) => data.extend_from_slice(&v.to_be_bytes()),
            Field::Text(text) => {
                data.extend_from_slice(&(text.len() as u32).to_be_bytes());
                data.extend_from_slice(text.as_bytes());
            }
        }
    }

    Ok(data)
}

/// Decode a record produced by [`encode_row`] with the same schema.
///
/// The returned row iterates in schema declaration order. Bytes left over
/// after the last column are ignored; invalid UTF-8 is replaced.
pub fn decode_row(schema: &TableSchema, bytes: &[u8]) -> RowResult<Row> {
    let mut reader = bytes;
    let mut row = Row::with_capacity(schema.len());

    for column in schema.columns() {
        let value = match &column.column_type {
            ColumnType::Int => {
                let v = reader
                    .read_i32::<BigEndian>()
                    .map_err(|_| truncated(column))?;
                Value::Int(v)
            }
            ColumnType::Varchar => {
                let len = reader
                    .read_u32::<BigEndian>()
                    .map_err(|_| truncated(column))? as usize;
                if reader.len() < len {
                    return Err(truncated(column));
                }
                let (text, rest) = reader.split_at(len);
                reader = rest;
                Value::Text(String::from_utf8_lossy(text).into_owned())
            }
            ColumnType::Other(type_name) => return Err(unsupported(column, type_name)),
        };
        row.set(column.name.clone(), value);
    }

    Ok(row)
}

fn coerce_int(column: &Column, value: &Value) -> RowResult<i32> {
    match value {
        Value::Int(v) => Ok(*v),
        Value::Text(s) => s.trim().parse().map_err(|_| RowError::InvalidInt {
            column: column.name.clone(),
            value: s.clone(),
        }),
    }
}

fn truncated(column: &Column) -> RowError {
    RowError::Truncated {
        column: column.name.clone(),
    }
}

fn unsupported(column: &Column, type_name: &str) -> RowError {
    RowError::UnsupportedType {
        column: column.name.clone(),
        type_name: type_name.to_string(),
    }
}
