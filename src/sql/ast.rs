// Statements understood by the command loop

use crate::access::{Column, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    InsertInto(InsertInto),
    Select(Select),
}

/// `CREATE TABLE [IF NOT EXISTS] name (col TYPE, ...)`
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<Column>,
    pub if_not_exists: bool,
}

/// `INSERT INTO table (col, ...) VALUES (value, ...)`
#[derive(Debug, Clone, PartialEq)]
pub struct InsertInto {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

/// `SELECT * FROM table [WHERE col = value]`
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: String,
    pub filter: Option<Filter>,
}

/// Equality filter. Rows match when the display form of their value equals
/// `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Select {
    pub fn all(table: impl Into<String>) -> Self {
        Select {
            table: table.into(),
            filter: None,
        }
    }

    pub fn filtered(
        table: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Select {
            table: table.into(),
            filter: Some(Filter {
                column: column.into(),
                value: value.into(),
            }),
        }
    }
}
