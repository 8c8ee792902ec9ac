use std::fmt;

/// Column type descriptor.
///
/// Any type name is accepted when a schema is built; names other than
/// `INT` and `VARCHAR` are kept as [`ColumnType::Other`] and rejected by the
/// row codec when a row is encoded or decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 4-byte signed integer
    Int,
    /// UTF-8 text of at most 65535 encoded bytes
    Varchar,
    Other(String),
}

impl ColumnType {
    /// Parse a type name, case-insensitively.
    pub fn parse(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();
        match upper.as_str() {
            "INT" => ColumnType::Int,
            "VARCHAR" => ColumnType::Varchar,
            _ => ColumnType::Other(upper),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ColumnType::Int => "INT",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Other(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, ColumnType::Other(_))
    }
}

impl From<&str> for ColumnType {
    fn from(name: &str) -> Self {
        ColumnType::parse(name)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Values that can be stored in a row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i32),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
