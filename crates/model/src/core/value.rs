use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single typed cell written to the table store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Null,
}

/// How raw text cells are turned into [`Value`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueMode {
    /// Every cell is stored as a string, exactly as read.
    #[default]
    Text,
    /// Cells are narrowed to the most specific scalar kind that parses.
    Infer,
}

impl Value {
    pub fn from_cell(cell: &str, mode: ValueMode) -> Self {
        match mode {
            ValueMode::Text => Value::String(cell.to_string()),
            ValueMode::Infer => Self::infer(cell),
        }
    }

    /// Infers the narrowest scalar kind for a text cell.
    ///
    /// Integers with a leading zero (`"007"`) stay strings so identifiers
    /// such as postal codes survive untouched.
    pub fn infer(cell: &str) -> Self {
        if cell.is_empty() {
            return Value::Null;
        }

        if cell.eq_ignore_ascii_case("true") {
            return Value::Boolean(true);
        }
        if cell.eq_ignore_ascii_case("false") {
            return Value::Boolean(false);
        }

        if !has_leading_zero(cell) {
            if let Ok(v) = cell.parse::<i64>() {
                return Value::Int(v);
            }
            if let Ok(v) = cell.parse::<f64>()
                && v.is_finite()
                && cell.bytes().any(|b| b.is_ascii_digit())
            {
                return Value::Float(v);
            }
        }

        if let Ok(ts) = DateTime::parse_from_rfc3339(cell) {
            return Value::Timestamp(ts.with_timezone(&Utc));
        }

        Value::String(cell.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Timestamp(_) => "timestamp",
            Value::Null => "null",
        }
    }
}

fn has_leading_zero(cell: &str) -> bool {
    let digits = cell.strip_prefix('-').unwrap_or(cell);
    digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Timestamp(v) => f.write_str(&v.to_rfc3339()),
            Value::Null => f.write_str("NULL"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
