//! Raw rows, sort keys and row filters.

use crate::errors::ReadError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A raw storage row: column name to scalar value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: BTreeMap<String, Value>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(column.into(), value.into());
        self
    }

    /// Returns a column value.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Returns an integer column.
    #[must_use]
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.columns.get(column)?.as_i64()
    }

    /// Returns a text column.
    #[must_use]
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.columns.get(column)?.as_str()
    }

    /// Decodes an integer column or fails with a read error.
    pub fn require_i64(&self, column: &str) -> Result<i64, ReadError> {
        self.get_i64(column)
            .ok_or_else(|| ReadError::malformed_row(column, "an integer"))
    }

    /// Decodes a text column or fails with a read error.
    pub fn require_str(&self, column: &str) -> Result<&str, ReadError> {
        self.get_str(column)
            .ok_or_else(|| ReadError::malformed_row(column, "text"))
    }

    /// Returns the value of `column` as a sort key.
    #[must_use]
    pub fn sort_key(&self, column: &str) -> Option<SortKey> {
        SortKey::from_value(self.columns.get(column)?)
    }

    /// Returns the column names.
    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.columns.keys()
    }
}

/// Explicit decoding of a raw row into a typed record.
pub trait FromRow: Sized {
    /// Decodes the row.
    fn from_row(row: &Row) -> Result<Self, ReadError>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self, ReadError> {
        Ok(row.clone())
    }
}

/// A totally ordered key used for keyset pagination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortKey {
    /// Integer key, e.g. a primary key.
    Int(i64),
    /// Text key.
    Text(String),
}

impl SortKey {
    /// Converts a scalar column value into a key. Only integers and strings
    /// qualify.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for SortKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Comparison operator of a row filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A `WHERE`-clause equivalent restricting which rows a reader sees.
///
/// Sources may translate the filter into their own query language; the
/// in-memory source evaluates it with [`RowFilter::matches`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RowFilter {
    /// `column <op> value`
    Compare {
        /// Column name.
        column: String,
        /// Operator.
        op: CompareOp,
        /// Right-hand side.
        value: Value,
    },
    /// All inner filters must hold.
    And {
        /// Conjuncts.
        filters: Vec<RowFilter>,
    },
}

impl RowFilter {
    /// Creates a comparison filter.
    #[must_use]
    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// `column = value`
    #[must_use]
    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    /// `column >= value`
    #[must_use]
    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ge, value)
    }

    /// `column <= value`
    #[must_use]
    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Le, value)
    }

    /// Conjunction of this filter and another.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And { mut filters } => {
                filters.push(other);
                Self::And { filters }
            }
            first => Self::And {
                filters: vec![first, other],
            },
        }
    }

    /// Evaluates the filter against a row. Missing columns and values of
    /// different kinds never match.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::Compare { column, op, value } => row
                .get(column)
                .and_then(|actual| compare_values(actual, value))
                .is_some_and(|ordering| op.accepts(ordering)),
            Self::And { filters } => filters.iter().all(|f| f.matches(row)),
        }
    }
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { column, op, value } => write!(f, "{column} {} {value}", op.symbol()),
            Self::And { filters } => {
                let parts: Vec<String> = filters.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(" AND "))
            }
        }
    }
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
