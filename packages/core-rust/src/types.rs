use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::ddl::DdlAction;
use crate::schema::ColumnDescriptor;

/// Typed scalar bound to a `?` placeholder.
///
/// Values decoded from the change log are always carried in one of these
/// variants; they are never spliced into SQL text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// BOOLEAN / TINYINT(1).
    Bool(bool),
    /// Signed integer types.
    Int(i64),
    /// Unsigned integer types (BIGINT UNSIGNED may exceed `i64`).
    UInt(u64),
    /// FLOAT / DOUBLE.
    Float(f64),
    /// DECIMAL kept in its exact textual form.
    Decimal(String),
    /// Character data.
    String(String),
    /// Binary data (BLOB, BINARY, BIT).
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    /// DATE.
    Date(NaiveDate),
    /// TIME.
    Time(NaiveTime),
    /// DATETIME / TIMESTAMP.
    DateTime(NaiveDateTime),
}

impl SqlValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("null-value"),
            SqlValue::Bool(v) => write!(f, "{v}"),
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::UInt(v) => write!(f, "{v}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Decimal(v) | SqlValue::String(v) => f.write_str(v),
            SqlValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            SqlValue::Date(v) => write!(f, "{v}"),
            SqlValue::Time(v) => write!(f, "{v}"),
            SqlValue::DateTime(v) => write!(f, "{v}"),
        }
    }
}

/// Row-level change kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DmlAction {
    Insert,
    Update,
    Delete,
}

/// Classification of a decoded change-log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventAction {
    Insert,
    Update,
    Delete,
    Ddl(DdlAction),
}

impl EventAction {
    /// Whether the event carries a DDL statement rather than row images.
    #[must_use]
    pub fn is_ddl(&self) -> bool {
        matches!(self, EventAction::Ddl(_))
    }
}

impl From<DmlAction> for EventAction {
    fn from(action: DmlAction) -> Self {
        match action {
            DmlAction::Insert => EventAction::Insert,
            DmlAction::Update => EventAction::Update,
            DmlAction::Delete => EventAction::Delete,
        }
    }
}

/// One row of a [`RowChangeSet`].
///
/// `values` is the full "current" image used for column lists and WHERE
/// predicates. `changes` holds only the columns an UPDATE modified, with
/// their new values; it is empty for inserts and deletes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowImage {
    pub values: HashMap<String, SqlValue>,
    #[serde(default)]
    pub changes: HashMap<String, SqlValue>,
}

impl RowImage {
    /// Builds a row image with no changed-column map.
    pub fn new<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, SqlValue)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            changes: HashMap::new(),
        }
    }

    /// Attaches the changed-column map of an UPDATE.
    #[must_use]
    pub fn with_changes<I, K>(mut self, changes: I) -> Self
    where
        I: IntoIterator<Item = (K, SqlValue)>,
        K: Into<String>,
    {
        self.changes = changes.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }
}

/// A decoded row-level change: one action applied to one or more rows that
/// share the same column layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChangeSet {
    pub action: DmlAction,
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<RowImage>,
}

impl RowChangeSet {
    #[must_use]
    pub fn new(action: DmlAction, columns: Vec<ColumnDescriptor>, rows: Vec<RowImage>) -> Self {
        Self {
            action,
            columns,
            rows,
        }
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Current value of `column` in row `index`. Absent columns read as NULL.
    #[must_use]
    pub fn row_value(&self, index: usize, column: &str) -> &SqlValue {
        self.rows
            .get(index)
            .and_then(|row| row.values.get(column))
            .unwrap_or(&SqlValue::Null)
    }

    /// Changed value of `column` in row `index`, if the column changed.
    #[must_use]
    pub fn change_value(&self, index: usize, column: &str) -> Option<&SqlValue> {
        self.rows.get(index).and_then(|row| row.changes.get(column))
    }
}
