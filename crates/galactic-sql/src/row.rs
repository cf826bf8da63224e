//! Rows returned by SQL queries

use crate::error::Result;
use chrono::{DateTime, Utc};
use galactic_identity::{AttributeValue, DirectoryRecord, ObjectType};
use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::{Column, Row, ValueRef};

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Binary(Vec<u8>),
    /// Bound as RFC 3339 text
    Time(DateTime<Utc>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            SqlValue::Bool(b) => Some(i64::from(*b)),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Display form used when a value becomes a record id
    pub fn to_text(&self) -> Option<String> {
        match self {
            SqlValue::Null | SqlValue::Binary(_) => None,
            SqlValue::Bool(b) => Some(b.to_string()),
            SqlValue::Integer(i) => Some(i.to_string()),
            SqlValue::Float(f) => Some(f.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Time(t) => Some(t.to_rfc3339()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Time(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

impl From<SqlValue> for AttributeValue {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => AttributeValue::Null,
            SqlValue::Bool(b) => AttributeValue::Bool(b),
            SqlValue::Integer(i) => AttributeValue::Integer(i),
            SqlValue::Float(f) => AttributeValue::Text(f.to_string()),
            SqlValue::Text(s) => AttributeValue::Text(s),
            SqlValue::Binary(b) => AttributeValue::Binary(b),
            SqlValue::Time(t) => AttributeValue::Time(t),
        }
    }
}

/// Column names and values of one result row, in select order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlRow {
    columns: Vec<(String, SqlValue)>,
}

impl SqlRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, or replace the value of an existing one
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        let column = column.into();
        let value = value.into();
        match self
            .columns
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(&column))
        {
            Some((_, existing)) => *existing = value,
            None => self.columns.push((column, value)),
        }
    }

    /// Column value by name, ASCII case-insensitive
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.columns.get(index).map(|(_, value)| value)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(SqlValue::as_text)
    }

    pub fn integer(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(SqlValue::as_integer)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Normalize into a directory record keyed by `id_column`
    pub fn to_record(&self, id_column: &str, object_type: ObjectType) -> Option<DirectoryRecord> {
        let id = self.get(id_column)?.to_text()?;
        let mut record = DirectoryRecord::new(id, object_type);
        for (name, value) in self.iter() {
            if !name.eq_ignore_ascii_case(id_column) {
                record.set_attribute(name, value.clone().into());
            }
        }
        Some(record)
    }

    /// Decode a driver row. Column types are tried in a fixed order; values
    /// the `Any` driver cannot decode read as NULL.
    pub fn from_any_row(row: &AnyRow) -> Result<Self> {
        let mut columns = Vec::with_capacity(row.columns().len());
        for (index, column) in row.columns().iter().enumerate() {
            let value = if row.try_get_raw(index)?.is_null() {
                SqlValue::Null
            } else {
                decode_column(row, index)
            };
            columns.push((column.name().to_string(), value));
        }
        Ok(Self { columns })
    }
}

fn decode_column(row: &AnyRow, index: usize) -> SqlValue {
    if let Ok(v) = row.try_get::<i64, _>(index) {
        SqlValue::Integer(v)
    } else if let Ok(v) = row.try_get::<i32, _>(index) {
        SqlValue::Integer(i64::from(v))
    } else if let Ok(v) = row.try_get::<i16, _>(index) {
        SqlValue::Integer(i64::from(v))
    } else if let Ok(v) = row.try_get::<bool, _>(index) {
        SqlValue::Bool(v)
    } else if let Ok(v) = row.try_get::<f64, _>(index) {
        SqlValue::Float(v)
    } else if let Ok(v) = row.try_get::<f32, _>(index) {
        SqlValue::Float(f64::from(v))
    } else if let Ok(v) = row.try_get::<String, _>(index) {
        SqlValue::Text(v)
    } else if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
        SqlValue::Binary(v)
    } else {
        tracing::debug!(index, "Column type not decodable, reading as NULL");
        SqlValue::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let row = SqlRow::new()
            .with("Id", 7)
            .with("DisplayName", "Ann Lee")
            .with("manager", None::<String>);
        assert_eq!(row.integer("id"), Some(7));
        assert_eq!(row.text("displayname"), Some("Ann Lee"));
        assert_eq!(row.get("MANAGER"), Some(&SqlValue::Null));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.column_names(), vec!["Id", "DisplayName", "manager"]);
    }

    #[test]
    fn test_set_replaces_existing_column() {
        let mut row = SqlRow::new().with("mail", "a@example.com");
        row.set("MAIL", "b@example.com");
        assert_eq!(row.len(), 1);
        assert_eq!(row.text("mail"), Some("b@example.com"));
    }

    #[test]
    fn test_to_record() {
        let row = SqlRow::new()
            .with("id", 42)
            .with("displayName", "Crew")
            .with("active", true);
        let record = row.to_record("id", ObjectType::Group).unwrap();
        assert_eq!(record.unique_id, "42");
        assert_eq!(record.text("displayName"), Some("Crew"));
        assert_eq!(record.attribute("active"), Some(&AttributeValue::Bool(true)));
        assert!(record.attribute("id").is_none());

        assert!(SqlRow::new().with("id", None::<i64>).to_record("id", ObjectType::User).is_none());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(SqlValue::from("12").as_integer(), Some(12));
        assert_eq!(SqlValue::Integer(0).as_bool(), Some(false));
        assert_eq!(SqlValue::Float(1.5).to_text().as_deref(), Some("1.5"));
        assert_eq!(SqlValue::Binary(vec![1]).to_text(), None);
    }
}
