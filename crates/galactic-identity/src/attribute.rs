//! Attribute values and name/value carriers

use crate::error::{IdentityError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named value, e.g. one requested or returned attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityAttribute<T> {
    pub name: String,
    pub value: T,
}

impl<T> IdentityAttribute<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Value of a directory attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    Time(DateTime<Utc>),
    Binary(Vec<u8>),
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Null => "null",
            AttributeValue::Bool(_) => "bool",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::Text(_) => "text",
            AttributeValue::Time(_) => "time",
            AttributeValue::Binary(_) => "binary",
            AttributeValue::List(_) => "list",
        }
    }

    /// Borrow the text of a `Text` value or of a single-element text list
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::List(items) if items.len() == 1 => items[0].as_text(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            AttributeValue::Text(s) if s.eq_ignore_ascii_case("true") => Some(true),
            AttributeValue::Text(s) if s.eq_ignore_ascii_case("false") => Some(false),
            AttributeValue::List(items) if items.len() == 1 => items[0].as_bool(),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            AttributeValue::Text(s) => s.trim().parse().ok(),
            AttributeValue::List(items) if items.len() == 1 => items[0].as_integer(),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            AttributeValue::Time(t) => Some(*t),
            AttributeValue::Text(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            AttributeValue::List(items) if items.len() == 1 => items[0].as_time(),
            _ => None,
        }
    }

    /// List elements; any other non-null value is a one-element list
    pub fn as_list(&self) -> Vec<&AttributeValue> {
        match self {
            AttributeValue::Null => Vec::new(),
            AttributeValue::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    /// Every text element; a scalar text yields one element
    pub fn text_values(&self) -> Vec<String> {
        match self {
            AttributeValue::Text(s) => vec![s.clone()],
            AttributeValue::List(items) => items
                .iter()
                .filter_map(|v| v.as_text().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Case-insensitive text match against this value or any list element
    pub fn matches_text(&self, expected: &str) -> bool {
        match self {
            AttributeValue::List(items) => items.iter().any(|v| v.matches_text(expected)),
            AttributeValue::Text(s) => s.eq_ignore_ascii_case(expected),
            AttributeValue::Bool(b) => b.to_string().eq_ignore_ascii_case(expected),
            AttributeValue::Integer(i) => i.to_string() == expected,
            AttributeValue::Time(t) => t.to_rfc3339() == expected,
            AttributeValue::Null | AttributeValue::Binary(_) => false,
        }
    }

    // Typed extraction used by attribute setters. `Null` clears the field.

    pub fn into_text(self, attribute: &str) -> Result<Option<String>> {
        match self {
            AttributeValue::Null => Ok(None),
            AttributeValue::Text(s) => Ok(Some(s)),
            other => other
                .as_text()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| IdentityError::type_mismatch(attribute, "text")),
        }
    }

    pub fn into_bool(self, attribute: &str) -> Result<Option<bool>> {
        match self {
            AttributeValue::Null => Ok(None),
            other => other
                .as_bool()
                .map(Some)
                .ok_or_else(|| IdentityError::type_mismatch(attribute, "bool")),
        }
    }

    pub fn into_time(self, attribute: &str) -> Result<Option<DateTime<Utc>>> {
        match self {
            AttributeValue::Null => Ok(None),
            other => other
                .as_time()
                .map(Some)
                .ok_or_else(|| IdentityError::type_mismatch(attribute, "time")),
        }
    }

    pub fn into_text_list(self, attribute: &str) -> Result<Vec<String>> {
        match self {
            AttributeValue::Null => Ok(Vec::new()),
            AttributeValue::Text(s) => Ok(vec![s]),
            AttributeValue::List(items) => items
                .into_iter()
                .map(|item| match item {
                    AttributeValue::Text(s) => Ok(s),
                    _ => Err(IdentityError::type_mismatch(attribute, "text list")),
                })
                .collect(),
            _ => Err(IdentityError::type_mismatch(attribute, "text list")),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttributeValue::Time(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        AttributeValue::List(values.into_iter().map(AttributeValue::Text).collect())
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttributeValue::Null)
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(AttributeValue::Integer)
                .unwrap_or_else(|| AttributeValue::Text(n.to_string())),
            serde_json::Value::String(s) => AttributeValue::Text(s),
            serde_json::Value::Array(items) => {
                AttributeValue::List(items.into_iter().map(AttributeValue::from).collect())
            }
            serde_json::Value::Object(_) => AttributeValue::Text(value.to_string()),
        }
    }
}

impl From<&AttributeValue> for serde_json::Value {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Null => serde_json::Value::Null,
            AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
            AttributeValue::Integer(i) => serde_json::Value::from(*i),
            AttributeValue::Text(s) => serde_json::Value::String(s.clone()),
            AttributeValue::Time(t) => serde_json::Value::String(t.to_rfc3339()),
            AttributeValue::Binary(b) => {
                serde_json::Value::Array(b.iter().map(|byte| serde_json::Value::from(*byte)).collect())
            }
            AttributeValue::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_text_extraction() {
        assert_eq!(AttributeValue::from("a").as_text(), Some("a"));
        let single = AttributeValue::from(vec!["only".to_string()]);
        assert_eq!(single.as_text(), Some("only"));
        let multi = AttributeValue::from(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(multi.as_text(), None);
        assert_eq!(multi.text_values(), vec!["a", "b"]);
    }

    #[test]
    fn test_as_list() {
        let list = AttributeValue::from(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(list.as_list().len(), 2);
        assert_eq!(AttributeValue::from(7i64).as_list(), vec![&AttributeValue::Integer(7)]);
        assert!(AttributeValue::Null.as_list().is_empty());
    }

    #[test]
    fn test_bool_from_directory_text() {
        assert_eq!(AttributeValue::from("TRUE").as_bool(), Some(true));
        assert_eq!(AttributeValue::from("false").as_bool(), Some(false));
        assert_eq!(AttributeValue::from("yes").as_bool(), None);
    }

    #[test]
    fn test_time_from_rfc3339() {
        let value = AttributeValue::from("2024-03-01T10:00:00Z");
        assert_eq!(
            value.as_time(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_typed_extraction_errors() {
        let err = AttributeValue::Integer(4).into_text("mail").unwrap_err();
        assert!(matches!(err, IdentityError::TypeMismatch { expected: "text", .. }));
        assert_eq!(AttributeValue::Null.into_text("mail").unwrap(), None);
        assert!(AttributeValue::Bool(true).into_text_list("phones").is_err());
    }

    #[test]
    fn test_matches_text_is_case_insensitive() {
        let value = AttributeValue::from(vec!["Admins".to_string(), "Users".to_string()]);
        assert!(value.matches_text("users"));
        assert!(!value.matches_text("guests"));
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::json!({"a": 1});
        let value = AttributeValue::from(serde_json::json!(["x", 2, true, null]));
        assert_eq!(
            value,
            AttributeValue::List(vec![
                AttributeValue::Text("x".to_string()),
                AttributeValue::Integer(2),
                AttributeValue::Bool(true),
                AttributeValue::Null,
            ])
        );
        assert_eq!(
            AttributeValue::from(json.clone()),
            AttributeValue::Text(json.to_string())
        );
        assert_eq!(
            serde_json::Value::from(&AttributeValue::from("v")),
            serde_json::json!("v")
        );
    }
}
